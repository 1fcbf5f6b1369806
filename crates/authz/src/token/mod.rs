//! Token model, builder and untrusted parser.
//!
//! A `Token` exists in exactly two ways: produced by `TokenBuilder::sign`,
//! or parsed from the wire by `Token::parse`. Neither path lets a caller
//! change header or claims afterwards. Parsing establishes structure only;
//! nothing in a parsed token is trusted until it has been through
//! `verification::verify`.

pub mod builder;
pub mod claims;

pub use builder::TokenBuilder;
pub use claims::Claims;

use crate::crypto::{resolve_signer, SignatureKey};
use crate::errors::AuthzError;
use common::jwt::{decode_json_object, decode_segment, header_alg, split_token};
use serde_json::{Map, Value};
use std::fmt;

/// A signed, immutable token.
#[derive(Clone)]
pub struct Token {
    header: Map<String, Value>,
    claims: Claims,
    signature: Vec<u8>,
    encoded: String,
    signing_input_len: usize,
}

/// The encoded form is a bearer credential; only the claims are printed.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("header", &self.header)
            .field("claims", &self.claims)
            .field("signature", &"[REDACTED]")
            .finish()
    }
}

impl Token {
    /// Start building a new unsigned token.
    pub fn builder() -> TokenBuilder {
        TokenBuilder::new()
    }

    pub(crate) fn from_parts(
        header: Map<String, Value>,
        claims: Claims,
        signature: Vec<u8>,
        encoded: String,
        signing_input_len: usize,
    ) -> Self {
        Self {
            header,
            claims,
            signature,
            encoded,
            signing_input_len,
        }
    }

    /// Parse a compact token without trusting it.
    ///
    /// # Errors
    ///
    /// Returns `MalformedToken` when the token is oversized, does not have
    /// exactly three segments, a segment is not base64url, header or payload
    /// is not a JSON object, or the header has no string `alg`.
    pub fn parse(wire: &str) -> Result<Self, AuthzError> {
        let segments = split_token(wire)?;
        let header = decode_json_object(segments.header)?;
        let payload = decode_json_object(segments.payload)?;
        let signature = decode_segment(segments.signature)?;

        header_alg(&header)?;

        Ok(Self {
            header,
            claims: Claims::from_map(payload),
            signature,
            encoded: wire.to_string(),
            signing_input_len: segments.signing_input.len(),
        })
    }

    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// The `alg` header value exactly as written in the token.
    pub fn algorithm_name(&self) -> Option<&str> {
        header_alg(&self.header).ok()
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The compact wire form.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// `header.payload` exactly as it appears on the wire.
    pub fn signing_input(&self) -> &str {
        self.encoded.get(..self.signing_input_len).unwrap_or_default()
    }

    /// Recompute the MAC under the algorithm named in this token's own header
    /// and compare it to the stored signature in constant time.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedAlgorithm` if the header names an algorithm
    /// outside the supported set and `MalformedToken` if it names none.
    pub fn verify_signature(&self, key: &SignatureKey) -> Result<bool, AuthzError> {
        let name = self.algorithm_name().ok_or(AuthzError::MalformedToken)?;
        let signer = resolve_signer(name)?;
        Ok(signer.verify(key, self.signing_input().as_bytes(), &self.signature))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}
