use super::claims::{
    Claims, CLAIM_AUDIENCE, CLAIM_EXPIRATION, CLAIM_IDENTITY, CLAIM_ISSUED_AT, CLAIM_ISSUER,
    CLAIM_NOT_BEFORE,
};
use super::Token;
use crate::config::SigningPolicy;
use crate::crypto::{SignatureKey, Signer};
use crate::errors::AuthzError;
use common::jwt::encode_segment;
use serde_json::{Map, Value};

/// Mutable accumulator for an unsigned token.
///
/// Every setter takes and returns the builder by value. `sign` consumes it,
/// so a signed `Token` can never be mutated again.
#[derive(Debug, Clone, Default)]
pub struct TokenBuilder {
    header: Map<String, Value>,
    claims: Claims,
}

impl TokenBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.claims.insert(CLAIM_ISSUER, Value::String(issuer.into()));
        self
    }

    pub fn set_audience(mut self, audience: impl Into<String>) -> Self {
        self.claims
            .insert(CLAIM_AUDIENCE, Value::String(audience.into()));
        self
    }

    /// Set the `jti` claim. With `replicate_as_header` the value is also
    /// written to the header, where some consumers look for it.
    pub fn set_id(mut self, id: impl Into<String>, replicate_as_header: bool) -> Self {
        let id = Value::String(id.into());
        if replicate_as_header {
            self.header.insert(CLAIM_IDENTITY.to_string(), id.clone());
        }
        self.claims.insert(CLAIM_IDENTITY, id);
        self
    }

    pub fn set_issued_at(mut self, issued_at: i64) -> Self {
        self.claims.insert(CLAIM_ISSUED_AT, Value::from(issued_at));
        self
    }

    pub fn set_not_before(mut self, not_before: i64) -> Self {
        self.claims.insert(CLAIM_NOT_BEFORE, Value::from(not_before));
        self
    }

    pub fn set_expiration(mut self, expiration: i64) -> Self {
        self.claims.insert(CLAIM_EXPIRATION, Value::from(expiration));
        self
    }

    pub fn set_claim(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claims.insert(key, value.into());
        self
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Serialize header and claims, compute the MAC and freeze the token.
    ///
    /// The header is `{"alg": <policy algorithm>, "typ": "JWT"}` plus any
    /// replicated claims. Both JSON objects are written with sorted keys.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if a claim value cannot be written as JSON.
    pub fn sign(self, policy: &SigningPolicy, key: &SignatureKey) -> Result<Token, AuthzError> {
        let signer = Signer::new(policy.algorithm);

        let mut header = self.header;
        header.insert(
            "alg".to_string(),
            Value::String(signer.algorithm().as_str().to_string()),
        );
        header.insert("typ".to_string(), Value::String("JWT".to_string()));

        let header_json =
            serde_json::to_vec(&header).map_err(|e| AuthzError::Serialization(e.to_string()))?;
        let payload_json = serde_json::to_vec(&self.claims)
            .map_err(|e| AuthzError::Serialization(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            encode_segment(&header_json),
            encode_segment(&payload_json)
        );
        let signature = signer.sign(key, signing_input.as_bytes());
        let encoded = format!("{}.{}", signing_input, encode_segment(&signature));

        Ok(Token::from_parts(
            header,
            self.claims,
            signature,
            encoded,
            signing_input.len(),
        ))
    }
}
