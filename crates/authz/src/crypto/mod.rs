//! Signer resolution and signature-key derivation.
//!
//! The set of algorithms is a closed enum. A name taken from a token header
//! or from configuration can only select one of the three HMAC variants
//! below; anything else fails with `UnsupportedAlgorithm`. There is no
//! `none` algorithm and no asymmetric algorithm, so a forged header cannot
//! switch verification onto a different code path.
//!
//! Signature keys are always bound to a principal where one exists:
//! `shared_key + "." + principal`. Tokens without an identity (anonymous
//! action tokens) are signed with the shared key alone.

use crate::errors::AuthzError;
use common::secret::{ExposeSecret, SecretString};
use ring::hmac;
use std::fmt;
use std::str::FromStr;

/// Supported signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Algorithm {
    HS256,
    HS384,
    #[default]
    HS512,
}

impl Algorithm {
    /// Every supported algorithm, in ascending strength.
    pub const ALL: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

    /// The JOSE `alg` header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::HS256 => "HS256",
            Algorithm::HS384 => "HS384",
            Algorithm::HS512 => "HS512",
        }
    }

    fn hmac_algorithm(self) -> hmac::Algorithm {
        match self {
            Algorithm::HS256 => hmac::HMAC_SHA256,
            Algorithm::HS384 => hmac::HMAC_SHA384,
            Algorithm::HS512 => hmac::HMAC_SHA512,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = AuthzError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|alg| alg.as_str() == name)
            .ok_or_else(|| AuthzError::UnsupportedAlgorithm(name.to_string()))
    }
}

/// Resolve an algorithm name to its signer.
///
/// # Errors
///
/// Returns `UnsupportedAlgorithm` for any name outside the fixed table,
/// including `none` and asymmetric algorithms such as `RS256`.
pub fn resolve_signer(name: &str) -> Result<Signer, AuthzError> {
    let algorithm = name.parse::<Algorithm>().map_err(|e| {
        tracing::debug!(target: "authz.crypto", alg = %name, "Algorithm not supported");
        e
    })?;
    Ok(Signer::new(algorithm))
}

/// HMAC signing and verification primitive for one algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signer {
    algorithm: Algorithm,
}

impl Signer {
    pub fn new(algorithm: Algorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Compute the MAC of `message` under `key`.
    pub fn sign(&self, key: &SignatureKey, message: &[u8]) -> Vec<u8> {
        let key = hmac::Key::new(self.algorithm.hmac_algorithm(), key.as_bytes());
        hmac::sign(&key, message).as_ref().to_vec()
    }

    /// Recompute the MAC and compare it to `signature` in constant time.
    pub fn verify(&self, key: &SignatureKey, message: &[u8], signature: &[u8]) -> bool {
        let key = hmac::Key::new(self.algorithm.hmac_algorithm(), key.as_bytes());
        hmac::verify(&key, message, signature).is_ok()
    }
}

/// Key material for one token's MAC.
///
/// Debug output is redacted through `SecretString`.
#[derive(Debug, Clone)]
pub struct SignatureKey(SecretString);

impl SignatureKey {
    /// Derive the key for a principal, or use the shared key alone when
    /// there is none.
    pub fn derive(shared_key: &SecretString, principal: Option<&str>) -> Self {
        match principal {
            Some(principal) => Self(SecretString::from(format!(
                "{}.{}",
                shared_key.expose_secret(),
                principal
            ))),
            None => Self(shared_key.clone()),
        }
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.expose_secret().as_bytes()
    }
}
