//! Custom test assertions for expressive tests
//!
//! Decodes the token segments directly, without the engine's parser, so a
//! bug in the parser cannot hide a bug in the builder.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{Map, Value};

fn segment(token: &str, index: usize) -> Map<String, Value> {
    let parts: Vec<_> = token.split('.').collect();
    assert_eq!(
        parts.len(),
        3,
        "JWT must have 3 parts (header.payload.signature), got {}",
        parts.len()
    );

    let bytes = URL_SAFE_NO_PAD
        .decode(parts[index])
        .expect("JWT segment must be base64url without padding");
    serde_json::from_slice(&bytes).expect("JWT segment must be a JSON object")
}

/// Custom assertions for wire tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .as_str()
///     .assert_valid_jwt()
///     .assert_alg("HS512")
///     .assert_claim("jti", "42")
///     .assert_expires_at(4600);
/// ```
pub trait TokenAssertions {
    /// Assert three segments, JSON header and payload, `typ: JWT` and an
    /// HMAC `alg`.
    fn assert_valid_jwt(&self) -> &Self;

    fn assert_alg(&self, alg: &str) -> &Self;

    /// Assert that the payload carries `name` with exactly `value`.
    fn assert_claim(&self, name: &str, value: impl Into<Value>) -> &Self;

    fn assert_no_claim(&self, name: &str) -> &Self;

    /// Assert that the header carries `name` with exactly `value`.
    fn assert_header(&self, name: &str, value: impl Into<Value>) -> &Self;

    fn assert_expires_at(&self, exp: i64) -> &Self;
}

impl TokenAssertions for str {
    fn assert_valid_jwt(&self) -> &Self {
        let header = segment(self, 0);
        segment(self, 1);

        assert_eq!(header.get("typ"), Some(&Value::from("JWT")), "Expected JWT type");
        let alg = header.get("alg").and_then(Value::as_str).unwrap_or_default();
        assert!(
            ["HS256", "HS384", "HS512"].contains(&alg),
            "Expected an HMAC algorithm, got '{}'",
            alg
        );

        self
    }

    fn assert_alg(&self, alg: &str) -> &Self {
        self.assert_header("alg", alg)
    }

    fn assert_claim(&self, name: &str, value: impl Into<Value>) -> &Self {
        let value = value.into();
        let claims = segment(self, 1);
        assert_eq!(
            claims.get(name),
            Some(&value),
            "Expected claim '{}' to be {}, got {:?}",
            name,
            value,
            claims.get(name)
        );
        self
    }

    fn assert_no_claim(&self, name: &str) -> &Self {
        let claims = segment(self, 1);
        assert!(
            !claims.contains_key(name),
            "Expected no '{}' claim, got {:?}",
            name,
            claims.get(name)
        );
        self
    }

    fn assert_header(&self, name: &str, value: impl Into<Value>) -> &Self {
        let value = value.into();
        let header = segment(self, 0);
        assert_eq!(
            header.get(name),
            Some(&value),
            "Expected header '{}' to be {}, got {:?}",
            name,
            value,
            header.get(name)
        );
        self
    }

    fn assert_expires_at(&self, exp: i64) -> &Self {
        self.assert_claim("exp", exp)
    }
}
