use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Issuer claim.
pub const CLAIM_ISSUER: &str = "iss";
/// Audience claim.
pub const CLAIM_AUDIENCE: &str = "aud";
/// Identity claim. Holds the identity id the token was issued for.
pub const CLAIM_IDENTITY: &str = "jti";
/// Issued-at claim (unix seconds).
pub const CLAIM_ISSUED_AT: &str = "iat";
/// Not-before claim (unix seconds).
pub const CLAIM_NOT_BEFORE: &str = "nbf";
/// Expiration claim (unix seconds).
pub const CLAIM_EXPIRATION: &str = "exp";
/// Anti-forgery claim.
pub const CLAIM_CSRF: &str = "csrf";
/// Encoded action descriptor claim.
pub const CLAIM_ROUTE: &str = "route";

/// The payload of a token.
///
/// Backed by a sorted map, so serialization is key-sorted and deterministic.
/// Accessors return `None` for a missing claim and for a claim of the wrong
/// JSON type.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

/// Custom Debug implementation that redacts the identity and anti-forgery
/// claims.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.0 {
            if key == CLAIM_IDENTITY || key == CLAIM_CSRF {
                map.entry(key, &"[REDACTED]");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub(crate) fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.get_str(CLAIM_ISSUER)
    }

    pub fn audience(&self) -> Option<&str> {
        self.get_str(CLAIM_AUDIENCE)
    }

    /// The identity id. Numeric `jti` values written by other issuers are
    /// returned in their decimal form.
    pub fn identity(&self) -> Option<String> {
        match self.0.get(CLAIM_IDENTITY)? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.get_i64(CLAIM_ISSUED_AT)
    }

    pub fn not_before(&self) -> Option<i64> {
        self.get_i64(CLAIM_NOT_BEFORE)
    }

    pub fn expiration(&self) -> Option<i64> {
        self.get_i64(CLAIM_EXPIRATION)
    }

    pub fn csrf(&self) -> Option<&str> {
        self.get_str(CLAIM_CSRF)
    }

    pub fn route(&self) -> Option<&str> {
        self.get_str(CLAIM_ROUTE)
    }
}
