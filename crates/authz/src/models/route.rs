//! Action descriptors carried by route tokens.
//!
//! The `route` claim holds a JSON object serialized to a string:
//!
//! ```text
//! {"v":1,"action":"users/update","params":{"id":7}}
//! ```
//!
//! Decoding only ever produces plain data (`RouteDescriptor`, `ParamValue`);
//! unknown fields and unknown versions are rejected.

use crate::errors::AuthzError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current `v` field of the encoded descriptor.
pub const ROUTE_ENCODING_VERSION: u32 = 1;

/// A parameter value in a route descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// `false` if this value or anything nested in it is a NaN or infinite
    /// float, which JSON cannot carry.
    pub fn is_finite(&self) -> bool {
        match self {
            ParamValue::Float(value) => value.is_finite(),
            ParamValue::List(items) => items.iter().all(ParamValue::is_finite),
            ParamValue::Map(entries) => entries.values().all(ParamValue::is_finite),
            ParamValue::Bool(_) | ParamValue::Integer(_) | ParamValue::String(_) => true,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Integer(i64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Integer(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(value: Vec<ParamValue>) -> Self {
        ParamValue::List(value)
    }
}

impl From<BTreeMap<String, ParamValue>> for ParamValue {
    fn from(value: BTreeMap<String, ParamValue>) -> Self {
        ParamValue::Map(value)
    }
}

/// What a route token authorizes: an action name plus its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDescriptor {
    action: String,
    params: BTreeMap<String, ParamValue>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EncodedRoute {
    v: u32,
    action: String,
    #[serde(default)]
    params: BTreeMap<String, ParamValue>,
}

impl RouteDescriptor {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_params(action: impl Into<String>, params: BTreeMap<String, ParamValue>) -> Self {
        Self {
            action: action.into(),
            params,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn params(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }

    pub fn into_parts(self) -> (String, BTreeMap<String, ParamValue>) {
        (self.action, self.params)
    }

    /// Serialize for the `route` claim.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the action is empty or a parameter cannot
    /// be represented in JSON.
    pub fn encode(&self) -> Result<String, AuthzError> {
        if self.action.is_empty() {
            return Err(AuthzError::Serialization(
                "Route action must not be empty".to_string(),
            ));
        }

        if let Some((name, _)) = self.params.iter().find(|(_, value)| !value.is_finite()) {
            return Err(AuthzError::Serialization(format!(
                "Route parameter '{name}' contains a non-finite number"
            )));
        }

        let encoded = EncodedRoute {
            v: ROUTE_ENCODING_VERSION,
            action: self.action.clone(),
            params: self.params.clone(),
        };

        serde_json::to_string(&encoded).map_err(|e| AuthzError::Serialization(e.to_string()))
    }

    /// Parse a `route` claim value.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for invalid JSON, unknown fields, an unknown
    /// version, or an empty action.
    pub fn decode(value: &str) -> Result<Self, AuthzError> {
        let encoded: EncodedRoute =
            serde_json::from_str(value).map_err(|e| AuthzError::Serialization(e.to_string()))?;

        if encoded.v != ROUTE_ENCODING_VERSION {
            return Err(AuthzError::Serialization(format!(
                "Unsupported route encoding version: {}",
                encoded.v
            )));
        }

        if encoded.action.is_empty() {
            return Err(AuthzError::Serialization(
                "Route action must not be empty".to_string(),
            ));
        }

        Ok(Self {
            action: encoded.action,
            params: encoded.params,
        })
    }
}

impl From<&str> for RouteDescriptor {
    fn from(action: &str) -> Self {
        RouteDescriptor::new(action)
    }
}
