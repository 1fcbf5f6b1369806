use crate::crypto::Algorithm;
use common::config::{ObservabilityConfig, DEFAULT_LOG_LEVEL};
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Token lifetime used when the configured one is not positive (1 hour).
pub const DEFAULT_TOKEN_DURATION_SECONDS: i64 = 3600;

/// Session duration assumed when `SESSION_DURATION` is unset (1 hour).
pub const DEFAULT_SESSION_DURATION_SECONDS: i64 = 3600;

pub const DEFAULT_BEARER_HEADER: &str = "Authorization";
pub const DEFAULT_BEARER_SCHEME: &str = "Bearer";
pub const DEFAULT_BEARER_REALM: &str = "api";
pub const DEFAULT_ANTI_FORGERY_HEADER: &str = "X-CSRF-Token";

/// Process-wide signing settings.
#[derive(Debug, Clone)]
pub struct SigningPolicy {
    pub algorithm: Algorithm,
    /// Shared key every signature key is derived from.
    pub key: SecretString,
    /// Written into the `iss` claim of every issued token.
    pub issuer: String,
    /// Tolerance for `iat` values ahead of the verifier's clock. Values above
    /// `MAX_CLOCK_SKEW` are treated as `MAX_CLOCK_SKEW`.
    pub clock_skew: Duration,
}

impl SigningPolicy {
    pub fn new(algorithm: Algorithm, key: SecretString, issuer: impl Into<String>) -> Self {
        Self {
            algorithm,
            key,
            issuer: issuer.into(),
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }

    /// Set the `iat` tolerance, capped at `MAX_CLOCK_SKEW`.
    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = clock_skew.min(MAX_CLOCK_SKEW);
        self
    }
}

/// Settings for one token profile (identity or action).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePolicy {
    /// Default `aud` at issuance and the only audience accepted at verification.
    pub audience: String,
    /// Issuers whose tokens this profile accepts.
    pub issuers: Vec<String>,
    /// Default lifetime in seconds.
    pub token_duration: i64,
}

impl ProfilePolicy {
    /// A profile that accepts only its own site's tokens.
    pub fn for_site(site_base_url: &str, token_duration: i64) -> Self {
        Self {
            audience: site_base_url.to_string(),
            issuers: vec![site_base_url.to_string()],
            token_duration: resolve_token_duration(Some(token_duration), token_duration),
        }
    }
}

/// Bearer-auth settings for the HTTP middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerConfig {
    pub header_name: String,
    pub scheme: String,
    pub realm: String,
    /// Request header the anti-forgery token is read from.
    pub anti_forgery_header: String,
}

impl Default for BearerConfig {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_BEARER_HEADER.to_string(),
            scheme: DEFAULT_BEARER_SCHEME.to_string(),
            realm: DEFAULT_BEARER_REALM.to_string(),
            anti_forgery_header: DEFAULT_ANTI_FORGERY_HEADER.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub site_base_url: String,
    pub signing: SigningPolicy,
    pub identity: ProfilePolicy,
    pub route: ProfilePolicy,
    pub bearer: BearerConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

/// Pick the token lifetime: the configured value, else the session
/// duration, and the fixed default when the result is not positive.
pub fn resolve_token_duration(configured: Option<i64>, session_duration: i64) -> i64 {
    let duration = configured.unwrap_or(session_duration);
    if duration > 0 {
        duration
    } else {
        DEFAULT_TOKEN_DURATION_SECONDS
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let security_key = required_secret(vars, "SECURITY_KEY")?;
        let site_base_url = required(vars, "SITE_BASE_URL")?;

        let key = optional_secret(vars, "JWT_KEY").unwrap_or(security_key);

        let algorithm = match optional(vars, "JWT_ALGORITHM") {
            Some(name) => name
                .parse::<Algorithm>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "JWT_ALGORITHM".to_string(),
                    reason: format!("unsupported algorithm '{}'", name),
                })?,
            None => Algorithm::default(),
        };

        let issuer = optional(vars, "JWT_ISSUER").unwrap_or_else(|| site_base_url.clone());

        let clock_skew = match parse_seconds(vars, "JWT_CLOCK_SKEW_SECONDS")? {
            Some(value) if value <= 0 => {
                return Err(ConfigError::InvalidValue {
                    name: "JWT_CLOCK_SKEW_SECONDS".to_string(),
                    reason: format!("must be positive, got {}", value),
                });
            }
            Some(value) if value.unsigned_abs() > MAX_CLOCK_SKEW.as_secs() => {
                return Err(ConfigError::InvalidValue {
                    name: "JWT_CLOCK_SKEW_SECONDS".to_string(),
                    reason: format!(
                        "must not exceed {} seconds, got {}",
                        MAX_CLOCK_SKEW.as_secs(),
                        value
                    ),
                });
            }
            Some(value) => Duration::from_secs(value.unsigned_abs()),
            None => DEFAULT_CLOCK_SKEW,
        };

        let session_duration = parse_seconds(vars, "SESSION_DURATION")?
            .unwrap_or(DEFAULT_SESSION_DURATION_SECONDS);

        let identity = ProfilePolicy {
            audience: optional(vars, "JWT_IDENTITY_AUDIENCE")
                .unwrap_or_else(|| site_base_url.clone()),
            issuers: parse_list(vars, "JWT_IDENTITY_ISSUERS")
                .unwrap_or_else(|| vec![site_base_url.clone()]),
            token_duration: resolve_token_duration(
                parse_seconds(vars, "JWT_IDENTITY_TOKEN_DURATION")?,
                session_duration,
            ),
        };

        let route = ProfilePolicy {
            audience: optional(vars, "JWT_ROUTE_AUDIENCE").unwrap_or_else(|| site_base_url.clone()),
            issuers: parse_list(vars, "JWT_ROUTE_ISSUERS")
                .unwrap_or_else(|| vec![site_base_url.clone()]),
            token_duration: resolve_token_duration(
                parse_seconds(vars, "JWT_ROUTE_TOKEN_DURATION")?,
                session_duration,
            ),
        };

        let defaults = BearerConfig::default();
        let bearer = BearerConfig {
            header_name: optional(vars, "JWT_BEARER_HEADER").unwrap_or(defaults.header_name),
            scheme: optional(vars, "JWT_BEARER_SCHEME").unwrap_or(defaults.scheme),
            realm: optional(vars, "JWT_BEARER_REALM").unwrap_or(defaults.realm),
            anti_forgery_header: optional(vars, "CSRF_HEADER")
                .unwrap_or(defaults.anti_forgery_header),
        };

        let observability = ObservabilityConfig {
            log_level: optional(vars, "LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            json_logs: parse_bool(vars, "LOG_JSON")?.unwrap_or(false),
        };

        Ok(Config {
            signing: SigningPolicy::new(algorithm, SecretString::from(key), issuer)
                .with_clock_skew(clock_skew),
            site_base_url,
            identity,
            route,
            bearer,
            observability,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    optional(vars, name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

/// Secrets are taken byte for byte; only an empty value counts as unset.
fn optional_secret(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name).filter(|v| !v.is_empty()).cloned()
}

fn required_secret(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    optional_secret(vars, name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

/// Values are trimmed and empty values count as unset.
fn optional(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn parse_seconds(vars: &HashMap<String, String>, name: &str) -> Result<Option<i64>, ConfigError> {
    optional(vars, name)
        .map(|value| {
            value.parse::<i64>().map_err(|e| ConfigError::InvalidValue {
                name: name.to_string(),
                reason: format!("'{}' is not a number of seconds: {}", value, e),
            })
        })
        .transpose()
}

fn parse_bool(vars: &HashMap<String, String>, name: &str) -> Result<Option<bool>, ConfigError> {
    optional(vars, name)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                name: name.to_string(),
                reason: format!("'{}' is not a boolean", value),
            }),
        })
        .transpose()
}

fn parse_list(vars: &HashMap<String, String>, name: &str) -> Option<Vec<String>> {
    let items: Vec<String> = optional(vars, name)?
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect();

    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}
