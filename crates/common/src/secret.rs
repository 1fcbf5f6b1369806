//! Secret types for protecting signing keys and derived key material.
//!
//! Re-exports the [`secrecy`] types used across the workspace. The shared
//! signing key and every per-principal signature key derived from it are held
//! as `SecretString`, so any struct that derives `Debug` while holding one
//! prints `[REDACTED]` instead of the key.
//!
//! Values are zeroized on drop. Reading the raw value requires an explicit
//! `.expose_secret()` call, which keeps key usage easy to audit with grep.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct Policy {
//!     issuer: String,
//!     key: SecretString,
//! }
//!
//! let policy = Policy {
//!     issuer: "https://site.example".to_string(),
//!     key: SecretString::from("s3cr3t"),
//! };
//!
//! assert!(!format!("{policy:?}").contains("s3cr3t"));
//! assert_eq!(policy.key.expose_secret(), "s3cr3t");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
