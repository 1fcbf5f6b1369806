//! JWT authorization engine.
//!
//! Issues and verifies HMAC-signed JSON Web Tokens for two purposes:
//! authenticating an identity, and authorizing one deferred action (a
//! "route token"). Includes the Axum middleware and handlers that put both
//! on the wire.
//!
//! # Modules
//!
//! - `config` - Signing, profile and bearer configuration
//! - `context` - Collaborator interfaces (clock, anti-forgery, directory, session)
//! - `crypto` - HMAC algorithms and signature keys
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `middleware` - Bearer authentication and anti-forgery extraction
//! - `models` - Identities and route descriptors
//! - `observability` - Tracing setup and metrics
//! - `routes` - Router and application state
//! - `services` - Identity and action token profiles
//! - `token` - Token model, builder and parser
//! - `verification` - Claim and signature checks

pub mod config;
pub mod context;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
pub mod token;
pub mod verification;

pub use errors::AuthzError;
pub use services::{ActionProfile, ClaimOutcome, IdentityProfile, Profiles};
pub use token::Token;
