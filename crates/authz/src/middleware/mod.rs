//! HTTP middleware.

pub mod anti_forgery;
pub mod bearer_auth;

pub use anti_forgery::{AntiForgerySource, HeaderAntiForgerySource, RequestAntiForgery};
pub use bearer_auth::{
    challenge, require_bearer_auth, AuthenticatedIdentity, AuthenticatedIdentityExt,
    BearerAuthState,
};
