//! Interfaces to the collaborators the engine calls but does not own.
//!
//! - `Clock` - current unix time
//! - `AntiForgery` - the active request's CSRF token and its validation
//! - `IdentityDirectory` - user lookup by id or username/email
//! - `Session` - the active request's current user, and adopting a new one
//!
//! Profiles hold the process-wide collaborators (`Clock`,
//! `IdentityDirectory`). Request-scoped ones travel in a `RequestContext`
//! passed to every call. Any error a collaborator reports is treated as a
//! failed check; it never escapes `claim` or `verify_token`.

use crate::models::Identity;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Source of the current time in unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Anti-forgery (CSRF) token of the active request.
pub trait AntiForgery {
    /// The token to embed in newly issued tokens.
    fn current_token(&self) -> Result<String, CollaboratorError>;

    /// Whether `candidate` is a currently valid token for this request.
    fn validate(&self, candidate: &str) -> Result<bool, CollaboratorError>;
}

/// Read access to the user directory.
pub trait IdentityDirectory: Send + Sync {
    fn find_by_id(&self, id: u64) -> Result<Option<Identity>, CollaboratorError>;

    fn find_by_username_or_email(
        &self,
        username_or_email: &str,
    ) -> Result<Option<Identity>, CollaboratorError>;
}

/// The active request's user session.
pub trait Session {
    /// The currently signed-in identity, if any.
    fn identity(&self) -> Option<Identity>;

    /// Adopt `identity` as the session's user for the rest of the request.
    fn set_identity(&self, identity: Identity);
}

/// Request-scoped collaborators.
#[derive(Clone, Copy)]
pub struct RequestContext<'a> {
    pub anti_forgery: &'a dyn AntiForgery,
    pub session: &'a dyn Session,
}

impl<'a> RequestContext<'a> {
    pub fn new(anti_forgery: &'a dyn AntiForgery, session: &'a dyn Session) -> Self {
        Self {
            anti_forgery,
            session,
        }
    }
}

/// In-memory session for a single request.
#[derive(Debug, Default)]
pub struct RequestSession {
    identity: Mutex<Option<Identity>>,
}

impl RequestSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(identity: Identity) -> Self {
        Self {
            identity: Mutex::new(Some(identity)),
        }
    }

    pub fn into_identity(self) -> Option<Identity> {
        self.identity
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Session for RequestSession {
    fn identity(&self) -> Option<Identity> {
        self.identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_identity(&self, identity: Identity) {
        *self
            .identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(identity);
    }
}
