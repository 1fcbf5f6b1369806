//! Deterministic collaborator implementations.

use authz::context::{AntiForgery, Clock, CollaboratorError, IdentityDirectory};
use authz::models::{Identity, IdentityStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::RwLock;

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// User directory backed by a map.
///
/// `fail_lookups(true)` makes every lookup return an error, to exercise the
/// collaborator-failure paths.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    by_id: RwLock<HashMap<u64, Identity>>,
    aliases: RwLock<HashMap<String, u64>>,
    failing: AtomicBool,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user whose identity id is the decimal form of `id`.
    pub fn with_user(self, id: u64, status: IdentityStatus) -> Self {
        self.with_identity(id, Identity::new(id.to_string(), status))
    }

    pub fn with_identity(self, id: u64, identity: Identity) -> Self {
        self.insert(id, identity);
        self
    }

    /// Make `alias` (a username or email) resolve to `id`.
    pub fn with_alias(self, alias: &str, id: u64) -> Self {
        self.aliases.write().unwrap().insert(alias.to_string(), id);
        self
    }

    pub fn insert(&self, id: u64, identity: Identity) {
        self.by_id.write().unwrap().insert(id, identity);
    }

    pub fn set_status(&self, id: u64, status: IdentityStatus) {
        if let Some(identity) = self.by_id.write().unwrap().get_mut(&id) {
            identity.status = status;
        }
    }

    pub fn fail_lookups(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CollaboratorError::new("directory unavailable"))
        } else {
            Ok(())
        }
    }
}

impl IdentityDirectory for InMemoryDirectory {
    fn find_by_id(&self, id: u64) -> Result<Option<Identity>, CollaboratorError> {
        self.check_available()?;
        Ok(self.by_id.read().unwrap().get(&id).cloned())
    }

    fn find_by_username_or_email(
        &self,
        username_or_email: &str,
    ) -> Result<Option<Identity>, CollaboratorError> {
        self.check_available()?;
        let id = self.aliases.read().unwrap().get(username_or_email).copied();
        Ok(id.and_then(|id| self.by_id.read().unwrap().get(&id).cloned()))
    }
}

/// Anti-forgery collaborator with a fixed current token.
#[derive(Debug, Clone)]
pub struct StaticAntiForgery {
    token: Option<String>,
}

impl StaticAntiForgery {
    pub fn new(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
        }
    }

    /// A request that carries no anti-forgery token.
    pub fn missing() -> Self {
        Self { token: None }
    }
}

impl AntiForgery for StaticAntiForgery {
    fn current_token(&self) -> Result<String, CollaboratorError> {
        self.token
            .clone()
            .ok_or_else(|| CollaboratorError::new("no anti-forgery token"))
    }

    fn validate(&self, candidate: &str) -> Result<bool, CollaboratorError> {
        Ok(self.token.as_deref() == Some(candidate))
    }
}

/// Anti-forgery collaborator whose every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingAntiForgery;

impl AntiForgery for FailingAntiForgery {
    fn current_token(&self) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::new("anti-forgery store unavailable"))
    }

    fn validate(&self, _candidate: &str) -> Result<bool, CollaboratorError> {
        Err(CollaboratorError::new("anti-forgery store unavailable"))
    }
}
