use crate::context::{CollaboratorError, IdentityDirectory, Session};
use crate::models::{Identity, IdentityRef};
use crate::observability::hash_for_correlation;
use std::sync::Arc;

/// Turns an `IdentityRef` into an `Identity` via the user directory.
///
/// Directory errors are logged and treated as "not found".
#[derive(Clone)]
pub struct IdentityResolver {
    directory: Arc<dyn IdentityDirectory>,
}

impl IdentityResolver {
    pub fn new(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self { directory }
    }

    pub fn resolve(&self, reference: &IdentityRef, session: &dyn Session) -> Option<Identity> {
        match reference {
            IdentityRef::CurrentUser => session.identity(),
            other => self.resolve_detached(other),
        }
    }

    /// Resolve the value of a `jti` claim. All-digit values are directory
    /// ids, anything else a username or email.
    pub fn resolve_claim(&self, value: &str) -> Option<Identity> {
        self.resolve_detached(&IdentityRef::from_claim(value))
    }

    /// Resolution that needs no request session.
    fn resolve_detached(&self, reference: &IdentityRef) -> Option<Identity> {
        match reference {
            IdentityRef::Identity(identity) => Some(identity.clone()),
            IdentityRef::CurrentUser => None,
            IdentityRef::Id(id) => self.lookup(&id.to_string(), |d| d.find_by_id(*id)),
            IdentityRef::UsernameOrEmail(value) if value.is_empty() => None,
            IdentityRef::UsernameOrEmail(value) => {
                self.lookup(value, |d| d.find_by_username_or_email(value))
            }
        }
    }

    fn lookup<F>(&self, reference: &str, find: F) -> Option<Identity>
    where
        F: FnOnce(&dyn IdentityDirectory) -> Result<Option<Identity>, CollaboratorError>,
    {
        match find(self.directory.as_ref()) {
            Ok(Some(identity)) => Some(identity),
            Ok(None) => {
                tracing::debug!(
                    target: "authz.identity",
                    reference_hash = %hash_for_correlation(reference),
                    "Identity not found"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    target: "authz.identity",
                    reference_hash = %hash_for_correlation(reference),
                    error = %e,
                    "Identity lookup failed"
                );
                None
            }
        }
    }
}
