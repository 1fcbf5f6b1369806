//! Deterministic signing fixtures and ready-made profiles.

use crate::collaborators::{FixedClock, InMemoryDirectory, StaticAntiForgery};
use crate::test_ids::*;
use authz::config::{Config, ProfilePolicy, SigningPolicy};
use authz::context::{RequestContext, RequestSession};
use authz::crypto::{Algorithm, SignatureKey};
use authz::errors::AuthzError;
use authz::models::{Identity, IdentityRef, IdentityStatus, RouteDescriptor};
use authz::services::Profiles;
use authz::token::Token;
use common::secret::SecretString;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared signing key used by every fixture.
pub const TEST_SHARED_KEY: &str = "test-shared-key-do-not-use-in-production";

/// Site base URL; also the issuer and audience of every fixture profile.
pub const TEST_SITE_URL: &str = "https://site.example";

/// Default token lifetime of fixture profiles (seconds).
pub const TEST_TOKEN_DURATION: i64 = 3600;

pub fn test_signing_policy(algorithm: Algorithm) -> SigningPolicy {
    SigningPolicy::new(algorithm, SecretString::from(TEST_SHARED_KEY), TEST_SITE_URL)
}

pub fn test_profile_policy() -> ProfilePolicy {
    ProfilePolicy::for_site(TEST_SITE_URL, TEST_TOKEN_DURATION)
}

/// The key an identity-bound token for `principal` is signed with, or the
/// bare shared key for `None`.
pub fn test_signature_key(principal: Option<&str>) -> SignatureKey {
    SignatureKey::derive(&SecretString::from(TEST_SHARED_KEY), principal)
}

/// Environment for `Config::from_vars` with only the required variables set.
pub fn test_config_vars() -> HashMap<String, String> {
    HashMap::from([
        ("SECURITY_KEY".to_string(), TEST_SHARED_KEY.to_string()),
        ("SITE_BASE_URL".to_string(), TEST_SITE_URL.to_string()),
    ])
}

pub fn test_config() -> Config {
    Config::from_vars(&test_config_vars()).expect("fixture config must load")
}

/// Directory seeded with the users from `test_ids`.
pub fn test_directory() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with_user(TEST_USER_ACTIVE_ID, IdentityStatus::Active)
        .with_identity(
            TEST_USER_UID_ID,
            Identity::new(TEST_USER_UID_ID.to_string(), IdentityStatus::Active)
                .with_uid(TEST_USER_UID),
        )
        .with_user(TEST_USER_INACTIVE_ID, IdentityStatus::Inactive)
        .with_alias(TEST_USERNAME_ACTIVE, TEST_USER_ACTIVE_ID)
        .with_alias(TEST_EMAIL_ACTIVE, TEST_USER_ACTIVE_ID)
}

/// Both profiles wired to a fixed clock and the fixture directory.
///
/// # Example
/// ```rust,ignore
/// let fixture = TestProfiles::new(Algorithm::HS512, 1000);
/// let token = fixture.issue_identity(TEST_USER_ACTIVE_ID);
/// fixture.clock.set(4601);
/// assert!(!fixture.profiles.identity.verify_token(&token, fixture.ctx(&session)));
/// ```
pub struct TestProfiles {
    pub clock: Arc<FixedClock>,
    pub directory: Arc<InMemoryDirectory>,
    pub anti_forgery: StaticAntiForgery,
    pub profiles: Profiles,
}

impl TestProfiles {
    pub fn new(algorithm: Algorithm, now: i64) -> Self {
        let clock = Arc::new(FixedClock::new(now));
        let directory = Arc::new(test_directory());

        let mut config = test_config();
        config.signing = test_signing_policy(algorithm);
        config.identity = test_profile_policy();
        config.route = test_profile_policy();

        let profiles = Profiles::from_config(&config, directory.clone(), clock.clone());

        Self {
            clock,
            directory,
            anti_forgery: StaticAntiForgery::new(TEST_CSRF_TOKEN),
            profiles,
        }
    }

    /// A context carrying the fixture anti-forgery token and `session`.
    pub fn ctx<'a>(&'a self, session: &'a RequestSession) -> RequestContext<'a> {
        RequestContext::new(&self.anti_forgery, session)
    }

    /// Issue an identity token for `id` with the profile defaults.
    pub fn issue_identity(&self, id: u64) -> Result<Token, AuthzError> {
        let session = RequestSession::new();
        self.profiles
            .identity
            .issue(IdentityRef::Id(id), None, None, self.ctx(&session))
    }

    /// Issue an action token for `action`, bound to `user` when given.
    pub fn issue_action(
        &self,
        action: &RouteDescriptor,
        user: Option<u64>,
    ) -> Result<Token, AuthzError> {
        let session = RequestSession::new();
        self.profiles.actions.issue(
            action,
            user.map(IdentityRef::Id),
            None,
            None,
            self.ctx(&session),
        )
    }
}
