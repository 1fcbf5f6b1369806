//! Token profiles.
//!
//! - `IdentityProfile` - tokens that authenticate an identity
//! - `ActionProfile` - tokens that authorize one deferred action
//!
//! Both are built once at startup from a `SigningPolicy` and their own
//! `ProfilePolicy`, then shared across request handlers.

pub mod action_profile;
pub mod identity_profile;
pub mod identity_resolver;

pub use action_profile::ActionProfile;
pub use identity_profile::{ClaimOutcome, IdentityProfile};
pub use identity_resolver::IdentityResolver;

use crate::config::{Config, ProfilePolicy, SigningPolicy};
use crate::context::{AntiForgery, Clock, IdentityDirectory};
use crate::observability::metrics;
use crate::token::Token;
use crate::verification::{self, VerificationFailure, VerificationPolicy};
use std::sync::Arc;

/// Both profiles, sharing one signing policy, resolver and clock.
#[derive(Clone)]
pub struct Profiles {
    pub identity: IdentityProfile,
    pub actions: ActionProfile,
}

impl Profiles {
    pub fn from_config(
        config: &Config,
        directory: Arc<dyn IdentityDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let signing = Arc::new(config.signing.clone());
        let resolver = IdentityResolver::new(directory);

        Self {
            identity: IdentityProfile::new(
                Arc::clone(&signing),
                config.identity.clone(),
                resolver.clone(),
                Arc::clone(&clock),
            ),
            actions: ActionProfile::new(signing, config.route.clone(), resolver, clock),
        }
    }
}

/// State and helpers common to both profiles.
#[derive(Clone)]
struct ProfileCore {
    name: &'static str,
    signing: Arc<SigningPolicy>,
    policy: ProfilePolicy,
    resolver: IdentityResolver,
    clock: Arc<dyn Clock>,
}

impl ProfileCore {
    fn now(&self) -> i64 {
        self.clock.now()
    }

    fn audience_or_default<'a>(&'a self, audience: Option<&'a str>) -> &'a str {
        audience.unwrap_or(&self.policy.audience)
    }

    /// `now + duration`, using the profile duration when none is given.
    fn expiration(&self, now: i64, duration: Option<i64>) -> i64 {
        now.saturating_add(duration.unwrap_or(self.policy.token_duration))
    }

    fn verification_policy<'a>(
        &'a self,
        validate_time_window: bool,
        anti_forgery: &'a dyn AntiForgery,
    ) -> VerificationPolicy<'a> {
        VerificationPolicy {
            validate_time_window,
            now: self.now(),
            clock_skew: self.signing.clock_skew,
            issuers: &self.policy.issuers,
            audience: &self.policy.audience,
            anti_forgery,
        }
    }

    /// Parse without trust; failures are logged and reported as `None`.
    fn parse_wire(&self, wire: &str) -> Option<Token> {
        match Token::parse(wire) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!(
                    target: "authz.verify",
                    profile = self.name,
                    error = %e,
                    "Invalid JWT provided"
                );
                metrics::record_token_validation(
                    self.name,
                    "error",
                    Some(VerificationFailure::Malformed.as_str()),
                );
                None
            }
        }
    }

    /// Time-window check alone, for `parse(validate = true, verify = false)`.
    fn check_time_window(&self, token: &Token) -> Result<(), VerificationFailure> {
        verification::check_time_window(token.claims(), self.now(), self.signing.clock_skew)
    }

    fn record_outcome<R>(&self, result: &Result<R, VerificationFailure>) {
        match result {
            Ok(_) => metrics::record_token_validation(self.name, "success", None),
            Err(failure) => {
                tracing::debug!(
                    target: "authz.verify",
                    profile = self.name,
                    failure = %failure,
                    "Token verification failed"
                );
                metrics::record_token_validation(self.name, "error", Some(failure.as_str()));
            }
        }
    }
}
