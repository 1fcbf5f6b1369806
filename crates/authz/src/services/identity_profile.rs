use super::{IdentityResolver, ProfileCore};
use crate::config::{ProfilePolicy, SigningPolicy};
use crate::context::{Clock, RequestContext};
use crate::crypto::SignatureKey;
use crate::errors::AuthzError;
use crate::models::{Identity, IdentityRef};
use crate::observability::{hash_for_correlation, metrics};
use crate::token::claims::CLAIM_CSRF;
use crate::token::Token;
use crate::verification::{self, VerificationFailure};
use std::sync::Arc;
use tracing::instrument;

const PROFILE: &str = "identity";

/// Result of claiming an identity token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The token failed parsing or verification.
    NotClaimed,
    /// The token verified, but was issued for the anonymous identity.
    Anonymous,
    /// The token verified and names this identity.
    Identity(Identity),
}

impl ClaimOutcome {
    pub fn is_claimed(&self) -> bool {
        !matches!(self, ClaimOutcome::NotClaimed)
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            ClaimOutcome::Identity(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Issues and claims tokens that authenticate an identity.
///
/// The signature key is `shared_key + "." + principal`, where the principal
/// is the identity's uid if it has one and its id otherwise. A reference
/// that cannot be resolved falls back to the anonymous identity at issuance
/// and at verification, so guest tokens round-trip.
#[derive(Clone)]
pub struct IdentityProfile {
    core: ProfileCore,
}

impl IdentityProfile {
    pub fn new(
        signing: Arc<SigningPolicy>,
        policy: ProfilePolicy,
        resolver: IdentityResolver,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            core: ProfileCore {
                name: PROFILE,
                signing,
                policy,
                resolver,
                clock,
            },
        }
    }

    pub fn policy(&self) -> &ProfilePolicy {
        &self.core.policy
    }

    /// Issue a token for `user`.
    ///
    /// `audience` and `duration` (seconds) default to the profile policy.
    ///
    /// # Errors
    ///
    /// Returns `Collaborator` if the request's anti-forgery token cannot be
    /// read, or `Serialization` if the token cannot be encoded.
    #[instrument(skip_all, name = "authz.identity.issue")]
    pub fn issue(
        &self,
        user: IdentityRef,
        audience: Option<&str>,
        duration: Option<i64>,
        ctx: RequestContext<'_>,
    ) -> Result<Token, AuthzError> {
        let result = self.build(user, audience, duration, ctx);
        metrics::record_token_issuance(PROFILE, if result.is_ok() { "success" } else { "error" });
        result
    }

    fn build(
        &self,
        user: IdentityRef,
        audience: Option<&str>,
        duration: Option<i64>,
        ctx: RequestContext<'_>,
    ) -> Result<Token, AuthzError> {
        let identity = self
            .core
            .resolver
            .resolve(&user, ctx.session)
            .unwrap_or_else(|| {
                tracing::debug!(
                    target: "authz.identity",
                    "Identity unresolved, issuing anonymous token"
                );
                Identity::anonymous()
            });

        let csrf = ctx.anti_forgery.current_token()?;
        let now = self.core.now();

        let token = Token::builder()
            .set_issuer(self.core.signing.issuer.as_str())
            .set_audience(self.core.audience_or_default(audience))
            .set_id(identity.id.as_str(), true)
            .set_issued_at(now)
            .set_not_before(now)
            .set_expiration(self.core.expiration(now, duration))
            .set_claim(CLAIM_CSRF, csrf)
            .sign(&self.core.signing, &self.signature_key(&identity))?;

        tracing::debug!(
            target: "authz.identity",
            identity_hash = %hash_for_correlation(&identity.id),
            anonymous = identity.is_anonymous(),
            "Identity token issued"
        );

        Ok(token)
    }

    /// Parse and fully verify `wire`, then report whose token it is.
    #[instrument(skip_all, name = "authz.identity.claim")]
    pub fn claim(&self, wire: &str, ctx: RequestContext<'_>) -> ClaimOutcome {
        let Some(token) = self.core.parse_wire(wire) else {
            return ClaimOutcome::NotClaimed;
        };

        match self.run(&token, true, ctx) {
            Ok(identity) if identity.is_anonymous() => ClaimOutcome::Anonymous,
            Ok(identity) => ClaimOutcome::Identity(identity),
            Err(_) => ClaimOutcome::NotClaimed,
        }
    }

    /// Parse `wire`, optionally checking the time window (`validate`) and
    /// optionally running the full verification (`verify`).
    pub fn parse(
        &self,
        wire: &str,
        validate: bool,
        verify: bool,
        ctx: RequestContext<'_>,
    ) -> Option<Token> {
        let token = self.core.parse_wire(wire)?;

        let checked = if verify {
            self.run(&token, validate, ctx).map(|_| ())
        } else if validate {
            let result = self.core.check_time_window(&token);
            self.core.record_outcome(&result);
            result
        } else {
            Ok(())
        };

        checked.ok().map(|()| token)
    }

    /// Run the full verification pipeline, time window included.
    pub fn verify_token(&self, token: &Token, ctx: RequestContext<'_>) -> bool {
        self.run(token, true, ctx).is_ok()
    }

    fn run(
        &self,
        token: &Token,
        validate_time_window: bool,
        ctx: RequestContext<'_>,
    ) -> Result<Identity, VerificationFailure> {
        let policy = self
            .core
            .verification_policy(validate_time_window, ctx.anti_forgery);

        let result = verification::verify(token, &policy, |claims| {
            let identity = claims
                .identity()
                .and_then(|id| self.core.resolver.resolve_claim(&id))
                .unwrap_or_else(Identity::anonymous);
            (self.signature_key(&identity), identity)
        });

        self.core.record_outcome(&result);
        result
    }

    fn signature_key(&self, identity: &Identity) -> SignatureKey {
        SignatureKey::derive(&self.core.signing.key, Some(identity.signing_principal()))
    }
}
