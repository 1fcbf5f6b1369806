use super::{IdentityResolver, ProfileCore};
use crate::config::{ProfilePolicy, SigningPolicy};
use crate::context::{Clock, RequestContext};
use crate::crypto::SignatureKey;
use crate::errors::AuthzError;
use crate::models::{Identity, IdentityRef, RouteDescriptor};
use crate::observability::{hash_for_correlation, metrics};
use crate::token::claims::{CLAIM_CSRF, CLAIM_ROUTE};
use crate::token::Token;
use crate::verification::{self, VerificationFailure};
use std::sync::Arc;
use tracing::instrument;

const PROFILE: &str = "route";

/// Issues and claims tokens that authorize one deferred action.
///
/// The `route` claim carries an encoded `RouteDescriptor`. Binding to an
/// identity is optional: with one, the key is derived from its principal
/// and `jti` holds its id; without one, there is no `jti` and the shared key
/// signs the token directly.
#[derive(Clone)]
pub struct ActionProfile {
    core: ProfileCore,
}

impl ActionProfile {
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

    /// Issue a token authorizing `action`, optionally on behalf of `user`.
    ///
    /// A `user` that does not resolve produces an anonymous action token.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the descriptor cannot be encoded and
    /// `Collaborator` if the anti-forgery token cannot be read.
    #[instrument(skip_all, name = "authz.route.issue", fields(action = %action.action()))]
    pub fn issue(
        &self,
        action: &RouteDescriptor,
        user: Option<IdentityRef>,
        duration: Option<i64>,
        audience: Option<&str>,
        ctx: RequestContext<'_>,
    ) -> Result<Token, AuthzError> {
        let result = self.build(action, user, duration, audience, ctx);
        metrics::record_token_issuance(PROFILE, if result.is_ok() { "success" } else { "error" });
        result
    }

    fn build(
        &self,
        action: &RouteDescriptor,
        user: Option<IdentityRef>,
        duration: Option<i64>,
        audience: Option<&str>,
        ctx: RequestContext<'_>,
    ) -> Result<Token, AuthzError> {
        let route = action.encode()?;
        let identity = user
            .and_then(|reference| self.core.resolver.resolve(&reference, ctx.session))
            .filter(|identity| !identity.is_anonymous());

        let csrf = ctx.anti_forgery.current_token()?;
        let now = self.core.now();

        let mut builder = Token::builder()
            .set_issuer(self.core.signing.issuer.as_str())
            .set_audience(self.core.audience_or_default(audience))
            .set_issued_at(now)
            .set_not_before(now)
            .set_expiration(self.core.expiration(now, duration))
            .set_claim(CLAIM_CSRF, csrf)
            .set_claim(CLAIM_ROUTE, route);

        // jti is part of the signed payload, so it must be set before signing
        if let Some(identity) = &identity {
            builder = builder.set_id(identity.id.as_str(), true);
        }

        let token = builder.sign(&self.core.signing, &self.signature_key(identity.as_ref()))?;

        let identity_hash = identity
            .as_ref()
            .map(|i| hash_for_correlation(&i.id))
            .unwrap_or_default();
        tracing::debug!(
            target: "authz.route",
            identity_hash = %identity_hash,
            "Action token issued"
        );

        Ok(token)
    }

    /// Verify `wire` and return the action it authorizes.
    ///
    /// With `assume_identity`, a token bound to a resolvable identity makes
    /// that identity the session's user before the descriptor is returned.
    #[instrument(skip_all, name = "authz.route.claim")]
    pub fn claim(
        &self,
        wire: &str,
        assume_identity: bool,
        ctx: RequestContext<'_>,
    ) -> Option<RouteDescriptor> {
        let token = self.core.parse_wire(wire)?;
        let identity = self.run(&token, true, ctx).ok()?;

        let descriptor = match token.claims().route().map(RouteDescriptor::decode) {
            Some(Ok(descriptor)) => descriptor,
            Some(Err(e)) => {
                tracing::error!(target: "authz.route", error = %e, "Route claim could not be decoded");
                return None;
            }
            None => {
                tracing::error!(target: "authz.route", "Token has no route claim");
                return None;
            }
        };

        if assume_identity {
            if let Some(identity) = identity {
                tracing::debug!(
                    target: "authz.route",
                    identity_hash = %hash_for_correlation(&identity.id),
                    "Assuming token identity"
                );
                ctx.session.set_identity(identity);
            }
        }

        Some(descriptor)
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
    ) -> Result<Option<Identity>, VerificationFailure> {
        let policy = self
            .core
            .verification_policy(validate_time_window, ctx.anti_forgery);

        let result = verification::verify(token, &policy, |claims| {
            let identity = claims.identity().and_then(|id| {
                let resolved = self.core.resolver.resolve_claim(&id);
                if resolved.is_none() {
                    // Falls back to the shared key, which will not match
                    tracing::warn!(
                        target: "authz.route",
                        identity_hash = %hash_for_correlation(&id),
                        "Token identity unresolved"
                    );
                }
                resolved
            });
            (self.signature_key(identity.as_ref()), identity)
        });

        self.core.record_outcome(&result);
        result
    }

    fn signature_key(&self, identity: Option<&Identity>) -> SignatureKey {
        SignatureKey::derive(
            &self.core.signing.key,
            identity.map(Identity::signing_principal),
        )
    }
}
