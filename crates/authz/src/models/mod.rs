pub mod route;

pub use route::{ParamValue, RouteDescriptor, ROUTE_ENCODING_VERSION};

use std::fmt;

/// Account status as reported by the user directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityStatus {
    Active,
    Inactive,
    Pending,
    Suspended,
    Locked,
}

impl IdentityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityStatus::Active => "active",
            IdentityStatus::Inactive => "inactive",
            IdentityStatus::Pending => "pending",
            IdentityStatus::Suspended => "suspended",
            IdentityStatus::Locked => "locked",
        }
    }
}

/// A principal a token can be issued for.
///
/// `id` becomes the `jti` claim. `uid`, when the directory provides one, is
/// used for signature-key derivation instead of `id`. The anonymous identity
/// has an empty `id`.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub uid: Option<String>,
    pub status: IdentityStatus,
}

/// Custom Debug implementation that redacts the `uid` field, which is
/// signature-key material.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("uid", &self.uid.as_ref().map(|_| "[REDACTED]"))
            .field("status", &self.status)
            .finish()
    }
}

impl Identity {
    pub fn new(id: impl Into<String>, status: IdentityStatus) -> Self {
        Self {
            id: id.into(),
            uid: None,
            status,
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Placeholder used when a reference cannot be resolved.
    pub fn anonymous() -> Self {
        Self::new(String::new(), IdentityStatus::Inactive)
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.status == IdentityStatus::Active
    }

    /// The value appended to the shared key when deriving this identity's
    /// signature key.
    pub fn signing_principal(&self) -> &str {
        self.uid.as_deref().unwrap_or(&self.id)
    }
}

/// Ways a caller can name the identity a token is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRef {
    /// Already resolved.
    Identity(Identity),
    /// Whoever is signed in to the active request's session.
    CurrentUser,
    /// Directory id.
    Id(u64),
    /// Username or email address.
    UsernameOrEmail(String),
}

impl IdentityRef {
    /// Interpret a claim or parameter value: all-digit strings are ids,
    /// anything else is a username or email.
    pub fn from_claim(value: &str) -> Self {
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = value.parse::<u64>() {
                return IdentityRef::Id(id);
            }
        }
        IdentityRef::UsernameOrEmail(value.to_string())
    }
}

impl From<Identity> for IdentityRef {
    fn from(identity: Identity) -> Self {
        IdentityRef::Identity(identity)
    }
}

impl From<u64> for IdentityRef {
    fn from(id: u64) -> Self {
        IdentityRef::Id(id)
    }
}

impl From<&str> for IdentityRef {
    fn from(value: &str) -> Self {
        IdentityRef::from_claim(value)
    }
}
