//! Fixed test IDs for deterministic tests
//!
//! Every fixture directory is seeded with these users, so tests can refer to
//! them by constant instead of building identities by hand.

// Directory ids
pub const TEST_USER_ACTIVE_ID: u64 = 42;
pub const TEST_USER_UID_ID: u64 = 43;
pub const TEST_USER_INACTIVE_ID: u64 = 44;
/// Never present in any fixture directory.
pub const TEST_USER_UNKNOWN_ID: u64 = 404;

/// Signature-key principal of `TEST_USER_UID_ID`.
pub const TEST_USER_UID: &str = "uid-43";

// Usernames and emails (both resolve to TEST_USER_ACTIVE_ID)
pub const TEST_USERNAME_ACTIVE: &str = "alice";
pub const TEST_EMAIL_ACTIVE: &str = "alice@site.example";

// Anti-forgery tokens
pub const TEST_CSRF_TOKEN: &str = "csrf-token-1";
pub const TEST_CSRF_TOKEN_OTHER: &str = "csrf-token-2";

// Route actions
pub const TEST_ACTION_UPDATE_USER: &str = "users/update";
pub const TEST_ACTION_WHOAMI: &str = "session/whoami";
