//! # Authz Test Utilities
//!
//! Shared test utilities for the authz engine.
//!
//! This crate provides:
//! - Deterministic collaborators (fixed clock, in-memory directory,
//!   static anti-forgery token)
//! - Fixtures for signing policies and ready-made profiles (`TestProfiles`)
//! - An in-process HTTP harness (`TestApp`)
//! - Fixed test IDs
//! - Custom assertions (`TokenAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use authz_test_utils::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestProfiles::new(Algorithm::HS512, 1000);
//!     let token = fixture.issue_identity(TEST_USER_ACTIVE_ID)?;
//!
//!     token
//!         .as_str()
//!         .assert_valid_jwt()
//!         .assert_claim("jti", "42");
//! }
//! ```

pub mod assertions;
pub mod collaborators;
pub mod fixtures;
pub mod server_harness;
pub mod test_ids;

// Re-export commonly used items
pub use assertions::*;
pub use collaborators::*;
pub use fixtures::*;
pub use server_harness::*;
pub use test_ids::*;
