//! Common utilities and types shared across the authz workspace.

#![warn(clippy::pedantic)]

/// Module for observability configuration
pub mod config;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT wire-format utilities (size limits, segments, header inspection)
pub mod jwt;
