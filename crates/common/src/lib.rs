//! Common utilities and types shared across the meeting client crates.

#![warn(clippy::pedantic)]

/// Module for meeting identifiers (attendees, tiles, external user ids)
pub mod types;

/// Module for common configuration
pub mod config;

/// Module for secret types that prevent accidental logging
pub mod secret;
