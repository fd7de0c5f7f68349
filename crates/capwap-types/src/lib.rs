//! # capwap-types
//!
//! Shared numeric aliases and notification types used across the capwap workspace.

pub mod events;

/// A price sample or average, in the venue's quote units.
pub type Price = u64;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Accumulated `price * milliseconds`. Twice the width of [`Price`].
pub type Cumulative = u128;

/// Milliseconds per second.
pub const MILLIS_PER_SECOND: u64 = 1_000;

/// Milliseconds per minute.
pub const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;

/// Milliseconds per week.
pub const MILLIS_PER_WEEK: u64 = 7 * 24 * 60 * MILLIS_PER_MINUTE;
