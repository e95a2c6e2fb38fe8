//! # Communications interface crate.
//!
//! Provides the message types shared between the path follower and whatever
//! transports its commands and reports.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Commands and status types
pub mod tc;
