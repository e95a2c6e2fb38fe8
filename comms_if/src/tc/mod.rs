//! # Telecommand module
//!
//! Drive commands sent to the vehicle, and path-following requests and
//! results.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Drive (velocity and steering) commands
pub mod drive;

/// Path following requests and status
pub mod follow;
