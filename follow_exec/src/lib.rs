//! # Path follower library.
//!
//! Steering and velocity control for an Ackermann vehicle following a
//! waypoint path. The executable and the integration tests access the
//! controller through this library.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Localisation types - the vehicle pose and the source it comes from
pub mod loc;

/// Waypoint paths and line geometry
pub mod path;

/// Steering control - turns path errors into drive commands
pub mod steer_ctrl;

/// Command sinks - where drive commands are published to
pub mod sink;

/// Closed loop simulation of an Ackermann vehicle
pub mod sim;
