//! # Steering control module
//!
//! Steering control keeps an Ackermann vehicle on a waypoint path. Each cycle
//! it:
//!
//!  1. Predicts where the front and rear axles will be once the last command
//!     has had time to act (the dead time), using a bicycle model. The
//!     predicted axle positions are the "carrot" points.
//!  2. Measures the errors of the carrots against the path. On the line the
//!     error is the lateral offset of the carrots from the target line plus
//!     the heading error to the next waypoint. When approaching a turning
//!     point the lateral offset to the waypoint itself is used instead.
//!  3. Passes the combined error through a PID to get a steering angle, which
//!     an optional obstacle avoidance module may adjust.
//!  4. Shapes and limits the speed, and stops the vehicle on collisions.
//!
//! Which error is used, and what happens when the vehicle strays from the
//! path, depends on the current [`Regime`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod avoid;
pub mod behaviour;
pub mod command;
pub mod estimator;
pub mod params;
pub mod pid;
pub mod predict;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use avoid::{Adjustment, ObstacleAvoidance};
pub use behaviour::{DriveBehaviour, PassiveBehaviour};
pub use command::{CommandContext, CommandOutput, SteerCore};
pub use params::{Params, ParamsError, PidParams};
pub use pid::{PidCtrl, SteeringPid};
pub use predict::{CarrotPoints, Prediction};
pub use state::*;
