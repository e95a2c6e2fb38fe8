//! # Drive telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A drive command for a vehicle with (optionally) front and rear steering.
///
/// The vehicles currently supported only steer the front axle, so
/// `steer_back_rad` is always zero when produced by the path follower.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveCmd {
    /// The speed in meters/second.
    ///
    /// Positive speeds are "forwards", negative speeds are "backwards"
    pub velocity_ms: f64,

    /// Front axle steering angle in radians, positive to the left.
    pub steer_front_rad: f64,

    /// Rear axle steering angle in radians, positive to the left.
    pub steer_back_rad: f64
}

/// Twist representation of a drive command, as consumed by velocity-interface
/// base controllers.
///
/// Only the linear X and angular Z components are used.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    pub linear_x: f64,
    pub angular_z: f64
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DriveCmd {
    /// A command which brings the vehicle to a stop with straight wheels.
    pub fn stop() -> Self {
        Self::default()
    }

    /// True if this command does not move the vehicle.
    pub fn is_stop(&self) -> bool {
        self.velocity_ms == 0.0
    }
}

impl From<DriveCmd> for Twist {
    fn from(cmd: DriveCmd) -> Self {
        // The steering angle is passed straight through as the angular
        // component, the base controller interprets it as a steer demand.
        Twist {
            linear_x: cmd.velocity_ms,
            angular_z: cmd.steer_front_rad
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_twist_conversion() {
        let cmd = DriveCmd {
            velocity_ms: -0.4,
            steer_front_rad: 0.2,
            steer_back_rad: 0.0
        };

        let twist: Twist = cmd.into();
        assert_eq!(twist.linear_x, -0.4);
        assert_eq!(twist.angular_z, 0.2);

        assert!(DriveCmd::stop().is_stop());
        assert!(!cmd.is_stop());
    }
}
