//! # Localisation module
//!
//! The path follower does not localise the vehicle itself, it consumes a pose
//! and a frame transform from a [`PoseSource`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use comms_if::tc::follow::WaypointSpec;
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A planar pose (position and heading in the map frame).
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// The position in the map frame
    pub position_m: Vector2<f64>,

    /// The heading (angle to the positive map X axis) in radians
    pub heading_rad: f64
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Provides the vehicle pose and transforms into the vehicle frame.
pub trait PoseSource {
    /// The current pose of the vehicle in the map frame.
    fn pose(&self) -> Pose;

    /// Transform a map frame pose into the vehicle frame.
    ///
    /// The result holds the local x and y position and the local heading.
    /// `None` is returned if the transform is unavailable.
    fn transform_to_local(&self, pose: &Pose) -> Option<Vector3<f64>>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad
        }
    }

    /// Euclidian distance between the positions of the two poses.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        (other.position_m - self.position_m).norm()
    }

    /// Express `other` in the frame of this pose.
    ///
    /// The returned vector is `[x, y, heading]` where x points along this
    /// pose's heading and y to its left.
    pub fn to_local(&self, other: &Pose) -> Vector3<f64> {
        let delta = other.position_m - self.position_m;
        let (sin, cos) = self.heading_rad.sin_cos();

        Vector3::new(
            cos * delta[0] + sin * delta[1],
            -sin * delta[0] + cos * delta[1],
            wrap_pi(other.heading_rad - self.heading_rad)
        )
    }
}

impl From<WaypointSpec> for Pose {
    fn from(wp: WaypointSpec) -> Self {
        Pose::new(wp.x, wp.y, wp.theta)
    }
}

/// A pose is its own (always available) localisation source.
impl PoseSource for Pose {
    fn pose(&self) -> Pose {
        *self
    }

    fn transform_to_local(&self, pose: &Pose) -> Option<Vector3<f64>> {
        Some(self.to_local(pose))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_to_local() {
        // Vehicle at (1, 1) facing +Y
        let vehicle = Pose::new(1.0, 1.0, FRAC_PI_2);

        // A point ahead of the vehicle is on local +X
        let local = vehicle.to_local(&Pose::new(1.0, 3.0, FRAC_PI_2));
        assert!((local[0] - 2.0).abs() < 1e-12);
        assert!(local[1].abs() < 1e-12);
        assert!(local[2].abs() < 1e-12);

        // A point at map +X of the vehicle is to its right (local -Y)
        let local = vehicle.to_local(&Pose::new(2.0, 1.0, 0.0));
        assert!(local[0].abs() < 1e-12);
        assert!((local[1] + 1.0).abs() < 1e-12);
        assert!((local[2] + FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_pose_as_source() {
        let vehicle = Pose::new(0.0, 0.0, 0.0);
        assert_eq!(vehicle.pose(), vehicle);

        let local = vehicle.transform_to_local(&Pose::new(-1.0, 0.5, 0.0)).unwrap();
        assert_eq!(local, Vector3::new(-1.0, 0.5, 0.0));
        assert_eq!(vehicle.distance_to(&Pose::new(3.0, 4.0, 0.0)), 5.0);
    }
}
