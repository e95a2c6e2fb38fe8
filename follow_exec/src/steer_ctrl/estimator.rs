//! # Path error estimation
//!
//! Error functions measuring how far the predicted carrot points (and the
//! vehicle itself) are from the path. Positive errors call for steering to the
//! left.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

use super::predict::CarrotPoints;
use crate::{
    loc::Pose,
    path::{Line2, Path}
};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Weight of the trailing carrot in the line error. Keeps the heading in line
/// without overruling the leading carrot.
pub const ALT_CARROT_WEIGHT: f64 = 0.25;

/// Lateral offsets to a turning point below this are ignored.
pub const TURNING_POINT_DEADBAND_M: f64 = 0.1;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Error of the carrots against the target line.
///
/// Both the line and the carrots must be in the vehicle frame.
pub fn line_error(target_line: &Line2, carrots: &CarrotPoints) -> f64 {
    -target_line.signed_distance(&carrots.main)
        - ALT_CARROT_WEIGHT * target_line.signed_distance(&carrots.alt)
}

/// Heading error between the next waypoint and the vehicle, in (-pi, pi].
pub fn angle_error(next_wp: &Pose, vehicle: &Pose) -> f64 {
    wrap_pi(next_wp.heading_rad - vehicle.heading_rad)
}

/// Lateral offset from the main carrot to the turning point (vehicle frame).
///
/// Zero inside the deadband, so the vehicle doesn't chatter at the goal.
pub fn distance_error(next_wp_local: &Vector2<f64>, main_carrot: &Vector2<f64>) -> f64 {
    let delta = next_wp_local - main_carrot;

    if delta[1].abs() < TURNING_POINT_DEADBAND_M {
        0f64
    }
    else {
        delta[1]
    }
}

/// Perpendicular distance of the vehicle from the line through the current
/// path segment (map frame).
pub fn distance_to_current_segment(path: &Path, vehicle: &Pose) -> f64 {
    let (start, end) = path.current_segment();
    let segment_line = Line2::from_points(start.position_m, end.position_m);

    segment_line.distance(&vehicle.position_m)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn carrots(main_y: f64, alt_y: f64) -> CarrotPoints {
        CarrotPoints {
            main: Vector2::new(0.5, main_y),
            alt: Vector2::new(-0.2, alt_y)
        }
    }

    fn x_axis() -> Line2 {
        Line2::from_points(Vector2::new(1.0, 0.0), Vector2::new(2.0, 0.0))
    }

    #[test]
    fn test_line_error() {
        // Carrots left of the line give a negative (steer right) error
        assert_eq!(line_error(&x_axis(), &carrots(0.2, 0.0)), -0.2);
        assert_eq!(line_error(&x_axis(), &carrots(0.0, 0.4)), -0.1);
        assert_eq!(line_error(&x_axis(), &carrots(0.0, 0.0)), 0.0);
    }

    #[test]
    fn test_line_error_antisymmetric() {
        for &(m, a) in &[(0.2, 0.1), (-0.3, 0.5), (0.7, -0.7), (0.0, 0.25)] {
            let left = line_error(&x_axis(), &carrots(m, a));
            let right = line_error(&x_axis(), &carrots(-m, -a));
            assert!((left + right).abs() < 1e-12);
        }
    }

    #[test]
    fn test_angle_error() {
        let wp = Pose::new(0.0, 0.0, 0.9 * PI);
        let vehicle = Pose::new(0.0, 0.0, -0.9 * PI);

        // Shortest way round is through pi
        assert!((angle_error(&wp, &vehicle) + 0.2 * PI).abs() < 1e-12);
        assert!((angle_error(&vehicle, &wp) - 0.2 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_distance_error_deadband() {
        let carrot = Vector2::new(0.2, 0.0);

        for &y in &[0.0, 0.05, -0.05, 0.0999, -0.0999] {
            assert_eq!(distance_error(&Vector2::new(1.0, y), &carrot), 0.0);
        }

        assert_eq!(distance_error(&Vector2::new(1.0, 0.3), &carrot), 0.3);
        assert_eq!(distance_error(&Vector2::new(1.0, -0.3), &carrot), -0.3);
    }

    #[test]
    fn test_distance_to_segment() {
        let mut path = Path::new(vec![
            Pose::new(0.0, 0.0, 0.0),
            Pose::new(2.0, 0.0, 0.0),
            Pose::new(2.0, 2.0, 0.0)
        ]).unwrap();
        path.set_wp_idx(1).unwrap();

        assert!((distance_to_current_segment(&path, &Pose::new(1.0, 0.5, 0.0)) - 0.5).abs() < 1e-12);

        path.set_wp_idx(2).unwrap();
        assert!((distance_to_current_segment(&path, &Pose::new(1.0, 0.5, 0.0)) - 1.0).abs() < 1e-12);
    }
}
