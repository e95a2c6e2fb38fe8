//! # Drive behaviour capabilities
//!
//! The driving behaviour active around the steering controller can check the
//! commanded course for collisions and draw diagnostics. It is handed to the
//! controller explicitly each cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

use crate::{loc::Pose, path::Line2};

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// An RGB colour, each channel in [0, 1].
pub type Colour = [f32; 3];

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Capabilities of the active drive behaviour used by the steering controller.
///
/// All drawing methods default to doing nothing.
pub trait DriveBehaviour {
    /// True if driving along the given steering course would collide.
    fn is_collision(&mut self, course_rad: f64) -> bool;

    /// Draw a steering angle as an arrow at the given pose.
    fn draw_steering_arrow(&mut self, _id: u32, _pose: &Pose, _angle_rad: f64, _colour: Colour) {}

    /// Draw the target line (vehicle frame).
    fn visualize_line(&mut self, _line: &Line2) {}

    /// Draw a carrot point (vehicle frame).
    fn visualize_carrot(&mut self, _carrot: &Vector2<f64>, _id: u32, _colour: Colour) {}
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A behaviour which never reports collisions and draws nothing.
#[derive(Debug, Default, Copy, Clone)]
pub struct PassiveBehaviour;

impl DriveBehaviour for PassiveBehaviour {
    fn is_collision(&mut self, _course_rad: f64) -> bool {
        false
    }
}
