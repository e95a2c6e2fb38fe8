//! # Obstacle avoidance interface
//!
//! Obstacle avoidance (e.g. a vector field histogram over an obstacle map) is
//! provided from outside the steering controller. The controller asks it to
//! adjust each raw steering angle it produces.

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The result of adjusting a steering angle around obstacles.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Adjustment {
    /// The adjusted steering angle in radians.
    pub steer_rad: f64,

    /// False if a collision was detected which cannot be steered around.
    pub ok: bool
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Adjusts steering angles to avoid obstacles.
pub trait ObstacleAvoidance {
    /// True once the module has the data it needs (e.g. an obstacle map).
    fn is_ready(&self) -> bool;

    /// Build the obstacle histogram for this cycle, considering obstacles
    /// up to `threshold_distance_m` away.
    fn create(&mut self, threshold_distance_m: f64, urgency_threshold: f64);

    /// Adjust the raw steering angle to avoid obstacles.
    fn adjust(&mut self, raw_steer_rad: f64, urgency_threshold: f64) -> Adjustment;

    /// Publish diagnostics for the last adjustment.
    fn visualize(&mut self, _raw_steer_rad: f64, _urgency_threshold: f64) {}
}
