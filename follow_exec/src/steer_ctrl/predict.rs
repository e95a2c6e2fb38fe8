//! # Kinematic prediction
//!
//! Predicts the axle positions at the end of the actuation dead time, in the
//! vehicle frame at the start of the cycle, using a bicycle model driven by
//! the last issued command.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;

use comms_if::tc::drive::DriveCmd;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Predicted vehicle motion over the dead time.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct Prediction {
    /// Slip angle of the midpoint between the axles
    pub beta_rad: f64,

    /// Distance travelled by the midpoint
    pub ds_m: f64,

    /// Change in heading
    pub dtheta_rad: f64,

    /// Predicted front axle position
    pub front_m: Vector2<f64>,

    /// Predicted rear axle position
    pub rear_m: Vector2<f64>
}

/// The pair of predicted axle positions used as tracking targets.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CarrotPoints {
    /// The leading axle in the direction of travel
    pub main: Vector2<f64>,

    /// The trailing axle
    pub alt: Vector2<f64>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Prediction {
    /// Select the carrots for the direction of travel. Moving forwards (or not
    /// moving) the front axle leads, reversing the rear axle does.
    pub fn carrots(&self, dir_sign: f64) -> CarrotPoints {
        if dir_sign >= 0.0 {
            CarrotPoints {
                main: self.front_m,
                alt: self.rear_m
            }
        }
        else {
            CarrotPoints {
                main: self.rear_m,
                alt: self.front_m
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Predict the axle positions after `dead_time_s`.
///
/// `filtered_speed_ms` is the low-pass filtered speed of the vehicle. It is
/// doubled to get the midpoint speed over the horizon. The wheelbase must be
/// positive, which is checked when the parameters are loaded.
pub fn predict(
    last_cmd: &DriveCmd,
    filtered_speed_ms: f64,
    dead_time_s: f64,
    wheelbase_m: f64
) -> Prediction {
    let tan_f = last_cmd.steer_front_rad.tan();
    let tan_r = last_cmd.steer_back_rad.tan();

    let v = 2.0 * filtered_speed_ms;

    let beta = (0.5 * (tan_f + tan_r)).atan();
    let ds = v * dead_time_s;
    let dtheta = ds * beta.cos() * (tan_f - tan_r) / wheelbase_m;

    // Heading at the end of the horizon, relative to the start
    let theta = dtheta;

    let mid = Vector2::new(
        ds * (dtheta * 0.5 + beta * 0.5).cos(),
        ds * (dtheta * 0.5 + beta * 0.5).sin()
    );
    let half_axle = Vector2::new(theta.cos(), theta.sin()) * wheelbase_m / 2.0;

    Prediction {
        beta_rad: beta,
        ds_m: ds,
        dtheta_rad: dtheta,
        front_m: mid + half_axle,
        rear_m: mid - half_axle
    }
}
