//! # Steering PID
//!
//! The steering controller only needs a PID which turns an error into a
//! steering correction, see [`SteeringPid`]. [`PidCtrl`] is the discrete PID
//! used by default.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::PidParams;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A PID filter producing steering corrections.
pub trait SteeringPid {
    /// Apply new parameters. The filter state is kept.
    fn configure(&mut self, params: &PidParams);

    /// Get the steering correction for the given error.
    ///
    /// Returns `None` if the filter did not update this cycle, in which case
    /// the previous command should be kept.
    fn execute(&mut self, error: f64) -> Option<f64>;

    /// Clear the integral and error history.
    fn reset(&mut self);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A discrete PID controller running at a fixed sample time.
///
/// The output is
///
/// ```text
/// u = k_p * e + k_i * I + k_p * w_d * (e - e_prev)
/// ```
///
/// where `I` is the integral of the error over the sample time (limited to
/// the integral limit) and `w_d` the derivative weight. The output is
/// saturated at the steer limit.
///
/// Errors inside the deadband don't update the filter at all, the caller keeps
/// its previous command.
#[derive(Debug, Serialize, Clone)]
pub struct PidCtrl {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Limit on the integral accumulation
    integral_limit: f64,

    /// Output limit in radians
    steer_limit_rad: f64,

    /// Deadband on the error
    error_deadband: f64,

    /// Weight of the difference term
    derivative_weight: f64,

    /// Sample time in seconds
    sample_time_s: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidCtrl {

    /// Create a new controller with the given parameters.
    pub fn new(params: &PidParams) -> Self {
        let mut pid = Self {
            k_p: 0.0,
            k_i: 0.0,
            integral_limit: 0.0,
            steer_limit_rad: 0.0,
            error_deadband: 0.0,
            derivative_weight: 0.0,
            sample_time_s: 0.0,
            prev_error: None,
            integral: 0f64
        };
        pid.configure(params);

        pid
    }

}

impl SteeringPid for PidCtrl {
    fn configure(&mut self, params: &PidParams) {
        self.k_p = params.k_p;
        self.k_i = params.k_i;
        self.integral_limit = params.integral_limit.abs();
        self.steer_limit_rad = params.steer_limit_rad().abs();
        self.error_deadband = params.error_deadband.abs();
        self.derivative_weight = params.derivative_weight;
        self.sample_time_s = params.sample_time_s;
    }

    fn execute(&mut self, error: f64) -> Option<f64> {
        // A non-finite error can't be filtered, and would poison the integral
        if !error.is_finite() {
            return None
        }

        // Small enough to leave alone. The history is kept so the difference
        // term picks up from the last real sample.
        if error.abs() < self.error_deadband {
            return None
        }

        // Accumulate the integral term, limiting it to prevent windup.
        self.integral = (self.integral + error * self.sample_time_s)
            .max(-self.integral_limit)
            .min(self.integral_limit);

        // Difference to the previous error. There's no history on the first
        // sample so no difference is assumed.
        let diff = match self.prev_error {
            Some(e) => error - e,
            None => 0f64
        };

        let out =
            self.k_p * error
            + self.k_i * self.integral
            + self.k_p * self.derivative_weight * diff;

        self.prev_error = Some(error);

        Some(out.max(-self.steer_limit_rad).min(self.steer_limit_rad))
    }

    fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = None;
    }
}
