//! Steering control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for steering control.
///
/// Any parameter missing from the parameter file takes its default value.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Params {

    /// Maximum distance the vehicle may depart from the current path segment
    /// while on the line. Beyond this following is aborted.
    pub max_distance_to_path_m: f64,

    /// Actuation dead time over which the carrot points are predicted.
    pub dead_time_s: f64,

    /// Distance between the front and rear axles.
    pub wheelbase_m: f64,

    /// Minimum magnitude of the velocity demand.
    pub min_velocity_ms: f64,

    /// Maximum magnitude of the velocity demand.
    pub max_velocity_ms: f64,

    /// Nominal velocity used when no velocity is given with the path.
    pub nominal_velocity_ms: f64,

    /// Steering angles above this halve the velocity demand.
    pub steer_slow_threshold_rad: f64,

    /// Minimum length of the collision box ahead of the vehicle, used as the
    /// lower bound on the obstacle avoidance threshold distance.
    pub collision_box_min_length_m: f64,

    /// Steering PID parameters
    pub pid: PidParams
}

/// Parameters of the steering PID.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PidParams {
    /// Sample time (control period) of the PID.
    pub sample_time_s: f64,

    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Limit on the magnitude of the integral accumulation. Zero disables the
    /// integral term.
    pub integral_limit: f64,

    /// Limit on the magnitude of the steering output, in degrees.
    pub steer_limit_deg: f64,

    /// Errors of a magnitude below this don't update the PID, the previous
    /// command is kept.
    pub error_deadband: f64,

    /// Weight of the error difference term relative to the proportional term.
    pub derivative_weight: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors in the steering control parameters.
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("Could not load parameters: {0}")]
    Load(util::params::LoadError),

    #[error("The wheelbase must be positive, found {0} m")]
    InvalidWheelbase(f64),

    #[error("The dead time must not be negative, found {0} s")]
    InvalidDeadTime(f64),

    #[error("The PID sample time must be positive, found {0} s")]
    InvalidSampleTime(f64),

    #[error("Invalid velocity bounds: min {0} m/s, max {1} m/s")]
    InvalidVelocityBounds(f64, f64)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            max_distance_to_path_m: 0.3,
            dead_time_s: 0.10,
            wheelbase_m: 0.38,
            min_velocity_ms: 0.1,
            max_velocity_ms: 2.0,
            nominal_velocity_ms: 1.0,
            steer_slow_threshold_rad: 0.25,
            collision_box_min_length_m: 0.5,
            pid: PidParams::default()
        }
    }
}

impl Default for PidParams {
    fn default() -> Self {
        Self {
            sample_time_s: 0.03,
            k_p: 1.5,
            k_i: 0.001,
            integral_limit: 0.0,
            steer_limit_deg: 30.0,
            error_deadband: 0.10,
            derivative_weight: 0.5
        }
    }
}

impl Params {
    /// Load and validate the parameters from a TOML file.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ParamsError> {
        let params: Self = util::params::load(path).map_err(ParamsError::Load)?;
        params.validate()?;

        Ok(params)
    }

    /// Check the parameters describe a usable controller.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.wheelbase_m > 0.0) {
            return Err(ParamsError::InvalidWheelbase(self.wheelbase_m))
        }
        if !(self.dead_time_s >= 0.0) {
            return Err(ParamsError::InvalidDeadTime(self.dead_time_s))
        }
        if !(self.pid.sample_time_s > 0.0) {
            return Err(ParamsError::InvalidSampleTime(self.pid.sample_time_s))
        }
        if !(self.min_velocity_ms >= 0.0 && self.min_velocity_ms <= self.max_velocity_ms) {
            return Err(ParamsError::InvalidVelocityBounds(
                self.min_velocity_ms, self.max_velocity_ms
            ))
        }

        Ok(())
    }
}

impl PidParams {
    /// The steering output limit in radians.
    pub fn steer_limit_rad(&self) -> f64 {
        self.steer_limit_deg.to_radians()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_params_file() {
        let params: Params = util::params::load_str(
            "wheelbase_m = 0.5\n\n[pid]\nk_p = 2.0\n"
        ).unwrap();

        assert_eq!(params.wheelbase_m, 0.5);
        assert_eq!(params.dead_time_s, 0.10);
        assert_eq!(params.pid.k_p, 2.0);
        assert_eq!(params.pid.sample_time_s, 0.03);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut params = Params::default();
        params.wheelbase_m = 0.0;
        assert!(matches!(params.validate(), Err(ParamsError::InvalidWheelbase(_))));

        let mut params = Params::default();
        params.min_velocity_ms = 3.0;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::InvalidVelocityBounds(_, _))
        ));

        let mut params = Params::default();
        params.pid.sample_time_s = f64::NAN;
        assert!(matches!(params.validate(), Err(ParamsError::InvalidSampleTime(_))));
    }
}
