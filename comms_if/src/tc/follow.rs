//! # Path following telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A request to follow a path, as stored in a path file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSpec {
    /// The waypoints of the path in the map frame.
    pub waypoints: Vec<WaypointSpec>,

    /// Index of the first waypoint to target, defaults to the first waypoint.
    #[serde(default)]
    pub start_index: usize,

    /// Nominal velocity to follow the path at in meters/second. If not given
    /// the configured default is used.
    #[serde(default)]
    pub velocity_ms: Option<f64>
}

/// A single waypoint of a [`PathSpec`].
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct WaypointSpec {
    pub x: f64,
    pub y: f64,

    /// Heading of the vehicle at this waypoint in radians.
    #[serde(default)]
    pub theta: f64
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Motion status of the path follower, reported every control cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionStatus {
    /// The vehicle is following the path.
    Moving,

    /// A collision was detected, the vehicle has been stopped. Following may
    /// resume once the obstacle is gone.
    Collision,

    /// The vehicle departed too far from the path, following was aborted.
    PathLost,

    /// The vehicle's pose could not be determined, following was aborted.
    SlamFail,

    /// An internal error (e.g. a failed frame transform) aborted following.
    InternalError
}

#[derive(Debug, Error)]
pub enum PathSpecParseError {
    #[error("Path spec contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PathSpec {
    /// Parse a path spec from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, PathSpecParseError> {
        serde_json::from_str(json_str).map_err(PathSpecParseError::InvalidJson)
    }
}

impl MotionStatus {
    /// True if this status means following has been aborted.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            MotionStatus::PathLost | MotionStatus::SlamFail | MotionStatus::InternalError
        )
    }
}

impl Default for MotionStatus {
    fn default() -> Self {
        MotionStatus::Moving
    }
}

impl Display for MotionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MotionStatus::Moving => write!(f, "moving"),
            MotionStatus::Collision => write!(f, "collision"),
            MotionStatus::PathLost => write!(f, "path lost"),
            MotionStatus::SlamFail => write!(f, "localisation failure"),
            MotionStatus::InternalError => write!(f, "internal error")
        }
    }
}
