//! # Path
//!
//! This module defines the waypoint path followed by the steering controller
//! and the line geometry used to measure errors against it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use crate::loc::Pose;
use comms_if::tc::follow::PathSpec;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A path of waypoints together with the index of the waypoint currently
/// being driven to.
///
/// The index is only ever moved by the owner of the path, the controller just
/// reads it.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Path {
    waypoints: Vec<Pose>,
    wp_idx: usize
}

/// An infinite 2D line through two points.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Line2 {
    /// The first point the line was built from
    pub origin: Vector2<f64>,

    /// Unit vector from the first to the second point. Zero if the points
    /// coincide.
    pub direction: Vector2<f64>
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PathError {
    #[error("Attempted to create a path from an empty sequence")]
    Empty,

    #[error("Waypoint index {0} is out of range for a path of {1} waypoints")]
    IndexOutOfRange(usize, usize)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Path {
    /// Create a new path targeting the first waypoint.
    pub fn new(waypoints: Vec<Pose>) -> Result<Self, PathError> {
        if waypoints.is_empty() {
            return Err(PathError::Empty)
        }

        Ok(Self {
            waypoints,
            wp_idx: 0
        })
    }

    /// Convert from a [`PathSpec`] object into a new path.
    pub fn from_path_spec(spec: &PathSpec) -> Result<Self, PathError> {
        let mut path = Self::new(
            spec.waypoints.iter().map(|&wp| Pose::from(wp)).collect()
        )?;
        path.set_wp_idx(spec.start_index)?;

        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn waypoints(&self) -> &[Pose] {
        &self.waypoints
    }

    /// Index of the next waypoint.
    pub fn wp_idx(&self) -> usize {
        self.wp_idx
    }

    pub fn set_wp_idx(&mut self, wp_idx: usize) -> Result<(), PathError> {
        if wp_idx >= self.waypoints.len() {
            return Err(PathError::IndexOutOfRange(wp_idx, self.waypoints.len()))
        }

        self.wp_idx = wp_idx;
        Ok(())
    }

    /// Move on to the following waypoint. Returns false if the current one is
    /// the last.
    pub fn advance(&mut self) -> bool {
        if self.is_last(self.wp_idx) {
            false
        }
        else {
            self.wp_idx += 1;
            true
        }
    }

    pub fn get_waypoint(&self, idx: usize) -> Option<&Pose> {
        self.waypoints.get(idx)
    }

    /// The waypoint the vehicle is currently driving to.
    pub fn next_waypoint(&self) -> &Pose {
        &self.waypoints[self.wp_idx]
    }

    /// The final waypoint of the path.
    pub fn last_waypoint(&self) -> &Pose {
        &self.waypoints[self.waypoints.len() - 1]
    }

    pub fn is_last(&self, idx: usize) -> bool {
        idx + 1 == self.waypoints.len()
    }

    /// The waypoint used with the next waypoint to build the target line.
    ///
    /// This is the successor of the next waypoint, or its predecessor when the
    /// next waypoint is the last one. A single-point path returns the point
    /// itself.
    pub fn followup_waypoint(&self) -> &Pose {
        let idx = if !self.is_last(self.wp_idx) {
            self.wp_idx + 1
        }
        else {
            self.wp_idx.saturating_sub(1)
        };

        &self.waypoints[idx]
    }

    /// The (start, end) waypoints of the segment currently being driven on.
    ///
    /// Normally this is the segment ending at the next waypoint. When the
    /// next waypoint is the first one there is no such segment, so the one
    /// starting at it is used instead.
    pub fn current_segment(&self) -> (&Pose, &Pose) {
        let start_idx = if self.wp_idx > 0 {
            self.wp_idx - 1
        }
        else {
            log::debug!("Next waypoint is the first, using the segment starting there");
            (self.wp_idx + 1).min(self.waypoints.len() - 1)
        };

        (&self.waypoints[start_idx], &self.waypoints[self.wp_idx])
    }

    /// Distance from the next waypoint to the end of the path.
    pub fn distance_to_goal(&self) -> f64 {
        self.last_waypoint().distance_to(self.next_waypoint())
    }
}

impl Line2 {
    /// Build the line passing through `a` then `b`.
    pub fn from_points(a: Vector2<f64>, b: Vector2<f64>) -> Self {
        let delta = b - a;
        let length = delta.norm();

        Self {
            origin: a,
            direction: if length > 0.0 { delta / length } else { Vector2::zeros() }
        }
    }

    /// Signed perpendicular distance of the point to the line.
    ///
    /// Positive if the point is to the left of the line's direction, negative
    /// if to the right. Zero for a degenerate line.
    pub fn signed_distance(&self, point: &Vector2<f64>) -> f64 {
        let rel = point - self.origin;
        self.direction[0] * rel[1] - self.direction[1] * rel[0]
    }

    /// Unsigned perpendicular distance of the point to the line.
    ///
    /// For a degenerate line this is the distance to the line's origin.
    pub fn distance(&self, point: &Vector2<f64>) -> f64 {
        if self.is_degenerate() {
            (point - self.origin).norm()
        }
        else {
            self.signed_distance(point).abs()
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.direction == Vector2::zeros()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn straight_path(n: usize) -> Path {
        Path::new((0..n).map(|i| Pose::new(i as f64, 0.0, 0.0)).collect()).unwrap()
    }

    #[test]
    fn test_path_construction() {
        assert_eq!(Path::new(vec![]).unwrap_err(), PathError::Empty);

        let mut path = straight_path(3);
        assert_eq!(path.wp_idx(), 0);
        assert_eq!(path.set_wp_idx(3), Err(PathError::IndexOutOfRange(3, 3)));
        assert!(path.set_wp_idx(2).is_ok());
        assert!(!path.advance());
        assert_eq!(path.wp_idx(), 2);
    }

    #[test]
    fn test_followup_and_segment() {
        let mut path = straight_path(3);

        // First waypoint: followup is the successor, segment starts here
        assert_eq!(path.followup_waypoint().position_m[0], 1.0);
        let (start, end) = path.current_segment();
        assert_eq!(start.position_m[0], 1.0);
        assert_eq!(end.position_m[0], 0.0);

        // Last waypoint: followup is the predecessor
        path.set_wp_idx(2).unwrap();
        assert_eq!(path.followup_waypoint().position_m[0], 1.0);
        let (start, end) = path.current_segment();
        assert_eq!(start.position_m[0], 1.0);
        assert_eq!(end.position_m[0], 2.0);

        path.set_wp_idx(1).unwrap();
        assert_eq!(path.distance_to_goal(), 1.0);
    }

    #[test]
    fn test_single_point_path() {
        let path = straight_path(1);
        assert_eq!(path.followup_waypoint(), path.next_waypoint());
        let (start, end) = path.current_segment();
        assert_eq!(start, end);
    }

    #[test]
    fn test_line_distances() {
        let line = Line2::from_points(Vector2::new(0.0, 0.0), Vector2::new(2.0, 0.0));

        assert_eq!(line.signed_distance(&Vector2::new(5.0, 1.5)), 1.5);
        assert_eq!(line.signed_distance(&Vector2::new(-3.0, -0.5)), -0.5);
        assert_eq!(line.distance(&Vector2::new(1.0, -0.5)), 0.5);

        // Reversing the line flips the sign
        let rev = Line2::from_points(Vector2::new(2.0, 0.0), Vector2::new(0.0, 0.0));
        assert_eq!(rev.signed_distance(&Vector2::new(1.0, 1.5)), -1.5);

        let degen = Line2::from_points(Vector2::new(1.0, 1.0), Vector2::new(1.0, 1.0));
        assert!(degen.is_degenerate());
        assert_eq!(degen.signed_distance(&Vector2::new(4.0, 5.0)), 0.0);
        assert_eq!(degen.distance(&Vector2::new(4.0, 5.0)), 5.0);
    }
}
