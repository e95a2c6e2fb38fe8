//! # Closed loop simulation
//!
//! A kinematic bicycle model of an Ackermann vehicle, used by the executable
//! and the tests to drive the steering controller without hardware. The
//! vehicle is its own localisation source and command sink.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, trace};
use nalgebra::{Vector2, Vector3};
use serde::Deserialize;

use crate::{
    loc::{Pose, PoseSource},
    path::Path,
    sink::CommandSink,
    steer_ctrl::{DriveBehaviour, Regime, SteerCtrl, TickInput, TickOutput}
};
use comms_if::tc::drive::DriveCmd;
use util::maths::{clamp, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulation.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SimParams {
    /// Time constant of the vehicle's actuators.
    pub response_time_s: f64,

    /// Weight of each new sample in the speed filter.
    pub speed_filter_gain: f64,

    /// Waypoints closer than this are considered reached.
    pub waypoint_tolerance_m: f64,

    /// Distance to a turning point at which the approach begins.
    pub approach_distance_m: f64,

    /// Turning points closer than this are considered reached.
    pub goal_tolerance_m: f64,

    /// Width of the collision box checked against obstacles.
    pub collision_box_width_m: f64
}

/// Closed loop path following: the steering controller driving a simulated
/// vehicle along a path.
///
/// Waypoint management is done here, outside the controller, including
/// entering and leaving the turning point approach.
pub struct FollowSim {
    ctrl: SteerCtrl,
    path: Path,
    vehicle: SimVehicle,
    speed_filter: SpeedFilter,
    obstacles: PointObstacles,
    params: SimParams,

    /// Simulated time
    time_s: f64,

    /// Set once the last waypoint has been reached
    finished: bool
}

/// A simulated Ackermann vehicle.
///
/// Actuators follow the demands with a first order lag.
#[derive(Debug, Clone)]
pub struct SimVehicle {
    pose: Pose,
    wheelbase_m: f64,

    /// Time constant of the actuator lag
    response_time_s: f64,

    /// Latest demand
    demand: DriveCmd,

    /// Achieved actuator state
    state: DriveCmd
}

/// Low pass filter on the commanded speed.
#[derive(Debug, Clone)]
pub struct SpeedFilter {
    /// Weight of each new sample, in (0, 1]
    gain: f64,
    speed_ms: f64
}

/// Point obstacles checked against a box swept ahead of the vehicle.
#[derive(Debug, Clone)]
pub struct PointObstacles {
    /// Obstacle positions in the map frame
    points: Vec<Vector2<f64>>,

    /// Vehicle pose for the current cycle
    pose: Pose,

    box_length_m: f64,
    box_width_m: f64,

    /// Number of collisions reported
    pub num_collisions: u64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            response_time_s: 0.1,
            speed_filter_gain: 0.3,
            waypoint_tolerance_m: 0.3,
            approach_distance_m: 1.0,
            goal_tolerance_m: 0.15,
            collision_box_width_m: 0.5
        }
    }
}

impl FollowSim {
    /// Set up a simulation with the vehicle starting at `start`.
    pub fn new(
        ctrl: SteerCtrl,
        path: Path,
        start: Pose,
        obstacles: Vec<Vector2<f64>>,
        params: SimParams
    ) -> Self {
        let vehicle = SimVehicle::new(start, ctrl.params().wheelbase_m, params.response_time_s);
        let obstacles = PointObstacles::new(
            obstacles,
            ctrl.params().collision_box_min_length_m,
            params.collision_box_width_m
        );

        Self {
            ctrl,
            path,
            vehicle,
            speed_filter: SpeedFilter::new(params.speed_filter_gain),
            obstacles,
            params,
            time_s: 0.0,
            finished: false
        }
    }

    /// Run one cycle of `dt_s` seconds.
    ///
    /// Returns `None` once the end of the path has been reached.
    pub fn cycle(&mut self, dt_s: f64) -> Option<TickOutput> {
        if self.finished {
            return None
        }

        let pose = self.vehicle.pose();
        self.manage_waypoints(&pose);

        if self.finished {
            info!("Goal reached after {:.2} s", self.time_s);
            self.ctrl.stop_motion();
            self.vehicle.publish(&self.ctrl.cmd());
            return None
        }

        self.obstacles.set_pose(pose);

        let input = TickInput {
            path: &self.path,
            loc: &self.vehicle,
            filtered_speed_ms: self.speed_filter.speed_ms()
        };
        let output = self.ctrl.tick(&input, &mut self.obstacles);

        self.vehicle.publish(&output.cmd);
        self.speed_filter.update(output.cmd.velocity_ms);
        self.vehicle.step(dt_s);
        self.time_s += dt_s;

        Some(output)
    }

    pub fn ctrl(&self) -> &SteerCtrl {
        &self.ctrl
    }

    pub fn ctrl_mut(&mut self) -> &mut SteerCtrl {
        &mut self.ctrl
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn vehicle(&self) -> &SimVehicle {
        &self.vehicle
    }

    pub fn obstacles(&self) -> &PointObstacles {
        &self.obstacles
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advance the path and switch into and out of the turning point approach.
    fn manage_waypoints(&mut self, pose: &Pose) {
        match self.ctrl.regime() {
            Regime::OnLine | Regime::AvoidObstacle => {
                advance_waypoints(&mut self.path, pose, self.params.waypoint_tolerance_m);

                let idx = self.path.wp_idx();
                if is_turning_point(&self.path, idx)
                    && pose.distance_to(self.path.next_waypoint()) < self.params.approach_distance_m
                {
                    info!("Approaching turning point {}", idx);
                    self.ctrl.set_regime(Regime::ApproachTurningPoint);
                }
            },
            Regime::ApproachTurningPoint => {
                if has_reached(&self.path, pose, self.params.goal_tolerance_m) {
                    if self.path.advance() {
                        info!("Turning point reached, continuing to waypoint {}", self.path.wp_idx());
                        self.ctrl.set_regime(Regime::OnLine);
                    }
                    else {
                        self.finished = true;
                    }
                }
            },
            Regime::EmergencyBreak => ()
        }
    }
}

impl SimVehicle {
    pub fn new(pose: Pose, wheelbase_m: f64, response_time_s: f64) -> Self {
        Self {
            pose,
            wheelbase_m,
            response_time_s: response_time_s.max(0.0),
            demand: DriveCmd::stop(),
            state: DriveCmd::stop()
        }
    }

    /// The achieved speed and steering.
    pub fn state(&self) -> DriveCmd {
        self.state
    }

    /// Advance the simulation by `dt_s` seconds.
    pub fn step(&mut self, dt_s: f64) {
        if !(dt_s > 0.0) {
            return
        }

        // Actuator lag
        let alpha = dt_s / (self.response_time_s + dt_s);
        self.state.velocity_ms += alpha * (self.demand.velocity_ms - self.state.velocity_ms);
        self.state.steer_front_rad += alpha * (self.demand.steer_front_rad - self.state.steer_front_rad);
        self.state.steer_back_rad += alpha * (self.demand.steer_back_rad - self.state.steer_back_rad);

        // Bicycle model about the midpoint of the axles
        let tan_f = self.state.steer_front_rad.tan();
        let tan_r = self.state.steer_back_rad.tan();
        let beta = (0.5 * (tan_f + tan_r)).atan();
        let v = self.state.velocity_ms;

        let course = self.pose.heading_rad + beta;
        self.pose.position_m += Vector2::new(course.cos(), course.sin()) * v * dt_s;
        self.pose.heading_rad = wrap_pi(
            self.pose.heading_rad + v * beta.cos() * (tan_f - tan_r) / self.wheelbase_m * dt_s
        );

        trace!("Sim pose: {:?}", self.pose);
    }
}

impl PoseSource for SimVehicle {
    fn pose(&self) -> Pose {
        self.pose
    }

    fn transform_to_local(&self, pose: &Pose) -> Option<Vector3<f64>> {
        Some(self.pose.to_local(pose))
    }
}

impl CommandSink for SimVehicle {
    fn publish(&mut self, cmd: &DriveCmd) {
        self.demand = *cmd;
    }
}

impl SpeedFilter {
    pub fn new(gain: f64) -> Self {
        Self {
            gain: clamp(&gain, &f64::EPSILON, &1.0),
            speed_ms: 0.0
        }
    }

    /// Add a commanded speed sample, returning the filtered speed.
    pub fn update(&mut self, speed_ms: f64) -> f64 {
        self.speed_ms += self.gain * (speed_ms - self.speed_ms);
        self.speed_ms
    }

    pub fn speed_ms(&self) -> f64 {
        self.speed_ms
    }
}

impl PointObstacles {
    pub fn new(points: Vec<Vector2<f64>>, box_length_m: f64, box_width_m: f64) -> Self {
        Self {
            points,
            pose: Pose::default(),
            box_length_m,
            box_width_m,
            num_collisions: 0
        }
    }

    /// Set the vehicle pose the collision box is placed at.
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }
}

impl DriveBehaviour for PointObstacles {
    /// Checks a box of the configured length and width, starting at the
    /// vehicle and rotated onto the course.
    fn is_collision(&mut self, course_rad: f64) -> bool {
        let box_pose = Pose {
            position_m: self.pose.position_m,
            heading_rad: self.pose.heading_rad + course_rad
        };

        let half_width = self.box_width_m / 2.0;
        let hit = self.points.iter().any(|p| {
            let local = box_pose.to_local(&Pose { position_m: *p, heading_rad: 0.0 });
            local[0] >= 0.0 && local[0] <= self.box_length_m && local[1].abs() <= half_width
        });

        if hit {
            self.num_collisions += 1;
        }

        hit
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Move the path on past the waypoints the vehicle has reached.
///
/// Turning points are never passed, the vehicle has to stop on them. Returns
/// the number of waypoints passed.
pub fn advance_waypoints(path: &mut Path, pose: &Pose, tolerance_m: f64) -> usize {
    let mut num_passed = 0;

    while !is_turning_point(path, path.wp_idx()) && has_reached(path, pose, tolerance_m) {
        path.advance();
        num_passed += 1;
    }

    num_passed
}

/// True if the vehicle is within `tolerance_m` of the next waypoint, or has
/// driven past it along the segment ending there.
pub fn has_reached(path: &Path, pose: &Pose, tolerance_m: f64) -> bool {
    let wp = path.next_waypoint();

    if pose.distance_to(wp) < tolerance_m {
        return true
    }

    match path.wp_idx().checked_sub(1).and_then(|i| path.get_waypoint(i)) {
        Some(prev) => {
            let along = wp.position_m - prev.position_m;
            (pose.position_m - wp.position_m).dot(&along) > 0.0
        },
        None => false
    }
}

/// True if the waypoint at `idx` is one the vehicle must stop on, either the
/// end of the path or a cusp where the direction of travel reverses.
pub fn is_turning_point(path: &Path, idx: usize) -> bool {
    if path.is_last(idx) {
        return true
    }

    let wps = path.waypoints();
    if idx == 0 || idx >= wps.len() {
        return false
    }

    let into = wps[idx].position_m - wps[idx - 1].position_m;
    let out_of = wps[idx + 1].position_m - wps[idx].position_m;

    into.dot(&out_of) < 0.0
}
