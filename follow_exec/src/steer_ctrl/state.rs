//! Steering control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info, warn};
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::*;
use super::command::{CommandContext, SteerCore};
use super::estimator::{angle_error, distance_error, distance_to_current_segment, line_error};
use super::predict::predict;
use crate::{
    loc::PoseSource,
    path::{Line2, Path}
};
use comms_if::tc::{drive::DriveCmd, follow::MotionStatus};
use util::maths::sign;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const ARROW_ANGLE_ERROR: u32 = 1;
const ARROW_DISTANCE_ERROR: u32 = 2;
const ARROW_COMBINED_ERROR: u32 = 3;

const CARROT_MAIN: u32 = 0;
const CARROT_ALT: u32 = 1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Steering controller for Ackermann vehicles.
///
/// Each call to [`SteerCtrl::tick`] runs the active regime, producing a new
/// drive command and possibly a regime transition.
pub struct SteerCtrl {
    params: Params,

    /// The active regime
    regime: Regime,

    /// Motion status. Sticky while in `EmergencyBreak`.
    status: MotionStatus,

    /// Nominal velocity demand
    velocity_ms: f64,

    /// Direction of travel to the next waypoint, +1 forwards, -1 reversing
    dir_sign: f64,

    /// Command generation
    core: SteerCore,

    report: StatusReport
}

/// Per-tick inputs to the controller.
pub struct TickInput<'a> {
    /// The path being followed, positioned at the next waypoint.
    pub path: &'a Path,

    /// Localisation
    pub loc: &'a dyn PoseSource,

    /// Low-pass filtered speed of the vehicle.
    pub filtered_speed_ms: f64
}

/// The result of a single tick.
#[derive(Debug, Copy, Clone)]
pub struct TickOutput {
    /// The command to send to the vehicle.
    pub cmd: DriveCmd,

    /// What happened to the regime this tick. The controller has already
    /// applied it.
    pub outcome: TickOutcome,

    pub status: MotionStatus,

    pub report: StatusReport
}

/// Per-tick monitoring quantities.
///
/// Flat so it can be archived as a CSV row.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Regime at the end of the tick
    pub regime: Regime,

    pub status: MotionStatus,

    pub dir_sign: f64,

    /// Index of the next waypoint
    pub wp_idx: usize,

    /// Carrot error against the target line
    pub line_error: f64,

    /// Lateral error to the turning point
    pub distance_error_m: f64,

    /// Heading error to the next waypoint
    pub angle_error_rad: f64,

    /// Error passed to the PID
    pub combined_error: f64,

    /// Distance of the vehicle from the current path segment
    pub segment_distance_m: f64,

    /// True if the PID updated this tick
    pub pid_updated: bool,

    /// PID steering output
    pub raw_steer_rad: f64,

    /// Steering after obstacle avoidance
    pub steer_rad: f64,

    pub escalate: bool,
    pub collision: bool,

    /// The output command
    pub cmd_velocity_ms: f64,
    pub cmd_steer_front_rad: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The driving regimes of the controller. Each regime is handled by a
/// `behave_xyz` function.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum Regime {
    /// Following the line between waypoints.
    OnLine,

    /// Obstacle avoidance is deviating from the line.
    AvoidObstacle,

    /// Driving slowly onto a turning point (e.g. the goal or a cusp).
    ApproachTurningPoint,

    /// Stopped after an abort. Only left by a reset.
    EmergencyBreak
}

/// Regime change requested by a tick.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Remain in the current regime.
    Stay,

    /// Move to another regime.
    TransitionTo(Regime),

    /// Following was aborted, the vehicle has been stopped and the controller
    /// is in `EmergencyBreak`.
    Abort(AbortReason)
}

/// Reasons for aborting path following.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbortReason {
    #[error("The vehicle moved too far away from the path")]
    PathLost,

    #[error("The next waypoint could not be transformed into the vehicle frame")]
    SlamFail,

    #[error("The follow-up waypoint could not be transformed into the vehicle frame")]
    InternalError
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Regime {
    fn default() -> Self {
        Regime::OnLine
    }
}

impl AbortReason {
    /// The motion status reported for this abort.
    pub fn status(&self) -> MotionStatus {
        match self {
            AbortReason::PathLost => MotionStatus::PathLost,
            AbortReason::SlamFail => MotionStatus::SlamFail,
            AbortReason::InternalError => MotionStatus::InternalError
        }
    }
}

impl SteerCtrl {
    /// Create a new controller using the default PID and no obstacle
    /// avoidance.
    pub fn new(params: Params) -> Result<Self, ParamsError> {
        let pid = PidCtrl::new(&params.pid);
        Self::with_pid(params, Box::new(pid))
    }

    /// Create a new controller using the given PID.
    pub fn with_pid(params: Params, pid: Box<dyn SteeringPid>) -> Result<Self, ParamsError> {
        params.validate()?;

        let mut ctrl = Self {
            velocity_ms: params.nominal_velocity_ms,
            params,
            regime: Regime::OnLine,
            status: MotionStatus::Moving,
            dir_sign: 0.0,
            core: SteerCore::new(pid, None),
            report: StatusReport::default()
        };
        ctrl.core.pid_mut().reset();

        Ok(ctrl)
    }

    /// Use the given obstacle avoidance.
    pub fn with_avoidance(mut self, avoidance: Box<dyn ObstacleAvoidance>) -> Self {
        self.core.set_avoidance(Some(avoidance));
        self
    }

    /// Run one control cycle.
    ///
    /// Processing involves:
    ///  1. Running the active regime's behaviour, which estimates the path
    ///     error and generates a command from it.
    ///  2. Applying any regime transition, including its entry actions.
    pub fn tick(
        &mut self,
        input: &TickInput,
        behaviour: &mut dyn DriveBehaviour
    ) -> TickOutput {

        // Setup cycle data
        self.report = StatusReport::default();
        if self.regime != Regime::EmergencyBreak {
            self.status = MotionStatus::Moving;
        }

        // Regime execution. Each of the behave functions returns the outcome
        // or the reason to abort.
        let result = match self.regime {
            Regime::OnLine => self.behave_on_line(input, behaviour),
            Regime::AvoidObstacle => self.behave_avoid_obstacle(input, behaviour),
            Regime::ApproachTurningPoint => self.behave_approach_turning_point(input, behaviour),
            Regime::EmergencyBreak => self.behave_emergency_break()
        };

        let outcome = match result {
            Ok(o) => o,
            Err(reason) => TickOutcome::Abort(reason)
        };

        match outcome {
            TickOutcome::Stay => (),
            TickOutcome::TransitionTo(regime) => {
                info!("{:?} -> {:?}", self.regime, regime);
                self.set_regime(regime);
            },
            TickOutcome::Abort(reason) => {
                error!("{}. Abort.", reason);
                self.status = reason.status();
                self.set_regime(Regime::EmergencyBreak);
            }
        }

        let cmd = self.core.cmd();

        self.report.regime = self.regime;
        self.report.status = self.status;
        self.report.dir_sign = self.dir_sign;
        self.report.wp_idx = input.path.wp_idx();
        self.report.cmd_velocity_ms = cmd.velocity_ms;
        self.report.cmd_steer_front_rad = cmd.steer_front_rad;

        TickOutput {
            cmd,
            outcome,
            status: self.status,
            report: self.report
        }
    }

    /// Enter the given regime, running its entry action.
    pub fn set_regime(&mut self, regime: Regime) {
        self.regime = regime;

        match regime {
            Regime::OnLine => self.core.pid_mut().reset(),
            Regime::EmergencyBreak => self.core.stop_motion(),
            Regime::AvoidObstacle | Regime::ApproachTurningPoint => ()
        }
    }

    /// Return to following the line, clearing the PID, the last command and
    /// the status.
    pub fn reset(&mut self) {
        self.core.stop_motion();
        self.status = MotionStatus::Moving;
        self.dir_sign = 0.0;
        self.set_regime(Regime::OnLine);
    }

    /// Set the nominal velocity demand.
    pub fn set_velocity(&mut self, velocity_ms: f64) {
        self.velocity_ms = velocity_ms;
    }

    /// Apply new parameters.
    ///
    /// The nominal velocity and the filter state of the PID are kept.
    pub fn reconfigure(&mut self, params: Params) -> Result<(), ParamsError> {
        params.validate()?;

        self.core.pid_mut().configure(&params.pid);
        self.params = params;

        Ok(())
    }

    /// Zero the command, stopping the vehicle.
    pub fn stop_motion(&mut self) {
        self.core.stop_motion();
    }

    pub fn regime(&self) -> Regime {
        self.regime
    }

    pub fn status(&self) -> MotionStatus {
        self.status
    }

    /// The last issued command.
    pub fn cmd(&self) -> DriveCmd {
        self.core.cmd()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl SteerCtrl {

    /// Regime following the line.
    ///
    /// Aborts if the vehicle gets too far from the current segment. Switches
    /// to `AvoidObstacle` when obstacle avoidance overrides the PID.
    fn behave_on_line(
        &mut self,
        input: &TickInput,
        behaviour: &mut dyn DriveBehaviour
    ) -> Result<TickOutcome, AbortReason> {

        let next_wp_local = self.next_wp_local(input)?;
        let combined_error = self.line_following_error(input, &next_wp_local, behaviour)?;
        debug!("OnLine: e_comb = {}", combined_error);

        let speed_ms = self.line_speed();

        // Obstacle avoidance is not expected in this regime, so moving too far
        // from the path means following has failed.
        let pose = input.loc.pose();
        let segment_distance_m = distance_to_current_segment(input.path, &pose);
        self.report.segment_distance_m = segment_distance_m;

        if segment_distance_m > self.params.max_distance_to_path_m {
            warn!(
                "Moved too far away from the path ({} m, limit: {} m)",
                segment_distance_m, self.params.max_distance_to_path_m
            );
            return Err(AbortReason::PathLost)
        }

        if self.set_command(input, combined_error, speed_ms, behaviour) {
            Ok(TickOutcome::TransitionTo(Regime::AvoidObstacle))
        }
        else {
            Ok(TickOutcome::Stay)
        }
    }

    /// Regime avoiding an obstacle.
    ///
    /// As `OnLine` but without the path loss check. Returns to `OnLine` once
    /// avoidance stops overriding the PID.
    fn behave_avoid_obstacle(
        &mut self,
        input: &TickInput,
        behaviour: &mut dyn DriveBehaviour
    ) -> Result<TickOutcome, AbortReason> {

        let next_wp_local = self.next_wp_local(input)?;
        let combined_error = self.line_following_error(input, &next_wp_local, behaviour)?;

        let speed_ms = self.line_speed();

        self.report.segment_distance_m =
            distance_to_current_segment(input.path, &input.loc.pose());

        if self.set_command(input, combined_error, speed_ms, behaviour) {
            Ok(TickOutcome::Stay)
        }
        else {
            Ok(TickOutcome::TransitionTo(Regime::OnLine))
        }
    }

    /// Regime approaching a turning point.
    ///
    /// Steers the main carrot onto the waypoint, slowing down as it gets
    /// closer. Leaving this regime is up to the caller.
    fn behave_approach_turning_point(
        &mut self,
        input: &TickInput,
        behaviour: &mut dyn DriveBehaviour
    ) -> Result<TickOutcome, AbortReason> {

        let next_wp_local = self.next_wp_local(input)?;
        let pose = input.loc.pose();

        let carrots = predict(
            &self.core.cmd(),
            input.filtered_speed_ms,
            self.params.dead_time_s,
            self.params.wheelbase_m
        ).carrots(self.dir_sign);

        behaviour.visualize_carrot(&carrots.main, CARROT_MAIN, [1.0, 0.0, 0.0]);
        behaviour.visualize_carrot(&carrots.alt, CARROT_ALT, [0.0, 0.0, 0.0]);

        let e_distance = distance_error(&next_wp_local, &carrots.main);
        let e_angle = angle_error(input.path.next_waypoint(), &pose);
        let combined_error = e_distance + e_angle;
        debug!("Approach: e_comb = {}", combined_error);

        self.report.distance_error_m = e_distance;
        self.report.angle_error_rad = e_angle;
        self.report.combined_error = combined_error;
        self.report.segment_distance_m = distance_to_current_segment(input.path, &pose);

        behaviour.draw_steering_arrow(ARROW_ANGLE_ERROR, &pose, e_angle, [0.2, 1.0, 0.2]);
        behaviour.draw_steering_arrow(ARROW_DISTANCE_ERROR, &pose, e_distance, [0.2, 0.2, 1.0]);
        behaviour.draw_steering_arrow(ARROW_COMBINED_ERROR, &pose, combined_error, [1.0, 0.2, 0.2]);

        // Slows down towards the waypoint, never above the minimum velocity
        let speed_ms = (0.1 + next_wp_local.norm() / 2.0).min(self.params.min_velocity_ms);

        self.set_command(input, combined_error, speed_ms, behaviour);

        Ok(TickOutcome::Stay)
    }

    /// Regime stopped after an abort.
    fn behave_emergency_break(&mut self) -> Result<TickOutcome, AbortReason> {
        self.core.stop_motion();
        Ok(TickOutcome::Stay)
    }

    /// Transform the next waypoint into the vehicle frame and update the
    /// direction of travel from it.
    fn next_wp_local(&mut self, input: &TickInput) -> Result<Vector2<f64>, AbortReason> {
        let local = input.loc
            .transform_to_local(input.path.next_waypoint())
            .ok_or(AbortReason::SlamFail)?;

        let next_wp_local = Vector2::new(local[0], local[1]);
        self.dir_sign = sign(next_wp_local[0]);

        Ok(next_wp_local)
    }

    /// Combined line and angle error, used on the line and while avoiding
    /// obstacles.
    fn line_following_error(
        &mut self,
        input: &TickInput,
        next_wp_local: &Vector2<f64>,
        behaviour: &mut dyn DriveBehaviour
    ) -> Result<f64, AbortReason> {

        let followup_local = input.loc
            .transform_to_local(input.path.followup_waypoint())
            .ok_or(AbortReason::InternalError)?;

        let target_line = Line2::from_points(
            *next_wp_local,
            Vector2::new(followup_local[0], followup_local[1])
        );
        behaviour.visualize_line(&target_line);

        let carrots = predict(
            &self.core.cmd(),
            input.filtered_speed_ms,
            self.params.dead_time_s,
            self.params.wheelbase_m
        ).carrots(self.dir_sign);

        behaviour.visualize_carrot(&carrots.main, CARROT_MAIN, [1.0, 0.0, 0.0]);
        behaviour.visualize_carrot(&carrots.alt, CARROT_ALT, [0.0, 0.0, 0.0]);

        let pose = input.loc.pose();
        let e_line = line_error(&target_line, &carrots);
        let e_angle = angle_error(input.path.next_waypoint(), &pose);
        let combined_error = e_line + e_angle;

        self.report.line_error = e_line;
        self.report.angle_error_rad = e_angle;
        self.report.combined_error = combined_error;

        behaviour.draw_steering_arrow(ARROW_ANGLE_ERROR, &pose, e_angle, [0.2, 1.0, 0.2]);
        behaviour.draw_steering_arrow(ARROW_DISTANCE_ERROR, &pose, e_line, [0.2, 0.2, 1.0]);
        behaviour.draw_steering_arrow(ARROW_COMBINED_ERROR, &pose, combined_error, [1.0, 0.2, 0.2]);

        Ok(combined_error)
    }

    /// Speed demand on the line, halved when reversing.
    fn line_speed(&self) -> f64 {
        if self.dir_sign < 0.0 {
            self.velocity_ms * 0.5
        }
        else {
            self.velocity_ms
        }
    }

    /// Generate a command through the core, returning the escalation flag.
    fn set_command(
        &mut self,
        input: &TickInput,
        error: f64,
        speed_ms: f64,
        behaviour: &mut dyn DriveBehaviour
    ) -> bool {
        let pose = input.loc.pose();
        let ctx = CommandContext {
            dir_sign: self.dir_sign,
            distance_to_goal_m: input.path.distance_to_goal(),
            pose: &pose
        };

        match self.core.compute_command(error, speed_ms, &ctx, &self.params, behaviour) {
            Some(out) => {
                self.report.pid_updated = true;
                self.report.raw_steer_rad = out.raw_steer_rad;
                self.report.steer_rad = out.steer_rad;
                self.report.escalate = out.escalate;
                self.report.collision = out.collision;

                if out.collision {
                    self.status = MotionStatus::Collision;
                }

                out.escalate
            },
            None => false
        }
    }
}
