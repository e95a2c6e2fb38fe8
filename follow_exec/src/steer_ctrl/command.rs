//! # Steering command generation
//!
//! Turns a combined path error and a requested speed into a [`DriveCmd`]:
//! PID correction, obstacle avoidance adjustment, speed shaping and limits,
//! and the collision stop.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};

// Internal
use super::{DriveBehaviour, ObstacleAvoidance, Params, SteeringPid};
use crate::loc::Pose;
use comms_if::tc::drive::DriveCmd;
use util::{logger::Throttle, warn_throttle};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Urgency threshold passed to the obstacle avoidance.
pub const AVOIDANCE_URGENCY_THRESHOLD: f64 = 5.0;

/// Upper bound on the distance obstacle avoidance looks ahead.
pub const AVOIDANCE_MAX_THRESHOLD_DISTANCE_M: f64 = 3.5;

/// Deviation of the adjusted steering from the PID's output above which the
/// vehicle is considered to be avoiding an obstacle.
pub const ESCALATION_THRESHOLD_RAD: f64 = 0.05;

const ARROW_RAW_STEER: u32 = 14;
const ARROW_ADJUSTED_STEER: u32 = 15;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Steering command generator.
///
/// Owns the PID, the optional obstacle avoidance and the last issued command.
pub struct SteerCore {
    pid: Box<dyn SteeringPid>,
    avoidance: Option<Box<dyn ObstacleAvoidance>>,

    /// The last issued command
    cmd: DriveCmd,

    throttle_not_ready: Throttle,
    throttle_slow: Throttle,
    throttle_clamp: Throttle,
    throttle_collision: Throttle
}

/// Per-cycle information needed to generate a command.
#[derive(Debug, Copy, Clone)]
pub struct CommandContext<'a> {
    /// +1 driving forwards, -1 reversing
    pub dir_sign: f64,

    /// Distance from the next waypoint to the end of the path
    pub distance_to_goal_m: f64,

    /// Current vehicle pose, for diagnostics
    pub pose: &'a Pose
}

/// The outcome of generating a command.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CommandOutput {
    /// The new command
    pub cmd: DriveCmd,

    /// Steering angle from the PID
    pub raw_steer_rad: f64,

    /// Steering angle after obstacle avoidance
    pub steer_rad: f64,

    /// Speed demand magnitude after shaping and limits
    pub speed_ms: f64,

    /// True if a collision stopped the vehicle
    pub collision: bool,

    /// True if avoidance deviated materially from the PID output
    pub escalate: bool
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SteerCore {
    pub fn new(
        pid: Box<dyn SteeringPid>,
        avoidance: Option<Box<dyn ObstacleAvoidance>>
    ) -> Self {
        Self {
            pid,
            avoidance,
            cmd: DriveCmd::stop(),
            throttle_not_ready: Throttle::from_secs(1.0),
            throttle_slow: Throttle::from_secs(2.0),
            throttle_clamp: Throttle::from_secs(5.0),
            throttle_collision: Throttle::from_secs(1.0)
        }
    }

    /// The last issued command.
    pub fn cmd(&self) -> DriveCmd {
        self.cmd
    }

    /// Zero the command, stopping the vehicle with straight wheels.
    pub fn stop_motion(&mut self) {
        self.cmd = DriveCmd::stop();
    }

    pub fn pid_mut(&mut self) -> &mut dyn SteeringPid {
        self.pid.as_mut()
    }

    pub fn set_avoidance(&mut self, avoidance: Option<Box<dyn ObstacleAvoidance>>) {
        self.avoidance = avoidance;
    }

    /// Generate a new command for the combined error and requested speed.
    ///
    /// Returns `None` if the PID did not update, leaving the last command in
    /// place.
    pub fn compute_command(
        &mut self,
        error: f64,
        speed_ms: f64,
        ctx: &CommandContext,
        params: &Params,
        behaviour: &mut dyn DriveBehaviour
    ) -> Option<CommandOutput> {

        let raw_steer_rad = self.pid.execute(error)?;
        debug!("PID: error = {}, steer = {}", error, raw_steer_rad);

        behaviour.draw_steering_arrow(ARROW_RAW_STEER, ctx.pose, raw_steer_rad, [0.0, 1.0, 1.0]);

        // ---- OBSTACLE AVOIDANCE ----

        let threshold_distance_m = ctx.distance_to_goal_m
            .max(params.collision_box_min_length_m)
            .min(AVOIDANCE_MAX_THRESHOLD_DISTANCE_M);

        let mut steer_rad = raw_steer_rad;
        let mut collision = false;

        if let Some(avoidance) = self.avoidance.as_mut() {
            if !avoidance.is_ready() {
                warn_throttle!(
                    self.throttle_not_ready,
                    "Not using obstacle avoidance, not ready yet! (Maybe obstacle map not published?)"
                );
            }
            else {
                avoidance.create(threshold_distance_m, AVOIDANCE_URGENCY_THRESHOLD);
                let adjustment = avoidance.adjust(raw_steer_rad, AVOIDANCE_URGENCY_THRESHOLD);
                avoidance.visualize(raw_steer_rad, AVOIDANCE_URGENCY_THRESHOLD);

                steer_rad = adjustment.steer_rad;
                collision = !adjustment.ok;
            }
        }

        behaviour.draw_steering_arrow(ARROW_ADJUSTED_STEER, ctx.pose, steer_rad, [0.0, 1.0, 1.0]);

        // ---- SPEED ----

        let mut speed_ms = speed_ms;

        trace!("dir = {}, steer = {}", ctx.dir_sign, steer_rad.abs());
        if steer_rad.abs() > params.steer_slow_threshold_rad {
            warn_throttle!(self.throttle_slow, "Slowing down");
            speed_ms *= 0.5;
        }

        if speed_ms < params.min_velocity_ms {
            warn_throttle!(
                self.throttle_clamp,
                "Velocity is below minimum. It is set to minimum velocity."
            );
            speed_ms = params.min_velocity_ms;
        }
        else if speed_ms > params.max_velocity_ms {
            warn_throttle!(
                self.throttle_clamp,
                "Velocity is above maximum. Reduce to maximum velocity."
            );
            speed_ms = params.max_velocity_ms;
        }

        // ---- COLLISION ----

        let course_rad = ctx.dir_sign * steer_rad;
        collision |= behaviour.is_collision(course_rad);

        if collision {
            warn_throttle!(self.throttle_collision, "Collision!");
            self.stop_motion();
        }
        else {
            self.cmd = DriveCmd {
                velocity_ms: ctx.dir_sign * speed_ms,
                steer_front_rad: course_rad,
                steer_back_rad: 0.0
            };
        }

        debug!("Set velocity to {}", speed_ms);

        Some(CommandOutput {
            cmd: self.cmd,
            raw_steer_rad,
            steer_rad,
            speed_ms,
            collision,
            escalate: (steer_rad - raw_steer_rad).abs() > ESCALATION_THRESHOLD_RAD
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::steer_ctrl::{Adjustment, PassiveBehaviour, PidParams};

    /// A PID which outputs a fixed steering angle.
    struct FixedPid(pub Option<f64>);

    impl SteeringPid for FixedPid {
        fn configure(&mut self, _params: &PidParams) {}

        fn execute(&mut self, _error: f64) -> Option<f64> {
            self.0
        }

        fn reset(&mut self) {}
    }

    /// Avoidance which offsets the steering by a fixed amount.
    struct OffsetAvoidance {
        ready: bool,
        offset: f64,
        ok: bool
    }

    impl ObstacleAvoidance for OffsetAvoidance {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn create(&mut self, _threshold_distance_m: f64, _urgency_threshold: f64) {}

        fn adjust(&mut self, raw_steer_rad: f64, _urgency_threshold: f64) -> Adjustment {
            Adjustment {
                steer_rad: raw_steer_rad + self.offset,
                ok: self.ok
            }
        }
    }

    struct Blocked;

    impl DriveBehaviour for Blocked {
        fn is_collision(&mut self, _course_rad: f64) -> bool {
            true
        }
    }

    fn core(steer: Option<f64>, avoidance: Option<OffsetAvoidance>) -> SteerCore {
        SteerCore::new(
            Box::new(FixedPid(steer)),
            avoidance.map(|a| Box::new(a) as Box<dyn ObstacleAvoidance>)
        )
    }

    fn ctx(pose: &Pose, dir_sign: f64) -> CommandContext {
        CommandContext {
            dir_sign,
            distance_to_goal_m: 10.0,
            pose
        }
    }

    #[test]
    fn test_plain_command() {
        let pose = Pose::default();
        let params = Params::default();
        let mut core = core(Some(0.1), None);

        let out = core
            .compute_command(0.3, 1.0, &ctx(&pose, 1.0), &params, &mut PassiveBehaviour)
            .unwrap();

        assert_eq!(out.cmd, DriveCmd { velocity_ms: 1.0, steer_front_rad: 0.1, steer_back_rad: 0.0 });
        assert!(!out.escalate);
        assert!(!out.collision);

        // Reversing flips both the speed and the steering
        let out = core
            .compute_command(0.3, 1.0, &ctx(&pose, -1.0), &params, &mut PassiveBehaviour)
            .unwrap();
        assert_eq!(out.cmd, DriveCmd { velocity_ms: -1.0, steer_front_rad: -0.1, steer_back_rad: 0.0 });
    }

    #[test]
    fn test_pid_not_updated_keeps_command() {
        let pose = Pose::default();
        let params = Params::default();
        let mut core = core(None, None);

        core.cmd = DriveCmd { velocity_ms: 0.7, steer_front_rad: 0.2, steer_back_rad: 0.0 };

        assert!(core
            .compute_command(0.3, 1.0, &ctx(&pose, 1.0), &params, &mut PassiveBehaviour)
            .is_none());
        assert_eq!(core.cmd().velocity_ms, 0.7);
        assert_eq!(core.cmd().steer_front_rad, 0.2);
    }

    #[test]
    fn test_speed_shaping_and_limits() {
        let pose = Pose::default();
        let params = Params::default();

        // Large steering halves the speed
        let mut c = core(Some(0.4), None);
        let out = c
            .compute_command(0.0, 1.6, &ctx(&pose, 1.0), &params, &mut PassiveBehaviour)
            .unwrap();
        assert_eq!(out.speed_ms, 0.8);

        // Speeds are clamped into the bounds, whatever is requested
        let mut c = core(Some(0.0), None);
        for &requested in &[-3.0, 0.0, 0.05, 0.5, 1.99, 2.0, 50.0] {
            for &dir in &[1.0, -1.0] {
                let out = c
                    .compute_command(0.0, requested, &ctx(&pose, dir), &params, &mut PassiveBehaviour)
                    .unwrap();
                let v = out.cmd.velocity_ms.abs();
                assert!(v >= params.min_velocity_ms && v <= params.max_velocity_ms);
            }
        }
    }

    #[test]
    fn test_avoidance_adjustment() {
        let pose = Pose::default();
        let params = Params::default();

        // Small adjustment doesn't escalate
        let mut c = core(Some(0.1), Some(OffsetAvoidance {
            ready: true, offset: 0.04, ok: true
        }));
        let out = c
            .compute_command(0.0, 1.0, &ctx(&pose, 1.0), &params, &mut PassiveBehaviour)
            .unwrap();
        assert!((out.steer_rad - 0.14).abs() < 1e-12);
        assert!(!out.escalate);

        // Large adjustment does
        let mut c = core(Some(0.1), Some(OffsetAvoidance {
            ready: true, offset: -0.06, ok: true
        }));
        let out = c
            .compute_command(0.0, 1.0, &ctx(&pose, 1.0), &params, &mut PassiveBehaviour)
            .unwrap();
        assert!(out.escalate);

        // Exactly on the threshold doesn't escalate, either way round
        for &offset in &[ESCALATION_THRESHOLD_RAD, -ESCALATION_THRESHOLD_RAD] {
            let mut c = core(Some(0.0), Some(OffsetAvoidance {
                ready: true, offset, ok: true
            }));
            let out = c
                .compute_command(0.0, 1.0, &ctx(&pose, 1.0), &params, &mut PassiveBehaviour)
                .unwrap();
            assert_eq!((out.steer_rad - out.raw_steer_rad).abs(), ESCALATION_THRESHOLD_RAD);
            assert!(!out.escalate);
        }

        // Not ready: the raw steering is used unchanged
        let mut c = core(Some(0.1), Some(OffsetAvoidance {
            ready: false, offset: 0.3, ok: false
        }));
        let out = c
            .compute_command(0.0, 1.0, &ctx(&pose, 1.0), &params, &mut PassiveBehaviour)
            .unwrap();
        assert_eq!(out.steer_rad, 0.1);
        assert!(!out.collision);
        assert!(!out.escalate);
    }

    #[test]
    fn test_avoidance_threshold_distance() {
        let pose = Pose::default();
        let params = Params::default();

        for &(to_goal, expected) in &[(0.1, 0.5), (2.0, 2.0), (10.0, 3.5)] {
            let probe = Threshold::default();
            let mut c = SteerCore::new(
                Box::new(FixedPid(Some(0.0))),
                Some(Box::new(probe.clone()))
            );

            let context = CommandContext { dir_sign: 1.0, distance_to_goal_m: to_goal, pose: &pose };
            c.compute_command(0.0, 1.0, &context, &params, &mut PassiveBehaviour).unwrap();

            assert_eq!(probe.get(), expected);
        }
    }

    /// Records the threshold distance avoidance was created with.
    #[derive(Default, Clone)]
    struct Threshold(std::rc::Rc<std::cell::Cell<f64>>);

    impl Threshold {
        fn get(&self) -> f64 {
            self.0.get()
        }
    }

    impl ObstacleAvoidance for Threshold {
        fn is_ready(&self) -> bool {
            true
        }

        fn create(&mut self, threshold_distance_m: f64, _urgency_threshold: f64) {
            self.0.set(threshold_distance_m);
        }

        fn adjust(&mut self, raw_steer_rad: f64, _urgency_threshold: f64) -> Adjustment {
            Adjustment { steer_rad: raw_steer_rad, ok: true }
        }
    }

    #[test]
    fn test_collision_stops() {
        let pose = Pose::default();
        let params = Params::default();

        // Avoidance can't find a way round
        let mut c = core(Some(0.1), Some(OffsetAvoidance {
            ready: true, offset: 0.0, ok: false
        }));
        let out = c
            .compute_command(0.0, 1.5, &ctx(&pose, 1.0), &params, &mut PassiveBehaviour)
            .unwrap();
        assert!(out.collision);
        assert_eq!(out.cmd, DriveCmd::stop());

        // The behaviour's course check reports a collision
        let mut c = core(Some(0.1), None);
        let out = c
            .compute_command(0.0, 1.5, &ctx(&pose, 1.0), &params, &mut Blocked)
            .unwrap();
        assert!(out.collision);
        assert_eq!(out.cmd, DriveCmd::stop());
    }
}
