//! # Closed loop path following tests
//!
//! Drive the steering controller along the bundled paths with the simulated
//! vehicle.

use approx::assert_relative_eq;
use nalgebra::Vector2;

use comms_if::tc::{drive::DriveCmd, follow::{MotionStatus, PathSpec}};
use follow_lib::{
    loc::{Pose, PoseSource},
    path::Path,
    sim::{FollowSim, SimParams},
    steer_ctrl::{AbortReason, Params, Regime, SteerCtrl, TickOutcome, TickOutput}
};

const MAX_CYCLES: usize = 5000;

fn params() -> Params {
    Params::load(concat!(env!("CARGO_MANIFEST_DIR"), "/params/follow_ctrl.toml"))
        .expect("Could not load the parameters")
}

fn sim_params() -> SimParams {
    util::params::load(concat!(env!("CARGO_MANIFEST_DIR"), "/params/sim.toml"))
        .expect("Could not load the simulation parameters")
}

fn load_path(json: &str) -> (Path, Option<f64>) {
    let spec = PathSpec::from_json(json).unwrap();
    (Path::from_path_spec(&spec).unwrap(), spec.velocity_ms)
}

fn make_sim(json: &str, start: Pose, obstacles: Vec<Vector2<f64>>) -> FollowSim {
    let (path, velocity_ms) = load_path(json);
    let params = params();
    let dt = params.pid.sample_time_s;
    assert!(dt > 0.0);

    let mut ctrl = SteerCtrl::new(params).unwrap();
    if let Some(v) = velocity_ms {
        ctrl.set_velocity(v);
    }

    FollowSim::new(ctrl, path, start, obstacles, sim_params())
}

/// Run until the goal, returning every tick's output.
fn run(sim: &mut FollowSim, max_cycles: usize) -> Vec<TickOutput> {
    let dt = sim.ctrl().params().pid.sample_time_s;
    let mut outputs = Vec::new();

    for _ in 0..max_cycles {
        match sim.cycle(dt) {
            Some(o) => outputs.push(o),
            None => break
        }
    }

    outputs
}

#[test]
fn test_straight_path_reaches_goal() {
    let mut sim = make_sim(
        include_str!("../paths/straight.json"),
        Pose::new(0.0, 0.0, 0.0),
        vec![]
    );

    let outputs = run(&mut sim, MAX_CYCLES);

    assert!(sim.is_finished());
    assert!(outputs.iter().all(|o| o.status == MotionStatus::Moving));
    assert!(outputs.iter().all(|o| !matches!(o.outcome, TickOutcome::Abort(_))));

    // Approach was entered before the goal
    assert!(outputs
        .iter()
        .any(|o| o.report.regime == Regime::ApproachTurningPoint));

    // Never faster than allowed
    let max_velocity = sim.ctrl().params().max_velocity_ms;
    assert!(outputs.iter().all(|o| o.cmd.velocity_ms.abs() <= max_velocity));

    let pose = sim.vehicle().pose();
    assert_relative_eq!(pose.position_m[0], 5.0, epsilon = 0.2);
    assert_relative_eq!(pose.position_m[1], 0.0, epsilon = 1e-9);
    assert_eq!(sim.ctrl().cmd(), DriveCmd::stop());
}

#[test]
fn test_reverse_at_cusp() {
    let mut sim = make_sim(
        include_str!("../paths/reverse.json"),
        Pose::new(0.0, 0.0, 0.0),
        vec![]
    );

    let outputs = run(&mut sim, MAX_CYCLES);

    assert!(sim.is_finished());

    // Drove forwards, then backwards
    assert!(outputs.iter().any(|o| o.cmd.velocity_ms > 0.0));
    assert!(outputs.iter().any(|o| o.cmd.velocity_ms < 0.0 && o.report.dir_sign < 0.0));

    // Reversing on the line is at half speed
    assert!(outputs
        .iter()
        .filter(|o| o.report.regime == Regime::OnLine && o.report.dir_sign < 0.0)
        .all(|o| o.cmd.velocity_ms >= -0.4 - 1e-12));

    let pose = sim.vehicle().pose();
    assert_relative_eq!(pose.position_m[0], 1.0, epsilon = 0.2);
    assert_relative_eq!(pose.heading_rad, 0.0, epsilon = 1e-9);
}

#[test]
fn test_path_lost_aborts() {
    let mut sim = make_sim(
        include_str!("../paths/straight.json"),
        Pose::new(0.0, 0.5, 0.0),
        vec![]
    );

    let outputs = run(&mut sim, 10);

    assert_eq!(outputs[0].outcome, TickOutcome::Abort(AbortReason::PathLost));
    assert_eq!(outputs[0].cmd, DriveCmd::stop());

    // Stays stopped
    assert!(outputs.iter().all(|o| o.cmd == DriveCmd::stop()));
    assert!(outputs.iter().all(|o| o.status == MotionStatus::PathLost));
    assert_eq!(sim.ctrl().regime(), Regime::EmergencyBreak);
    assert!(!sim.is_finished());
}

#[test]
fn test_obstacle_stops_vehicle() {
    let mut sim = make_sim(
        include_str!("../paths/straight.json"),
        Pose::new(0.0, 0.0, 0.0),
        vec![Vector2::new(2.0, 0.0)]
    );

    let outputs = run(&mut sim, 1000);

    assert!(!sim.is_finished());
    assert!(sim.obstacles().num_collisions > 0);

    let last = outputs.last().unwrap();
    assert_eq!(last.status, MotionStatus::Collision);
    assert_eq!(last.cmd, DriveCmd::stop());
    assert!(last.report.collision);

    // A collision is not an abort
    assert_eq!(sim.ctrl().regime(), Regime::OnLine);

    // Stopped short of the obstacle
    let x = sim.vehicle().pose().position_m[0];
    assert!(x > 1.0 && x < 2.0, "stopped at x = {}", x);
}

#[test]
fn test_deadband_holds_initial_stop() {
    let (path, _) = load_path(include_str!("../paths/straight.json"));

    let mut params = params();
    params.pid.error_deadband = 0.1;
    let ctrl = SteerCtrl::new(params).unwrap();

    let mut sim = FollowSim::new(ctrl, path, Pose::new(0.0, 0.0, 0.0), vec![], sim_params());
    let outputs = run(&mut sim, 50);

    // Exactly on the path there is never an error to act on
    assert_eq!(outputs.len(), 50);
    assert!(outputs.iter().all(|o| !o.report.pid_updated));
    assert!(outputs.iter().all(|o| o.cmd == DriveCmd::stop()));
    assert!(outputs.iter().all(|o| o.status == MotionStatus::Moving));
    assert_eq!(sim.vehicle().pose().position_m[0], 0.0);
}
