//! Path follower executable entry point.
//!
//! # Architecture
//!
//! The executable runs the steering controller in closed loop against a
//! simulated Ackermann vehicle:
//!
//!     - Initialise the session, logging and parameters
//!     - Load the path to follow
//!     - Main loop:
//!         - Waypoint management
//!         - Steering control processing
//!         - Command publication to the vehicle
//!         - Archiving of the controller's status report
//!
//! The loop ends when the goal is reached, following is aborted, or the cycle
//! limit is hit.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::{eyre, WrapErr}, Report};
use log::{debug, error, info, warn};
use nalgebra::Vector2;
use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant}
};
use structopt::StructOpt;

// Internal
use comms_if::tc::follow::{MotionStatus, PathSpec};
use follow_lib::{
    loc::PoseSource,
    path::Path,
    sim::{FollowSim, SimParams},
    sink::{CommandSink, LogSink},
    steer_ctrl::{Params, SteerCtrl, TickOutcome}
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    session::Session
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "follow_exec", about = "Follow a path with a simulated Ackermann vehicle")]
struct Opt {
    /// Path to follow, as a JSON path spec.
    #[structopt(parse(from_os_str))]
    path: PathBuf,

    /// Steering control parameter file.
    #[structopt(long, parse(from_os_str), default_value = "params/follow_ctrl.toml")]
    params: PathBuf,

    /// Simulation parameter file.
    #[structopt(long, parse(from_os_str), default_value = "params/sim.toml")]
    sim_params: PathBuf,

    /// Maximum number of control cycles to run.
    #[structopt(short = "n", long, default_value = "10000")]
    max_cycles: u64,

    /// Pace the control loop in real time.
    #[structopt(short, long)]
    realtime: bool,

    /// Directory in which sessions are created.
    #[structopt(long, parse(from_os_str), default_value = "sessions")]
    sessions_dir: PathBuf,

    /// Point obstacle in the map frame, as `x,y`. May be given more than once.
    #[structopt(short, long = "obstacle", parse(try_from_str = parse_point))]
    obstacles: Vec<Vector2<f64>>,

    /// Log at debug level.
    #[structopt(short, long)]
    verbose: bool
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "follow_exec",
        &opt.sessions_dir
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    let level = if opt.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    logger_init(level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Path Follower Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let params = Params::load(&opt.params)
        .wrap_err("Could not load steering control params")?;
    let sim_params: SimParams = util::params::load(&opt.sim_params)
        .wrap_err("Could not load simulation params")?;

    info!("Parameters loaded");

    // Keep the inputs with the session so the run can be repeated
    for input in &[&opt.params, &opt.sim_params, &opt.path] {
        match session.copy_input(input) {
            Ok(p) => debug!("Copied {:?} to {:?}", input, p),
            Err(e) => warn!("{}", e)
        }
    }

    // ---- LOAD PATH ----

    let path_str = std::fs::read_to_string(&opt.path)
        .wrap_err_with(|| format!("Could not read the path file {:?}", opt.path))?;
    let spec = PathSpec::from_json(&path_str)
        .wrap_err("Could not parse the path file")?;
    let path = Path::from_path_spec(&spec)
        .wrap_err("Invalid path")?;

    info!(
        "Loaded path with {} waypoints, starting at waypoint {}",
        path.len(),
        path.wp_idx()
    );

    // The vehicle starts on the first waypoint
    let start = path.waypoints()[0];

    // ---- INITIALISE MODULES ----

    let cycle_period_s = params.pid.sample_time_s;

    let mut ctrl = SteerCtrl::new(params)
        .wrap_err("Failed to initialise SteerCtrl")?;
    if let Some(v) = spec.velocity_ms {
        ctrl.set_velocity(v);
    }
    info!("SteerCtrl init complete");

    let mut sim = FollowSim::new(ctrl, path, start, opt.obstacles.clone(), sim_params);
    let mut log_sink = LogSink::default();

    let mut archiver = Archiver::from_path(&session, "steer_ctrl.csv")
        .wrap_err("Failed to initialise the status archive")?;

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut num_cycles = 0u64;
    let mut last_status = MotionStatus::Moving;

    while num_cycles < opt.max_cycles {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        let output = match sim.cycle(cycle_period_s) {
            Some(o) => o,
            None => break
        };

        log_sink.publish(&output.cmd);

        if output.status != last_status {
            info!("Motion status: {}", output.status);
            last_status = output.status;
        }

        // Write archives
        if let Err(e) = archiver.serialise(output.report) {
            warn!("Could not archive the status report: {}", e);
        }

        match output.outcome {
            TickOutcome::Stay => (),
            TickOutcome::TransitionTo(regime) => info!("Switched to {:?}", regime),
            TickOutcome::Abort(reason) => {
                error!("Path following aborted: {}", reason);
                break
            }
        }

        num_cycles += 1;

        // ---- CYCLE MANAGEMENT ----

        if opt.realtime {
            let cycle_dur = Instant::now() - cycle_start_instant;

            match Duration::from_secs_f64(cycle_period_s).checked_sub(cycle_dur) {
                Some(d) => thread::sleep(d),
                None => warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period_s
                )
            }
        }
    }

    // ---- SHUTDOWN ----

    let pose = sim.vehicle().pose();
    info!(
        "Stopped after {} cycles ({:.2} s) at ({:.3}, {:.3}), status: {}",
        num_cycles,
        sim.time_s(),
        pose.position_m[0],
        pose.position_m[1],
        sim.ctrl().status()
    );
    debug!(
        "{} commands published ({} stops), {} status reports archived",
        log_sink.num_published,
        log_sink.num_stops,
        archiver.num_rows()
    );

    if sim.is_finished() {
        info!("Goal reached");
        Ok(())
    }
    else if sim.ctrl().status().is_failure() {
        Err(eyre!("Path following failed: {}", sim.ctrl().status()))
    }
    else {
        warn!("Cycle limit reached before the goal");
        Ok(())
    }
}

/// Parse an `x,y` point.
fn parse_point(s: &str) -> Result<Vector2<f64>, Report> {
    let parts: Vec<&str> = s.split(',').map(|p| p.trim()).collect();

    if parts.len() != 2 {
        return Err(eyre!("Expected a point as x,y, found \"{}\"", s))
    }

    let x = parts[0].parse::<f64>().wrap_err("Invalid x coordinate")?;
    let y = parts[1].parse::<f64>().wrap_err("Invalid y coordinate")?;

    Ok(Vector2::new(x, y))
}
