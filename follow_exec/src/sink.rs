//! # Command sinks
//!
//! The steering controller never publishes its commands itself. The caller
//! hands each tick's command to a [`CommandSink`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;

use comms_if::tc::drive::{DriveCmd, Twist};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something which accepts drive commands, e.g. a vehicle base controller.
pub trait CommandSink {
    fn publish(&mut self, cmd: &DriveCmd);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Sink which logs each command as a twist, and remembers the last one.
#[derive(Debug, Default)]
pub struct LogSink {
    pub last: Option<Twist>,
    pub num_published: u64,

    /// Number of published commands which stop the vehicle
    pub num_stops: u64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CommandSink for LogSink {
    fn publish(&mut self, cmd: &DriveCmd) {
        let twist = Twist::from(*cmd);
        debug!("Twist: linear_x = {:.4}, angular_z = {:.4}", twist.linear_x, twist.angular_z);

        self.last = Some(twist);
        self.num_published += 1;
        if cmd.is_stop() {
            self.num_stops += 1;
        }
    }
}
