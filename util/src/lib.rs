//! Utility library for the path follower software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod archive;
#[macro_use]
pub mod logger;
pub mod maths;
pub mod params;
pub mod session;

// ---------------------------------------------------------------------------
// MACROS
// ---------------------------------------------------------------------------

/// Emit a warning at most once per period of the given [`logger::Throttle`].
///
/// Stands in for the throttled warnings of the control loop, which would
/// otherwise flood the log at the cycle rate.
#[macro_export]
macro_rules! warn_throttle {
    ($throttle:expr, $($arg:tt)+) => ({
        if $throttle.ready() {
            log::warn!($($arg)+);
        }
    });
}
