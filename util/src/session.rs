//! Session management
//!
//! A session is one run of an executable. It owns a timestamped directory
//! holding the log file, the CSV archives and copies of the input files the
//! run was started with, so a run can be reproduced later.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

/// Start time of the session. Only one session may exist per process.
static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Format of the timestamp in session directory names.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Session subdirectory for the archives.
const ARCH_DIR: &str = "arch";

/// Session subdirectory for copies of the input files.
const INPUTS_DIR: &str = "inputs";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Directories and files belonging to the current session.
#[derive(Clone, Debug)]
pub struct Session {
    /// The session directory, `{exec_name}_{timestamp}`
    pub session_root: PathBuf,

    /// Directory the CSV archives are written to
    pub arch_root: PathBuf,

    /// Directory holding copies of the run's input files
    pub inputs_root: PathBuf,

    /// The session's log file
    pub log_file_path: PathBuf
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with sessions.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error("A session has already been started in this process")]
    AlreadyStarted,

    #[error("Cannot copy {0:?} into the session: {1}")]
    CannotCopyInput(PathBuf, std::io::Error),

    #[error("{0:?} is not a file")]
    NotAFile(PathBuf)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start the session, creating its directory inside `sessions_dir`.
    pub fn new<P: AsRef<Path>>(
        exec_name: &str,
        sessions_dir: P
    ) -> Result<Self, SessionError> {
        let mut started = false;
        let epoch = SESSION_EPOCH.get_or_init(|| {
            started = true;
            Utc::now()
        });

        if !started {
            return Err(SessionError::AlreadyStarted)
        }

        let session_root = sessions_dir
            .as_ref()
            .join(format!("{}_{}", exec_name, epoch.format(TIMESTAMP_FORMAT)));
        let arch_root = session_root.join(ARCH_DIR);
        let inputs_root = session_root.join(INPUTS_DIR);

        for dir in &[&arch_root, &inputs_root] {
            fs::create_dir_all(dir).map_err(SessionError::CannotCreateDir)?;
        }

        Ok(Session {
            log_file_path: session_root.join(format!("{}.log", exec_name)),
            session_root,
            arch_root,
            inputs_root
        })
    }

    /// Keep a copy of an input file (parameters, paths) with the session.
    ///
    /// Returns the path of the copy.
    pub fn copy_input<P: AsRef<Path>>(&self, input: P) -> Result<PathBuf, SessionError> {
        let input = input.as_ref();

        let name = match input.file_name() {
            Some(n) if input.is_file() => n,
            _ => return Err(SessionError::NotAFile(input.to_path_buf()))
        };

        let dest = self.inputs_root.join(name);
        fs::copy(input, &dest)
            .map_err(|e| SessionError::CannotCopyInput(input.to_path_buf(), e))?;

        Ok(dest)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Seconds elapsed since the start of the session, NaN before it starts.
pub fn get_elapsed_seconds() -> f64 {
    SESSION_EPOCH
        .get()
        .and_then(|e| (Utc::now() - *e).num_nanoseconds())
        .map(|ns| ns as f64 * 1e-9)
        .unwrap_or(std::f64::NAN)
}

/// The session's start time, if it has started.
pub fn get_epoch() -> Option<&'static DateTime<Utc>> {
    SESSION_EPOCH.get()
}

#[cfg(test)]
mod test {
    use super::*;

    // The epoch is global, so everything touching it lives in one test.
    #[test]
    fn test_session() {
        assert!(get_elapsed_seconds().is_nan());
        assert!(get_epoch().is_none());

        let sessions_dir = std::env::temp_dir().join("util_session_test");
        let session = Session::new("test_exec", &sessions_dir).unwrap();

        assert!(session.arch_root.is_dir());
        assert!(session.inputs_root.is_dir());
        assert!(session.session_root.starts_with(&sessions_dir));
        assert!(session.log_file_path.ends_with("test_exec.log"));
        assert!(get_elapsed_seconds() >= 0.0);
        assert!(get_epoch().is_some());

        // Inputs are copied under their own name
        let input = session.session_root.join("input.toml");
        fs::write(&input, "gain = 1.0\n").unwrap();
        let copy = session.copy_input(&input).unwrap();
        assert_eq!(fs::read_to_string(copy).unwrap(), "gain = 1.0\n");

        assert!(matches!(
            session.copy_input(&session.arch_root),
            Err(SessionError::NotAFile(_))
        ));

        // Only one session per process
        assert!(matches!(
            Session::new("test_exec", &sessions_dir),
            Err(SessionError::AlreadyStarted)
        ));
    }
}
