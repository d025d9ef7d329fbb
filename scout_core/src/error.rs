// scout_core/src/error.rs

use std::fmt;
use thiserror::Error;

/// Result alias used by every control loop in the crate.
pub type Result<T> = std::result::Result<T, MissionFailure>;

/// Which drive wheel(s) stopped turning while they were being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalledWheels {
    Left,
    Right,
    Both,
}

impl fmt::Display for StalledWheels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StalledWheels::Left => write!(f, "Left base motor has stalled!"),
            StalledWheels::Right => write!(f, "Right base motor has stalled!"),
            StalledWheels::Both => write!(f, "Both base motors have stalled!"),
        }
    }
}

/// Side of the robot a touch sensor is mounted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// The single unrecoverable error kind of the robot core.
///
/// A `MissionFailure` unwinds out of whatever loop raised it. The mission runner
/// is responsible for halting the motors; nothing in the core retries a failed
/// motion on its own.
#[derive(Debug, Error)]
pub enum MissionFailure {
    /// A wait loop exceeded its wall-clock budget.
    #[error("Gave up waiting for {activity} to complete after {elapsed_ms} milliseconds!")]
    Timeout { activity: String, elapsed_ms: u64 },

    /// Encoder deltas stayed at zero after the warm-up window.
    #[error("{0}")]
    Stall(StalledWheels),

    /// A touch sensor reported contact during forward motion.
    #[error("My {0} touch sensor bumped into something!")]
    Bump(Side),

    /// The measured steps-per-360° fell outside the accepted range.
    #[error("Expected full turn steps in range {min} to {max}, but calibration found {found}!")]
    CalibrationOutOfRange { found: i64, min: u32, max: u32 },

    /// The gyroscope was read before it was successfully initialized.
    #[error("Gyroscope sensor is not calibrated! Call calibrate_gyroscope() before using it.")]
    GyroscopeNotCalibrated,

    /// Turning was requested before the motors were calibrated.
    #[error("Motors are not calibrated! Call calibrate_motors() before turning.")]
    MotorsNotCalibrated,

    /// A caller passed an argument outside its accepted range.
    #[error("{0}")]
    InvalidArgument(String),

    /// The cooperative shutdown flag was raised while a loop was running.
    #[error("Terminating {0} due to process shutdown.")]
    Shutdown(String),

    /// A device could not be connected after bounded retries.
    #[error("Hardware connection failed: {0}")]
    Hardware(#[from] HardwareError),

    /// The discovery grid could not be built.
    #[error("Discovery map error: {0}")]
    Map(#[from] MapError),

    /// Any other reason given to `fail`.
    #[error("{0}")]
    Reason(String),
}

impl MissionFailure {
    /// Returns true when the failure was triggered by a shutdown request rather than by the mission.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, MissionFailure::Shutdown(_))
    }
}

/// Signals an unrecoverable condition to the mission runner.
pub fn fail<T>(reason: impl Into<String>) -> Result<T> {
    Err(MissionFailure::Reason(reason.into()))
}

/// Errors raised while opening a device driver.
#[derive(Debug, Clone, Error)]
pub enum HardwareError {
    #[error("{device} did not respond: {reason}")]
    Unresponsive { device: &'static str, reason: String },

    #[error("{device} still unavailable after {attempts} attempts: {last}")]
    RetriesExhausted {
        device: &'static str,
        attempts: u32,
        last: String,
    },
}

/// Errors raised while building the discovery grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("Map grid size ({0}) is not even!")]
    OddGridSize(usize),

    #[error("Map grid size must be positive")]
    EmptyGrid,

    #[error("Map cell size must be positive")]
    ZeroCellSize,

    #[error("DiscoveryMap cell (r={row},c={column}) midpoint maps to {found}!")]
    SelfTest {
        row: usize,
        column: usize,
        found: String,
    },
}
