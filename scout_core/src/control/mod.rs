// scout_core/src/control/mod.rs

// --- Closed-loop motion of the base ---
pub mod calibration;
pub mod motion;
pub mod waits;

pub use calibration::{calibrate_gyroscope, calibrate_motors};
pub use motion::{MotionController, Movement};
pub use waits::{wait_until_base_stops_moving, wait_until_base_stops_rotating};
