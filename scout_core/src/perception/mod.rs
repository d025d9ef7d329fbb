// scout_core/src/perception/mod.rs

// --- Sensing around the robot ---
pub mod head_turner;
pub mod proximity;
pub mod sweep;

pub use head_turner::HeadTurner;
pub use proximity::ProximityMap;
pub use sweep::{look_around, sweep_range_correction, wait_until_head_stops_moving};
