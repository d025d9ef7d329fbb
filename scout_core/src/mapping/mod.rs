// scout_core/src/mapping/mod.rs

// --- Occupancy grid and frontier planning ---
mod cell;
mod discovery;

pub use cell::{Cell, CellId};
pub use discovery::DiscoveryMap;
