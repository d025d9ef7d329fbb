// scout_sim/src/prelude.rs

pub use crate::cli::Cli;
pub use crate::missions::{registry, MissionLimits};
pub use crate::simulation::config::{ConfigError, ScenarioConfig};
pub use crate::simulation::world::{Pose, SharedWorld, World};
pub use crate::simulation::Simulation;
