// scout_sim/src/lib.rs

// This prelude is for convenience for other files WITHIN the scout_sim crate.
pub mod prelude;

// Command line, the simulated world, and the missions it can run.
pub mod cli;
pub mod missions;
pub mod simulation;
