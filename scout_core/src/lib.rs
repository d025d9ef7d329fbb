// scout_core/src/lib.rs

// This file defines the public modules of the library.
pub mod clock;
pub mod config;
pub mod context;
pub mod control;
pub mod error;
pub mod geometry;
pub mod hardware;
pub mod mapping;
pub mod mission;
pub mod perception;
pub mod prelude;
pub mod robot;
pub mod safety;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
