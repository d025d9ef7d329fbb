// scout_sim/src/missions/mod.rs

//! Demonstration missions registered with the mission runner.

pub mod avoidance;
pub mod discovery;

use tracing::info;

use scout_core::mission::MissionRegistry;

/// Upper bounds on mission passes, so an unattended run always ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissionLimits {
    pub discovery_passes: u32,
    pub avoidance_passes: u32,
}

impl Default for MissionLimits {
    fn default() -> Self {
        Self {
            discovery_passes: 10,
            avoidance_passes: 5,
        }
    }
}

/// The registry of every mission the simulator can run.
pub fn registry(limits: MissionLimits) -> MissionRegistry {
    let mut registry = MissionRegistry::new();
    registry
        .register("calibrate", "Calibrate the gyroscope and the drive motors", |robot| {
            robot.calibrate()?;
            info!(
                "Calibrated: {} steps per full turn",
                robot.steps_per_360().unwrap_or_default()
            );
            Ok(())
        })
        .register("look_around", "Sweep the head and report what it sees", |robot| {
            robot.look_around_default(1)?;
            info!("Proximity map: {}", robot.proximity_map());
            Ok(())
        })
        .register(
            "discovery",
            "Explore the room by driving to the nearest unexplored safe cell",
            move |robot| discovery::run(robot, limits.discovery_passes),
        )
        .register(
            "avoidance",
            "Wander towards the widest opening without touching anything",
            move |robot| avoidance::run(robot, limits.avoidance_passes),
        );
    registry
}
