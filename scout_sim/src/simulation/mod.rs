// scout_sim/src/simulation/mod.rs

//! This module contains all the simulation-specific logic: scenario loading,
//! the simulated world and the drivers that expose it to `scout_core`.

pub mod config;
pub mod drivers;
pub mod prng;
pub mod world;

use std::sync::Arc;
use tracing::info;

use scout_core::context::RobotContext;
use scout_core::error::Result;
use scout_core::robot::Robot;
use scout_core::safety::Shutdown;
use scout_core::services::{SoundWorker, SpeechWorker};

use config::ScenarioConfig;
use drivers::{LoggedSpeech, LoggedTones, SimClock, SimConnector};
use world::{Pose, SharedWorld, World};

/// A simulated robot session: the world plus a connected core context.
pub struct Simulation {
    world: SharedWorld,
    context: Arc<RobotContext>,
}

impl Simulation {
    /// Builds the world from `scenario` and connects the core to it.
    pub fn new(scenario: &ScenarioConfig, shutdown: Shutdown) -> Result<Self> {
        let world = World::new(scenario).shared();
        let clock = Arc::new(SimClock::new(world.clone()));
        let mut connector = SimConnector::new(world.clone());
        let context = RobotContext::connect(&mut connector, clock, shutdown, scenario.robot.clone())?;
        info!(
            "Simulation ready (seed: {:?}, connected after {} ms)",
            scenario.simulation.seed,
            world.lock().time().as_millis()
        );
        Ok(Self {
            world,
            context: Arc::new(context),
        })
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    pub fn context(&self) -> &Arc<RobotContext> {
        &self.context
    }

    /// Ground-truth pose of the robot.
    pub fn pose(&self) -> Pose {
        self.world.lock().pose()
    }

    /// A robot driving this simulation, without output workers.
    pub fn robot(&self) -> Result<Robot> {
        Robot::new(Arc::clone(&self.context))
    }

    /// A robot whose speech and tones are logged by background workers.
    pub fn robot_with_output(&self) -> Result<Robot> {
        let robot = self.robot()?;
        let (speech, sound) = match (
            SpeechWorker::spawn(LoggedSpeech),
            SoundWorker::spawn(LoggedTones),
        ) {
            (Ok(speech), Ok(sound)) => (speech, sound),
            (Err(e), _) | (_, Err(e)) => {
                return scout_core::error::fail(format!("Could not start output workers: {e}"))
            }
        };
        Ok(robot.with_speech(speech).with_sound(sound))
    }
}
