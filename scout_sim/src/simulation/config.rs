// scout_sim/src/simulation/config.rs

//! Scenario files: the simulated world, its noise and faults, and the robot
//! configuration handed to the core.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use scout_core::config::RobotConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Scenario file not found: {0}")]
    Missing(PathBuf),

    #[error("Failed to load scenario: {0}")]
    Figment(#[from] figment::Error),

    #[error("Failed to parse scenario: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid scenario: {0}")]
    Invalid(String),
}

// =========================================================================
// == Top-Level Scenario ==
// =========================================================================

/// # ScenarioConfig
/// The root of a `scenario.toml` file.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ScenarioConfig {
    pub simulation: SimulationSection,
    pub robot: RobotConfig,
    pub world: WorldSection,
    pub noise: NoiseSection,
    pub faults: FaultSection,
    /// Missions run when none are named on the command line.
    pub missions: Vec<String>,
}

impl ScenarioConfig {
    /// Loads `path`, then overlays `SCOUT_`-prefixed environment variables
    /// (`SCOUT_SIMULATION__SEED=7` sets `simulation.seed`).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        let config: ScenarioConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("SCOUT_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses an inline scenario, without any environment overlay.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ScenarioConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.robot
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let sim = &self.simulation;
        if sim.call_latency_ms <= 0.0 {
            return Err(ConfigError::Invalid(
                "simulation.call_latency_ms must be positive".to_string(),
            ));
        }
        if sim.time_step_ms <= 0.0 {
            return Err(ConfigError::Invalid(
                "simulation.time_step_ms must be positive".to_string(),
            ));
        }
        if sim.track_width <= 0.0 || sim.body_radius <= 0.0 {
            return Err(ConfigError::Invalid(
                "simulation.track_width and simulation.body_radius must be positive".to_string(),
            ));
        }
        if self.noise.gyro_stddev < 0.0 || self.noise.sonar_stddev < 0.0 {
            return Err(ConfigError::Invalid(
                "noise standard deviations cannot be negative".to_string(),
            ));
        }
        if let Some(room) = &self.world.room {
            if room.min[0] >= room.max[0] || room.min[1] >= room.max[1] {
                return Err(ConfigError::Invalid(format!(
                    "world.room min {:?} is not below max {:?}",
                    room.min, room.max
                )));
            }
        }
        Ok(())
    }
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

/// Timing and chassis geometry of the simulated robot.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct SimulationSection {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// Largest physics integration step.
    pub time_step_ms: f64,
    /// Virtual time consumed by every driver call.
    pub call_latency_ms: f64,
    /// Distance between the two drive wheels (cm).
    pub track_width: f64,
    /// Radius of the circular chassis (cm).
    pub body_radius: f64,
    /// Spring travel of the front bumper before the chassis itself makes contact.
    pub bumper_travel: f64,
    /// Fastest a motor turns, in degrees per second.
    pub motor_max_speed: f64,
    /// Longest range the ultrasonic sensor reports an echo for.
    pub sonar_max_range: f64,
    /// Full opening angle of the ultrasonic beam.
    pub sonar_beam_width: f64,
    /// Reading reported when there is no echo.
    pub sonar_no_echo: f32,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            seed: None,
            time_step_ms: 5.0,
            call_latency_ms: 3.0,
            track_width: 12.0,
            body_radius: 12.0,
            bumper_travel: 3.0,
            motor_max_speed: 1050.0,
            sonar_max_range: 250.0,
            sonar_beam_width: 10.0,
            sonar_no_echo: 255.0,
        }
    }
}

/// Static obstacles and the robot's starting pose.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct WorldSection {
    pub start: StartPose,
    pub room: Option<RoomConfig>,
    pub walls: Vec<WallConfig>,
    pub boxes: Vec<BoxConfig>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct StartPose {
    pub x: f64,
    pub y: f64,
    /// Compass heading in degrees, clockwise from +y.
    pub heading: f64,
}

/// An axis-aligned rectangular room enclosing the robot.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RoomConfig {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

/// A single wall segment.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WallConfig {
    pub from: [f64; 2],
    pub to: [f64; 2],
}

/// An axis-aligned box obstacle.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BoxConfig {
    pub center: [f64; 2],
    pub size: [f64; 2],
}

/// Gaussian sensor noise and drift.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct NoiseSection {
    pub gyro_stddev: f64,
    pub gyro_drift_per_second: f64,
    pub sonar_stddev: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Wheel {
    Left,
    Right,
}

/// Injected hardware faults.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct FaultSection {
    /// A wheel whose axle is blocked: it draws power but never turns.
    pub jammed_wheel: Option<Wheel>,
    /// Multipliers on the actual speed of each wheel.
    pub left_speed_bias: f64,
    pub right_speed_bias: f64,
    /// Connection attempts that fail before each device comes up.
    pub connect_failures: u32,
    /// Gyroscope re-initializations that leave a residual offset.
    pub unsettled_gyro_reinits: u32,
    /// The ultrasonic sensor never hears an echo.
    pub sonar_blind: bool,
}

impl Default for FaultSection {
    fn default() -> Self {
        Self {
            jammed_wheel: None,
            left_speed_bias: 1.0,
            right_speed_bias: 1.0,
            connect_failures: 0,
            unsettled_gyro_reinits: 0,
            sonar_blind: false,
        }
    }
}
