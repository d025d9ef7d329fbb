// scout_core/src/config.rs

use serde::Deserialize;
use std::f64::consts::PI;
use std::time::Duration;

use crate::error::{MissionFailure, Result};

// =========================================================================
// == Top-Level Robot Configuration ==
// =========================================================================

/// # RobotConfig
/// Every physical constant and tuning knob of the robot core.
/// This struct maps onto the `[robot]` section of a scenario file; any section
/// or field left out falls back to the values of the reference robot.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct RobotConfig {
    pub body: BodyConfig,
    pub drive: DriveConfig,
    pub head: HeadConfig,
    pub calibration: CalibrationConfig,
    pub timeouts: TimeoutConfig,
    pub mapping: MappingConfig,
    pub connect: ConnectConfig,
}

impl RobotConfig {
    /// Rejects combinations that would make the control loops misbehave.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(MissionFailure::InvalidArgument(msg));

        if self.body.wheel_diameter <= 0.0 {
            return invalid(format!(
                "wheel diameter must be positive (found {})",
                self.body.wheel_diameter
            ));
        }
        if self.body.power_to_speed <= 0.0 {
            return invalid("power-to-speed factor must be positive".to_string());
        }
        let drive = &self.drive;
        if drive.min_forward_power == 0
            || drive.min_forward_power > drive.max_forward_power
            || drive.max_forward_power > 100
        {
            return invalid(format!(
                "forward power range {}..={} is not within 1..=100",
                drive.min_forward_power, drive.max_forward_power
            ));
        }
        if drive.min_turning_power == 0 || drive.min_turning_power > 100 {
            return invalid(format!(
                "turning power {} is not within 1..=100",
                drive.min_turning_power
            ));
        }
        if drive.stall_tick_limit == 0 {
            return invalid("stall tick limit must be at least 1".to_string());
        }
        if drive.bump_period < 2 {
            return invalid("bump poll period must be at least 2 ticks".to_string());
        }
        let cal = &self.calibration;
        if cal.min_steps > cal.max_steps || cal.fixed_steps == 0 {
            return invalid(format!(
                "calibration range {}..={} with {} fixed steps is unusable",
                cal.min_steps, cal.max_steps, cal.fixed_steps
            ));
        }
        if self.mapping.grid_size == 0 || self.mapping.grid_size % 2 != 0 {
            return invalid(format!(
                "map grid size ({}) must be even and positive",
                self.mapping.grid_size
            ));
        }
        if self.mapping.cell_size <= 0.0 {
            return invalid("map cell size must be positive".to_string());
        }
        Ok(())
    }

    pub fn wheel_circumference(&self) -> f64 {
        self.body.wheel_diameter * PI
    }

    /// Converts a distance along the floor into wheel-encoder steps (degrees of wheel rotation).
    pub fn distance_to_steps(&self, distance: f64) -> f64 {
        distance / self.wheel_circumference() * 360.0
    }

    pub fn steps_to_distance(&self, steps: f64) -> f64 {
        steps / 360.0 * self.wheel_circumference()
    }

    /// Motor speed (degrees per second) for a power percentage.
    pub fn power_to_speed(&self, power: i32) -> u32 {
        (power.max(0) as f64 * self.body.power_to_speed) as u32
    }
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

/// Physical dimensions of the chassis and its sensors.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct BodyConfig {
    /// Drive wheel diameter in centimetres.
    pub wheel_diameter: f64,
    /// Distance from the rangefinder to the turning midpoint of the robot.
    pub eyes_to_midpoint: f32,
    /// Narrowest corridor the robot can drive through.
    pub safe_passing_width: f32,
    /// Clearance kept between the robot and any tracked obstacle.
    pub safe_stopping_distance: f32,
    /// Ranges above this are treated as "no echo".
    pub max_trusted_distance: f32,
    /// Motor speed (deg/s) per percent of power.
    pub power_to_speed: f64,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            wheel_diameter: 5.6,
            eyes_to_midpoint: 11.0,
            safe_passing_width: 30.0,
            safe_stopping_distance: 20.0,
            max_trusted_distance: 254.0,
            power_to_speed: 10.0,
        }
    }
}

/// Tuning of the closed-loop drive and the open-loop step moves.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct DriveConfig {
    pub min_forward_power: i32,
    pub max_forward_power: i32,
    pub min_turning_power: i32,
    /// Fixed power of `step_forward` / `step_backward`.
    pub step_power: i32,
    /// Braking roll reserved before the destination (cm).
    pub stopping_distance: f32,
    /// Initial obstacle lookahead window (cm).
    pub lookahead: f32,
    /// Power added per control tick while ramping up.
    pub ramp_step: i32,
    /// Below this remaining/safe distance the target power is scaled down (cm).
    pub deceleration_threshold: f32,
    /// Ticks ignored by stall detection while the wheels spin up.
    pub stall_warmup_ticks: u32,
    /// Consecutive zero-delta ticks after the warm-up that count as a stall; `1` fails on the first.
    pub stall_tick_limit: u32,
    /// Every `bump_period` ticks each touch sensor is polled once, half a period apart.
    pub bump_period: u32,
    /// Head power while scanning during forward motion.
    pub scan_power: i32,
    /// Stopping rolls shorter than this many steps become a hard stop.
    pub hard_stop_steps: i32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            min_forward_power: 10,
            max_forward_power: 90,
            min_turning_power: 10,
            step_power: 20,
            stopping_distance: 10.0,
            lookahead: 80.0,
            ramp_step: 10,
            deceleration_threshold: 50.0,
            stall_warmup_ticks: 2,
            stall_tick_limit: 1,
            bump_period: 20,
            scan_power: 5,
            hard_stop_steps: 5,
        }
    }
}

/// Panning head sweeps.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct HeadConfig {
    pub look_around_angle: i32,
    pub look_around_speed: u32,
    /// Speed used to return the head to centre on shutdown.
    pub center_speed: u32,
    /// Smallest and largest sweep half-angle accepted by the head turner.
    pub min_scan_angle: i32,
    pub max_scan_angle: i32,
    /// A sweep leg is complete within this many degrees of its target.
    pub close_enough: i32,
    /// Head sweeps only ask the motor whether it is moving every N samples.
    pub moving_check_every: u32,
}

impl Default for HeadConfig {
    fn default() -> Self {
        Self {
            look_around_angle: 120,
            look_around_speed: 100,
            center_speed: 100,
            min_scan_angle: 5,
            max_scan_angle: 120,
            close_enough: 3,
            moving_check_every: 5,
        }
    }
}

/// Gyroscope and steps-per-revolution calibration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct CalibrationConfig {
    /// Steps each wheel turns (in opposite directions) for the measuring rotation.
    pub fixed_steps: i32,
    pub speed: u32,
    pub min_steps: u32,
    pub max_steps: u32,
    /// Failed gyroscope passes before a warning is raised.
    pub gyro_warning_pass: u32,
    /// Settle delay unit for gyroscope re-initialization; pass N waits N units.
    pub gyro_settle_ms: u64,
    /// Base-is-moving is queried every N samples while the base rotates.
    pub moving_check_every: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            fixed_steps: 500,
            speed: 100,
            min_steps: 600,
            max_steps: 1200,
            gyro_warning_pass: 5,
            gyro_settle_ms: 100,
            moving_check_every: 10,
        }
    }
}

/// Wall-clock budgets (seconds) for every blocking wait.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct TimeoutConfig {
    pub turn: f64,
    pub move_forward: f64,
    pub stop: f64,
    pub head_leg: f64,
    pub gyro_calibration: f64,
    pub motor_calibration: f64,
    /// Budget of `step_forward` / `step_backward` per started metre.
    pub step_per_metre: f64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            turn: 10.0,
            move_forward: 20.0,
            stop: 5.0,
            head_leg: 5.0,
            gyro_calibration: 30.0,
            motor_calibration: 20.0,
            step_per_metre: 20.0,
        }
    }
}

impl TimeoutConfig {
    pub fn duration(seconds: f64) -> Duration {
        Duration::from_secs_f64(seconds.max(0.0))
    }
}

/// Occupancy grid used for exploration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct MappingConfig {
    pub cell_size: f64,
    pub grid_size: usize,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            cell_size: 10.0,
            grid_size: 100,
        }
    }
}

/// Retry policy for opening device drivers.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ConnectConfig {
    pub retry_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 20,
            max_attempts: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_are_valid() {
        RobotConfig::default().validate().unwrap();
    }

    #[test]
    fn steps_round_trip_through_distance() {
        let config = RobotConfig::default();
        let steps = config.distance_to_steps(100.0);
        assert_relative_eq!(steps, 100.0 / (5.6 * PI) * 360.0);
        assert_relative_eq!(config.steps_to_distance(steps), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn odd_grid_is_rejected() {
        let mut config = RobotConfig::default();
        config.mapping.grid_size = 99;
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_power_range_is_rejected() {
        let mut config = RobotConfig::default();
        config.drive.min_forward_power = 95;
        assert!(config.validate().is_err());
    }
}
