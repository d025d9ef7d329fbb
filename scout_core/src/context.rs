// scout_core/src/context.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::{RobotConfig, TimeoutConfig};
use crate::error::{MissionFailure, Result, Side};
use crate::hardware::{Hardware, HardwareConnector};
use crate::safety::{Shutdown, Timeout};

/// Longest the finalizer waits for the head to return to centre.
const CENTER_HEAD_WAIT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The single shared session: device handles, time source, shutdown flag
/// and configuration. Passed by reference into every component.
pub struct RobotContext {
    hardware: Hardware,
    clock: Arc<dyn Clock>,
    shutdown: Shutdown,
    config: RobotConfig,
    de_energized: AtomicBool,
}

impl RobotContext {
    pub fn new(
        hardware: Hardware,
        clock: Arc<dyn Clock>,
        shutdown: Shutdown,
        config: RobotConfig,
    ) -> Self {
        Self {
            hardware,
            clock,
            shutdown,
            config,
            de_energized: AtomicBool::new(false),
        }
    }

    /// Validates the configuration, then opens every device through `connector`.
    pub fn connect(
        connector: &mut dyn HardwareConnector,
        clock: Arc<dyn Clock>,
        shutdown: Shutdown,
        config: RobotConfig,
    ) -> Result<Self> {
        config.validate()?;
        let hardware = Hardware::connect(connector, &config.connect, clock.as_ref())?;
        Ok(Self::new(hardware, clock, shutdown, config))
    }

    // --- Accessors ---

    pub fn hardware(&self) -> &Hardware {
        &self.hardware
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    // --- Time ---

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    pub fn sleep(&self, duration: Duration) {
        self.clock.sleep(duration);
    }

    /// Starts a timeout for `activity` with a budget in seconds.
    pub fn timeout(&self, activity: impl Into<String>, seconds: f64) -> Timeout {
        Timeout::new(
            activity,
            TimeoutConfig::duration(seconds),
            Arc::clone(&self.clock),
        )
    }

    pub fn check_shutdown(&self) -> Result<()> {
        self.shutdown.check()
    }

    // --- Sensor queries ---

    /// Current gyroscope heading in whole degrees, clockwise positive.
    pub fn gyro_angle(&self) -> Result<i32> {
        let mut gyro = self.hardware.gyro();
        if !gyro.calibrated {
            return Err(MissionFailure::GyroscopeNotCalibrated);
        }
        Ok(gyro.sensor.sample_angle().round() as i32)
    }

    pub fn head_angle(&self) -> i32 {
        self.hardware.head().position()
    }

    /// Latest rangefinder reading, or `None` when the echo is missing or untrusted.
    pub fn head_distance(&self) -> Option<f32> {
        let raw = self.hardware.sonar().sample_distance();
        trusted_distance(raw, self.config.body.max_trusted_distance)
    }

    pub fn touch(&self, side: Side) -> bool {
        self.hardware.touch().is_pressed(side)
    }

    pub fn base_positions(&self) -> (i32, i32) {
        self.hardware.base().positions()
    }

    pub fn base_is_moving(&self) -> bool {
        self.hardware.base().is_moving()
    }

    pub fn head_is_moving(&self) -> bool {
        self.hardware.head().is_moving()
    }

    // --- Gyroscope reference ---

    /// Drops the gyroscope reference and restarts the sensor.
    pub fn reinitialize_gyro(&self) {
        let mut gyro = self.hardware.gyro();
        gyro.calibrated = false;
        gyro.sensor.reinitialize();
    }

    /// Accepts the gyroscope reference if a fresh reading is exactly zero.
    pub fn accept_gyro_if_zeroed(&self) -> bool {
        let mut gyro = self.hardware.gyro();
        let angle = gyro.sensor.sample_angle().round() as i32;
        gyro.calibrated = angle == 0;
        gyro.calibrated
    }

    // --- Motor shutdown ---

    pub fn stop_all_motors_with_coast(&self) {
        self.hardware.stop_all_motors_with_coast();
    }

    /// Coasts the base and returns the head to centre, exactly once per context.
    pub fn de_energize(&self) {
        if self.de_energized.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Stopping robot...");
        self.hardware.base().coast();
        {
            let mut head = self.hardware.head();
            head.brake();
            head.set_speed(self.config.head.center_speed);
            head.rotate_to(0);
        }
        let started = self.clock.elapsed();
        while self.head_is_moving() {
            if self.clock.elapsed().saturating_sub(started) > CENTER_HEAD_WAIT {
                debug!("........ de-energize (head did not reach centre)");
                break;
            }
            self.clock.sleep(POLL_INTERVAL);
        }
        self.hardware.head().coast();
    }

    pub fn is_de_energized(&self) -> bool {
        self.de_energized.load(Ordering::SeqCst)
    }
}

/// Filters a raw range reading to a trusted distance.
pub fn trusted_distance(raw: f32, max_trusted: f32) -> Option<f32> {
    if raw.is_finite() && raw >= 0.0 && raw <= max_trusted {
        Some(raw)
    } else {
        None
    }
}
