// scout_sim/src/simulation/drivers.rs

//! `scout_core` hardware traits implemented on top of the simulated world.
//! Every call is charged one driver latency of virtual time.

use std::time::Duration;
use tracing::info;

use scout_core::clock::Clock;
use scout_core::error::{HardwareError, Side};
use scout_core::hardware::{Gyroscope, HardwareConnector, Motor, MotorRole, RangeSensor, TouchSensor};
use scout_core::services::{SpeechSink, Tone, ToneSink};

use super::world::{Axis, SharedWorld};

// --- Clock ---

/// Virtual time: `sleep` advances the world instead of blocking.
pub struct SimClock {
    world: SharedWorld,
}

impl SimClock {
    pub fn new(world: SharedWorld) -> Self {
        Self { world }
    }
}

impl Clock for SimClock {
    fn elapsed(&self) -> Duration {
        self.world.lock().time()
    }

    fn sleep(&self, duration: Duration) {
        self.world.lock().advance(duration);
    }
}

// --- Motors ---

pub struct SimMotor {
    world: SharedWorld,
    axis: Axis,
}

impl Motor for SimMotor {
    fn set_speed(&mut self, degrees_per_second: u32) {
        let mut world = self.world.lock();
        world.charge_call();
        world.set_speed(self.axis, degrees_per_second);
    }

    fn rotate_to(&mut self, position: i32) {
        let mut world = self.world.lock();
        world.charge_call();
        world.rotate_to(self.axis, position);
    }

    fn forward(&mut self) {
        let mut world = self.world.lock();
        world.charge_call();
        world.forward(self.axis);
    }

    fn position(&mut self) -> i32 {
        let mut world = self.world.lock();
        world.charge_call();
        world.position(self.axis)
    }

    fn is_moving(&mut self) -> bool {
        let mut world = self.world.lock();
        world.charge_call();
        world.is_moving(self.axis)
    }

    fn coast(&mut self) {
        self.halt();
    }

    fn brake(&mut self) {
        self.halt();
    }

    fn stop(&mut self) {
        self.halt();
    }
}

impl SimMotor {
    fn halt(&mut self) {
        let mut world = self.world.lock();
        world.charge_call();
        world.halt(self.axis);
    }
}

// --- Sensors ---

pub struct SimSonar {
    world: SharedWorld,
}

impl RangeSensor for SimSonar {
    fn sample_distance(&mut self) -> f32 {
        let mut world = self.world.lock();
        world.charge_call();
        world.sonar_distance()
    }
}

pub struct SimGyro {
    world: SharedWorld,
}

impl Gyroscope for SimGyro {
    fn reinitialize(&mut self) {
        let mut world = self.world.lock();
        world.charge_call();
        world.reinitialize_gyro();
    }

    fn sample_angle(&mut self) -> f32 {
        let mut world = self.world.lock();
        world.charge_call();
        world.gyro_angle()
    }
}

pub struct SimTouch {
    world: SharedWorld,
    side: Side,
}

impl TouchSensor for SimTouch {
    fn is_pressed(&mut self) -> bool {
        let mut world = self.world.lock();
        world.charge_call();
        world.touch_pressed(self.side)
    }
}

// --- Connector ---

/// Hands out drivers bound to one world. Each device fails its first
/// `connect_failures` attempts, like a brick still bringing its ports up.
pub struct SimConnector {
    world: SharedWorld,
    failures_per_device: u32,
    attempts: u32,
}

impl SimConnector {
    pub fn new(world: SharedWorld) -> Self {
        let failures_per_device = world.lock().faults().connect_failures;
        Self {
            world,
            failures_per_device,
            attempts: 0,
        }
    }

    /// Fails until the current device has been tried often enough.
    fn attempt(&mut self, device: &'static str) -> Result<(), HardwareError> {
        self.world.lock().charge_call();
        if self.attempts < self.failures_per_device {
            self.attempts += 1;
            return Err(HardwareError::Unresponsive {
                device,
                reason: format!("port not ready (attempt {})", self.attempts),
            });
        }
        self.attempts = 0;
        Ok(())
    }
}

impl HardwareConnector for SimConnector {
    fn connect_motor(&mut self, role: MotorRole) -> Result<Box<dyn Motor>, HardwareError> {
        let (device, axis) = match role {
            MotorRole::Head => ("head motor", Axis::Head),
            MotorRole::LeftWheel => ("left motor", Axis::Left),
            MotorRole::RightWheel => ("right motor", Axis::Right),
        };
        self.attempt(device)?;
        Ok(Box::new(SimMotor {
            world: self.world.clone(),
            axis,
        }))
    }

    fn connect_range_sensor(&mut self) -> Result<Box<dyn RangeSensor>, HardwareError> {
        self.attempt("ultrasonic sensor")?;
        Ok(Box::new(SimSonar {
            world: self.world.clone(),
        }))
    }

    fn connect_gyroscope(&mut self) -> Result<Box<dyn Gyroscope>, HardwareError> {
        self.attempt("gyroscope")?;
        Ok(Box::new(SimGyro {
            world: self.world.clone(),
        }))
    }

    fn connect_touch_sensor(&mut self, side: Side) -> Result<Box<dyn TouchSensor>, HardwareError> {
        self.attempt("touch sensor")?;
        Ok(Box::new(SimTouch {
            world: self.world.clone(),
            side,
        }))
    }
}

// --- Output sinks ---

/// Logs tones instead of playing them.
pub struct LoggedTones;

impl ToneSink for LoggedTones {
    fn play_tone(&mut self, tone: Tone) {
        info!(
            "Beep {} Hz for {} ms at {}%",
            tone.frequency,
            tone.duration.as_millis(),
            tone.volume
        );
    }
}

/// Logs speech instead of saying it.
pub struct LoggedSpeech;

impl SpeechSink for LoggedSpeech {
    fn say(&mut self, text: &str) {
        info!("Robot says: {text}");
    }
}
