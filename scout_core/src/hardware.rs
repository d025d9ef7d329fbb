// scout_core/src/hardware.rs

//! Capability traits implemented by device drivers, and the guarded device set
//! the core talks to.
//!
//! Each physical resource sits behind its own `parking_lot::Mutex`, so a
//! read/write pair on one device can never interleave with another caller.

use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::ConnectConfig;
use crate::error::{HardwareError, MissionFailure, Result, Side};

// =========================================================================
// == Driver Capability Traits ==
// =========================================================================

/// A regulated motor axis with an absolute position encoder (degrees).
///
/// All motion commands return immediately; callers poll `is_moving`.
pub trait Motor: Send {
    /// Sets the regulated speed in degrees per second for later commands.
    fn set_speed(&mut self, degrees_per_second: u32);

    /// Starts rotating towards an absolute encoder position.
    fn rotate_to(&mut self, position: i32);

    /// Starts rotating forward indefinitely at the current speed.
    fn forward(&mut self);

    fn position(&mut self) -> i32;

    fn is_moving(&mut self) -> bool;

    /// Removes power and lets the axis spin freely.
    fn coast(&mut self);

    /// Shorts the windings so the axis resists motion without holding position.
    fn brake(&mut self);

    /// Actively stops the axis.
    fn stop(&mut self);
}

/// Ultrasonic rangefinder. Returns the raw reading in centimetres; drivers
/// report "no echo" as a value above the trusted range or as a non-finite number.
pub trait RangeSensor: Send {
    fn sample_distance(&mut self) -> f32;
}

/// Rate/angle gyroscope reporting a cumulative, clockwise-positive heading.
pub trait Gyroscope: Send {
    /// Drops the current angle reference and restarts the sensor's integration.
    fn reinitialize(&mut self);

    fn sample_angle(&mut self) -> f32;
}

pub trait TouchSensor: Send {
    fn is_pressed(&mut self) -> bool;
}

/// The motor axes of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorRole {
    Head,
    LeftWheel,
    RightWheel,
}

impl fmt::Display for MotorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorRole::Head => write!(f, "head motor"),
            MotorRole::LeftWheel => write!(f, "left motor"),
            MotorRole::RightWheel => write!(f, "right motor"),
        }
    }
}

/// Opens device drivers. Implemented by the platform layer (or the simulator).
pub trait HardwareConnector {
    fn connect_motor(&mut self, role: MotorRole) -> std::result::Result<Box<dyn Motor>, HardwareError>;
    fn connect_range_sensor(&mut self) -> std::result::Result<Box<dyn RangeSensor>, HardwareError>;
    fn connect_gyroscope(&mut self) -> std::result::Result<Box<dyn Gyroscope>, HardwareError>;
    fn connect_touch_sensor(
        &mut self,
        side: Side,
    ) -> std::result::Result<Box<dyn TouchSensor>, HardwareError>;
}

// =========================================================================
// == Guarded Device Regions ==
// =========================================================================

/// The two drive wheels. Always locked together so differential commands are issued as a pair.
pub struct Base {
    pub left: Box<dyn Motor>,
    pub right: Box<dyn Motor>,
}

impl Base {
    pub fn positions(&mut self) -> (i32, i32) {
        (self.left.position(), self.right.position())
    }

    pub fn is_moving(&mut self) -> bool {
        self.left.is_moving() || self.right.is_moving()
    }

    pub fn set_speed(&mut self, degrees_per_second: u32) {
        self.left.set_speed(degrees_per_second);
        self.right.set_speed(degrees_per_second);
    }

    /// Turns the wheels by `steps` in opposite directions; positive spins clockwise.
    pub fn rotate_in_place(&mut self, steps: i32) {
        let (left, right) = self.positions();
        self.left.rotate_to(left + steps);
        self.right.rotate_to(right - steps);
    }

    /// Moves both wheels by the same number of steps; negative drives backwards.
    pub fn rotate_by(&mut self, steps: i32) {
        let (left, right) = self.positions();
        self.left.rotate_to(left + steps);
        self.right.rotate_to(right + steps);
    }

    pub fn coast(&mut self) {
        self.left.coast();
        self.right.coast();
    }

    pub fn brake(&mut self) {
        self.left.brake();
        self.right.brake();
    }

    pub fn stop(&mut self) {
        self.left.stop();
        self.right.stop();
    }
}

/// The gyroscope plus whether its angle reference has been accepted.
pub struct GyroSlot {
    pub sensor: Box<dyn Gyroscope>,
    pub calibrated: bool,
}

pub struct TouchPair {
    pub left: Box<dyn TouchSensor>,
    pub right: Box<dyn TouchSensor>,
}

impl TouchPair {
    pub fn is_pressed(&mut self, side: Side) -> bool {
        match side {
            Side::Left => self.left.is_pressed(),
            Side::Right => self.right.is_pressed(),
        }
    }
}

/// Every device of the robot, one mutual-exclusion region per resource.
pub struct Hardware {
    base: Mutex<Base>,
    head: Mutex<Box<dyn Motor>>,
    gyro: Mutex<GyroSlot>,
    sonar: Mutex<Box<dyn RangeSensor>>,
    touch: Mutex<TouchPair>,
}

impl Hardware {
    pub fn new(
        head: Box<dyn Motor>,
        left: Box<dyn Motor>,
        right: Box<dyn Motor>,
        sonar: Box<dyn RangeSensor>,
        gyro: Box<dyn Gyroscope>,
        left_touch: Box<dyn TouchSensor>,
        right_touch: Box<dyn TouchSensor>,
    ) -> Self {
        Self {
            base: Mutex::new(Base { left, right }),
            head: Mutex::new(head),
            gyro: Mutex::new(GyroSlot {
                sensor: gyro,
                calibrated: false,
            }),
            sonar: Mutex::new(sonar),
            touch: Mutex::new(TouchPair {
                left: left_touch,
                right: right_touch,
            }),
        }
    }

    /// Opens every device through `connector`, retrying transient failures with
    /// exponential backoff (base delay doubling per attempt).
    pub fn connect(
        connector: &mut dyn HardwareConnector,
        config: &ConnectConfig,
        clock: &dyn Clock,
    ) -> Result<Self> {
        debug!("Starting connectMotors");
        let head = with_retries("head motor", config, clock, || {
            connector.connect_motor(MotorRole::Head)
        })?;
        let left = with_retries("left motor", config, clock, || {
            connector.connect_motor(MotorRole::LeftWheel)
        })?;
        let right = with_retries("right motor", config, clock, || {
            connector.connect_motor(MotorRole::RightWheel)
        })?;
        debug!("Finished connectMotors");

        debug!("Starting connectSensors");
        let gyro = with_retries("gyroscope", config, clock, || connector.connect_gyroscope())?;
        let sonar = with_retries("ultrasonic sensor", config, clock, || {
            connector.connect_range_sensor()
        })?;
        let left_touch = with_retries("left touch sensor", config, clock, || {
            connector.connect_touch_sensor(Side::Left)
        })?;
        let right_touch = with_retries("right touch sensor", config, clock, || {
            connector.connect_touch_sensor(Side::Right)
        })?;
        debug!("Finished connectSensors");

        Ok(Self::new(
            head,
            left,
            right,
            sonar,
            gyro,
            left_touch,
            right_touch,
        ))
    }

    pub fn base(&self) -> MutexGuard<'_, Base> {
        self.base.lock()
    }

    pub fn head(&self) -> MutexGuard<'_, Box<dyn Motor>> {
        self.head.lock()
    }

    pub fn gyro(&self) -> MutexGuard<'_, GyroSlot> {
        self.gyro.lock()
    }

    pub fn sonar(&self) -> MutexGuard<'_, Box<dyn RangeSensor>> {
        self.sonar.lock()
    }

    pub fn touch(&self) -> MutexGuard<'_, TouchPair> {
        self.touch.lock()
    }

    /// Coasts every motor, head included.
    pub fn stop_all_motors_with_coast(&self) {
        {
            let mut head = self.head();
            head.coast();
        }
        self.base().coast();
    }
}

fn with_retries<T>(
    device: &'static str,
    config: &ConnectConfig,
    clock: &dyn Clock,
    mut attempt: impl FnMut() -> std::result::Result<T, HardwareError>,
) -> Result<T> {
    let mut delay = Duration::from_millis(config.retry_delay_ms);
    let mut attempts = 0;
    loop {
        attempts += 1;
        match attempt() {
            Ok(device) => return Ok(device),
            Err(error) if attempts >= config.max_attempts.max(1) => {
                return Err(MissionFailure::Hardware(HardwareError::RetriesExhausted {
                    device,
                    attempts,
                    last: error.to_string(),
                }));
            }
            Err(error) => {
                info!("{error}");
                info!("Connecting {device} retrying in {} ms...", delay.as_millis());
                clock.sleep(delay);
                delay *= 2;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeGyro, FakeMotor, FakeRange, FakeTouch, ManualClock};

    struct FlakyConnector {
        failures_left: u32,
    }

    impl HardwareConnector for FlakyConnector {
        fn connect_motor(
            &mut self,
            role: MotorRole,
        ) -> std::result::Result<Box<dyn Motor>, HardwareError> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(HardwareError::Unresponsive {
                    device: "motor",
                    reason: format!("{role} busy"),
                });
            }
            Ok(Box::new(FakeMotor::default()))
        }

        fn connect_range_sensor(
            &mut self,
        ) -> std::result::Result<Box<dyn RangeSensor>, HardwareError> {
            Ok(Box::new(FakeRange::new(100.0)))
        }

        fn connect_gyroscope(&mut self) -> std::result::Result<Box<dyn Gyroscope>, HardwareError> {
            Ok(Box::new(FakeGyro::default()))
        }

        fn connect_touch_sensor(
            &mut self,
            _side: Side,
        ) -> std::result::Result<Box<dyn TouchSensor>, HardwareError> {
            Ok(Box::new(FakeTouch::default()))
        }
    }

    #[test]
    fn connect_backs_off_exponentially() {
        let clock = ManualClock::default();
        let mut connector = FlakyConnector { failures_left: 3 };
        let config = ConnectConfig::default();
        let hardware = Hardware::connect(&mut connector, &config, &clock);
        assert!(hardware.is_ok());
        // 20 + 40 + 80 ms of backoff before the head motor came up.
        assert_eq!(clock.elapsed(), Duration::from_millis(140));
    }

    #[test]
    fn connect_gives_up_after_attempt_limit() {
        let clock = ManualClock::default();
        let mut connector = FlakyConnector { failures_left: 100 };
        let config = ConnectConfig {
            retry_delay_ms: 1,
            max_attempts: 4,
        };
        let err = Hardware::connect(&mut connector, &config, &clock)
            .err()
            .unwrap();
        match err {
            MissionFailure::Hardware(HardwareError::RetriesExhausted { attempts, .. }) => {
                assert_eq!(attempts, 4)
            }
            other => panic!("unexpected failure: {other}"),
        }
    }
}
