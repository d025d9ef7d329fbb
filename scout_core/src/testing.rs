// scout_core/src/testing.rs

//! Scripted in-memory devices for unit tests.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::RobotConfig;
use crate::context::RobotContext;
use crate::hardware::{Gyroscope, Hardware, Motor, RangeSensor, TouchSensor};
use crate::safety::Shutdown;

// --- Clock ---

#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn advance(&self, duration: Duration) {
        *self.now.lock() += duration;
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        *self.now.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

// --- Motor ---

#[derive(Debug, Default)]
pub struct MotorState {
    pub position: i32,
    pub speed: u32,
    pub moving: bool,
    pub commands: Vec<&'static str>,
}

/// Motor that reaches any `rotate_to` target instantly.
#[derive(Debug, Clone, Default)]
pub struct FakeMotor {
    state: Arc<Mutex<MotorState>>,
}

impl FakeMotor {
    pub fn count(&self, command: &str) -> usize {
        self.state
            .lock()
            .commands
            .iter()
            .filter(|c| **c == command)
            .count()
    }

    pub fn position(&self) -> i32 {
        self.state.lock().position
    }

    pub fn set_position(&self, position: i32) {
        self.state.lock().position = position;
    }

    pub fn set_moving(&self, moving: bool) {
        self.state.lock().moving = moving;
    }
}

impl Motor for FakeMotor {
    fn set_speed(&mut self, degrees_per_second: u32) {
        let mut state = self.state.lock();
        state.speed = degrees_per_second;
        state.commands.push("set_speed");
    }

    fn rotate_to(&mut self, position: i32) {
        let mut state = self.state.lock();
        state.position = position;
        state.moving = false;
        state.commands.push("rotate_to");
    }

    fn forward(&mut self) {
        let mut state = self.state.lock();
        state.moving = true;
        state.commands.push("forward");
    }

    fn position(&mut self) -> i32 {
        self.state.lock().position
    }

    fn is_moving(&mut self) -> bool {
        self.state.lock().moving
    }

    fn coast(&mut self) {
        let mut state = self.state.lock();
        state.moving = false;
        state.commands.push("coast");
    }

    fn brake(&mut self) {
        self.state.lock().commands.push("brake");
    }

    fn stop(&mut self) {
        let mut state = self.state.lock();
        state.moving = false;
        state.commands.push("stop");
    }
}

// --- Sensors ---

#[derive(Debug, Clone)]
pub struct FakeRange {
    value: Arc<Mutex<f32>>,
}

impl FakeRange {
    pub fn new(value: f32) -> Self {
        Self {
            value: Arc::new(Mutex::new(value)),
        }
    }

    pub fn set(&self, value: f32) {
        *self.value.lock() = value;
    }
}

impl RangeSensor for FakeRange {
    fn sample_distance(&mut self) -> f32 {
        *self.value.lock()
    }
}

/// Gyroscope replaying scripted readings, repeating the last one once exhausted.
#[derive(Debug, Clone, Default)]
pub struct FakeGyro {
    readings: Arc<Mutex<VecDeque<f32>>>,
    last: Arc<Mutex<f32>>,
    reinitialized: Arc<AtomicU32>,
}

impl FakeGyro {
    pub fn push_angles(&self, angles: &[f32]) {
        self.readings.lock().extend(angles.iter().copied());
    }

    pub fn reinitialize_count(&self) -> u32 {
        self.reinitialized.load(Ordering::SeqCst)
    }
}

impl Gyroscope for FakeGyro {
    fn reinitialize(&mut self) {
        self.reinitialized.fetch_add(1, Ordering::SeqCst);
    }

    fn sample_angle(&mut self) -> f32 {
        let mut last = self.last.lock();
        if let Some(next) = self.readings.lock().pop_front() {
            *last = next;
        }
        *last
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeTouch {
    pressed: Arc<AtomicBool>,
}

impl FakeTouch {
    pub fn press(&self) {
        self.pressed.store(true, Ordering::SeqCst);
    }
}

impl TouchSensor for FakeTouch {
    fn is_pressed(&mut self) -> bool {
        self.pressed.load(Ordering::SeqCst)
    }
}

// --- Assembled context ---

/// Test-side handles onto the devices inside a fake context.
pub struct FakeHandles {
    pub clock: Arc<ManualClock>,
    pub head: FakeMotor,
    pub left: FakeMotor,
    pub right: FakeMotor,
    pub sonar: FakeRange,
    pub gyro: FakeGyro,
    pub left_touch: FakeTouch,
    pub right_touch: FakeTouch,
}

pub fn fake_context() -> (RobotContext, FakeHandles) {
    fake_context_with(RobotConfig::default())
}

pub fn fake_context_with(config: RobotConfig) -> (RobotContext, FakeHandles) {
    let handles = FakeHandles {
        clock: Arc::new(ManualClock::default()),
        head: FakeMotor::default(),
        left: FakeMotor::default(),
        right: FakeMotor::default(),
        sonar: FakeRange::new(255.0),
        gyro: FakeGyro::default(),
        left_touch: FakeTouch::default(),
        right_touch: FakeTouch::default(),
    };
    let hardware = Hardware::new(
        Box::new(handles.head.clone()),
        Box::new(handles.left.clone()),
        Box::new(handles.right.clone()),
        Box::new(handles.sonar.clone()),
        Box::new(handles.gyro.clone()),
        Box::new(handles.left_touch.clone()),
        Box::new(handles.right_touch.clone()),
    );
    let context = RobotContext::new(
        hardware,
        handles.clock.clone(),
        Shutdown::new(),
        config,
    );
    (context, handles)
}
