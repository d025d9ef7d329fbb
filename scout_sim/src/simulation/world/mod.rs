// scout_sim/src/simulation/world/mod.rs

//! The simulated robot and its surroundings, advanced in virtual time.
//!
//! Nothing here runs on its own: time moves forward only when a driver call
//! is charged or the core sleeps on the simulation clock. A whole mission
//! therefore runs deterministically on the calling thread.

pub mod obstacles;

use nalgebra::Point2;
use parking_lot::Mutex;
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use scout_core::error::Side;
use scout_core::geometry::{normalize_degrees, Point};

use super::config::{FaultSection, NoiseSection, ScenarioConfig, SimulationSection, Wheel};
use super::prng::SimulationRng;
use obstacles::{bearing_vector, segments_from_world, Segment};

pub type SharedWorld = Arc<Mutex<World>>;

/// Rays cast across the ultrasonic beam.
const SONAR_RAYS: usize = 5;
/// Residual gyroscope offset left by an unsettled re-initialization.
const UNSETTLED_GYRO_OFFSET: f64 = 2.0;
/// Bumper coverage either side of the heading, and the overlap of the two halves.
const BUMPER_SPAN: f64 = 60.0;
const BUMPER_OVERLAP: f64 = 20.0;

/// The three motor axes of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Head,
    Left,
    Right,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::Head => 0,
            Axis::Left => 1,
            Axis::Right => 2,
        }
    }
}

/// Ground-truth position and compass heading (cumulative degrees, clockwise from +y).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl Pose {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drive {
    Idle,
    Forward,
    To(f64),
}

#[derive(Debug, Clone)]
struct AxisState {
    position: f64,
    speed: f64,
    drive: Drive,
    bias: f64,
    jammed: bool,
}

impl AxisState {
    fn new(bias: f64, jammed: bool) -> Self {
        Self {
            position: 0.0,
            speed: 0.0,
            drive: Drive::Idle,
            bias,
            jammed,
        }
    }

    fn is_moving(&self) -> bool {
        self.drive != Drive::Idle
    }

    /// Encoder change this axis wants over `dt` seconds.
    fn desired_delta(&self, dt: f64) -> f64 {
        if self.jammed {
            return 0.0;
        }
        let reach = self.speed * self.bias * dt;
        match self.drive {
            Drive::Idle => 0.0,
            Drive::Forward => reach,
            Drive::To(target) => (target - self.position).clamp(-reach, reach),
        }
    }

    fn apply(&mut self, delta: f64) {
        self.position += delta;
        if let Drive::To(target) = self.drive {
            if (target - self.position).abs() < 1e-9 {
                self.position = target;
                self.drive = Drive::Idle;
            }
        }
    }
}

pub struct World {
    time: Duration,
    settings: SimulationSection,
    noise: NoiseSection,
    faults: FaultSection,
    wheel_circumference: f64,
    eyes_to_midpoint: f64,
    pose: Pose,
    axes: [AxisState; 3],
    segments: Vec<Segment>,
    gyro_reference: f64,
    gyro_offset: f64,
    gyro_reset_at: Duration,
    gyro_reinits: u32,
    collisions: u32,
    rng: SimulationRng,
}

impl World {
    pub fn new(scenario: &ScenarioConfig) -> Self {
        let faults = scenario.faults.clone();
        let start = &scenario.world.start;
        let jammed = |wheel| faults.jammed_wheel == Some(wheel);
        Self {
            time: Duration::ZERO,
            settings: scenario.simulation.clone(),
            noise: scenario.noise.clone(),
            wheel_circumference: scenario.robot.body.wheel_diameter * PI,
            eyes_to_midpoint: scenario.robot.body.eyes_to_midpoint as f64,
            pose: Pose {
                x: start.x,
                y: start.y,
                heading: start.heading,
            },
            axes: [
                AxisState::new(1.0, false),
                AxisState::new(faults.left_speed_bias, jammed(Wheel::Left)),
                AxisState::new(faults.right_speed_bias, jammed(Wheel::Right)),
            ],
            segments: segments_from_world(&scenario.world),
            gyro_reference: start.heading,
            gyro_offset: 0.0,
            gyro_reset_at: Duration::ZERO,
            gyro_reinits: 0,
            collisions: 0,
            rng: SimulationRng::new(scenario.simulation.seed),
            faults,
        }
    }

    pub fn shared(self) -> SharedWorld {
        Arc::new(Mutex::new(self))
    }

    pub fn time(&self) -> Duration {
        self.time
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Ticks during which the chassis was blocked by an obstacle.
    pub fn collisions(&self) -> u32 {
        self.collisions
    }

    pub fn faults(&self) -> &FaultSection {
        &self.faults
    }

    // --- Time ---

    /// Advances the world by one driver call's latency.
    pub fn charge_call(&mut self) {
        self.advance(Duration::from_secs_f64(self.settings.call_latency_ms / 1000.0));
    }

    /// Integrates motion over `duration` in steps of at most `time_step_ms`.
    pub fn advance(&mut self, duration: Duration) {
        let step = Duration::from_secs_f64(self.settings.time_step_ms / 1000.0);
        let mut left = duration;
        while !left.is_zero() {
            let dt = left.min(step);
            self.step(dt.as_secs_f64());
            self.time += dt;
            left -= dt;
        }
    }

    fn step(&mut self, dt: f64) {
        let head = self.axes[Axis::Head.index()].desired_delta(dt);
        self.axes[Axis::Head.index()].apply(head);

        let left = self.axes[Axis::Left.index()].desired_delta(dt);
        let right = self.axes[Axis::Right.index()].desired_delta(dt);
        if left == 0.0 && right == 0.0 {
            return;
        }
        let left_cm = left / 360.0 * self.wheel_circumference;
        let right_cm = right / 360.0 * self.wheel_circumference;
        let forward = (left_cm + right_cm) / 2.0;
        let turn = ((left_cm - right_cm) / self.settings.track_width).to_degrees();
        let mid_heading = self.pose.heading + turn / 2.0;
        let moved = self.pose.point().moved(mid_heading, forward);

        if self.blocked(&self.pose.point(), &moved) {
            self.collisions += 1;
            return;
        }
        self.pose = Pose {
            x: moved.x,
            y: moved.y,
            heading: self.pose.heading + turn,
        };
        self.axes[Axis::Left.index()].apply(left);
        self.axes[Axis::Right.index()].apply(right);
    }

    /// The chassis may not move closer to any segment it is already touching.
    fn blocked(&self, from: &Point, to: &Point) -> bool {
        let from = from.as_nalgebra();
        let to = to.as_nalgebra();
        self.segments.iter().any(|s| {
            let after = s.distance_to(&to);
            after < self.settings.body_radius && after < s.distance_to(&from)
        })
    }

    // --- Motors ---

    pub fn set_speed(&mut self, axis: Axis, degrees_per_second: u32) {
        self.axes[axis.index()].speed = (degrees_per_second as f64).min(self.settings.motor_max_speed);
    }

    pub fn rotate_to(&mut self, axis: Axis, position: i32) {
        let state = &mut self.axes[axis.index()];
        let target = position as f64;
        state.drive = if (target - state.position).abs() < 1e-9 {
            Drive::Idle
        } else {
            Drive::To(target)
        };
    }

    pub fn forward(&mut self, axis: Axis) {
        self.axes[axis.index()].drive = Drive::Forward;
    }

    /// Cuts drive to the axis. Coast, brake and stop all halt it at once.
    pub fn halt(&mut self, axis: Axis) {
        self.axes[axis.index()].drive = Drive::Idle;
    }

    pub fn position(&self, axis: Axis) -> i32 {
        self.axes[axis.index()].position.round() as i32
    }

    pub fn is_moving(&self, axis: Axis) -> bool {
        self.axes[axis.index()].is_moving()
    }

    // --- Sensors ---

    pub fn reinitialize_gyro(&mut self) {
        self.gyro_reinits += 1;
        self.gyro_reference = self.pose.heading;
        self.gyro_reset_at = self.time;
        self.gyro_offset = if self.gyro_reinits <= self.faults.unsettled_gyro_reinits {
            UNSETTLED_GYRO_OFFSET
        } else {
            0.0
        };
        debug!("........ sim gyroscope re-initialized (offset: {:.1})", self.gyro_offset);
    }

    /// Heading relative to the last re-initialization, with drift and noise.
    pub fn gyro_angle(&mut self) -> f32 {
        let since_reset = self.time.saturating_sub(self.gyro_reset_at).as_secs_f64();
        let drift = self.noise.gyro_drift_per_second * since_reset;
        let noise = self.rng.gaussian(self.noise.gyro_stddev);
        (self.pose.heading - self.gyro_reference + self.gyro_offset + drift + noise) as f32
    }

    /// Nearest echo across the sonar beam, from the sensor at the front of the robot.
    pub fn sonar_distance(&mut self) -> f32 {
        let no_echo = self.settings.sonar_no_echo;
        if self.faults.sonar_blind {
            return no_echo;
        }
        let eyes = self
            .pose
            .point()
            .moved(self.pose.heading, self.eyes_to_midpoint)
            .as_nalgebra();
        let head = self.axes[Axis::Head.index()].position;
        let centre = self.pose.heading + head;
        let width = self.settings.sonar_beam_width;
        let nearest = (0..SONAR_RAYS)
            .map(|i| centre - width / 2.0 + width * i as f64 / (SONAR_RAYS - 1) as f64)
            .filter_map(|bearing| self.nearest_hit(&eyes, bearing))
            .fold(f64::INFINITY, f64::min);
        if nearest > self.settings.sonar_max_range {
            return no_echo;
        }
        let noise = self.rng.gaussian(self.noise.sonar_stddev);
        (nearest + noise).max(0.0) as f32
    }

    fn nearest_hit(&self, origin: &Point2<f64>, bearing: f64) -> Option<f64> {
        let direction = bearing_vector(bearing);
        self.segments
            .iter()
            .filter_map(|s| s.ray_hit(origin, &direction))
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Whether the front bumper on `side` is pushed in.
    ///
    /// A contact dead ahead presses both sides; contacts at the flanks or the
    /// rear press neither.
    pub fn touch_pressed(&self, side: Side) -> bool {
        let reach = self.settings.body_radius + self.settings.bumper_travel;
        let centre = self.pose.point().as_nalgebra();
        self.segments.iter().any(|s| {
            if s.distance_to(&centre) > reach {
                return false;
            }
            let contact = Point::from(s.closest_point(&centre));
            let relative = normalize_degrees(self.pose.point().bearing_to(&contact) - self.pose.heading);
            match side {
                Side::Left => (-BUMPER_SPAN..=BUMPER_OVERLAP).contains(&relative),
                Side::Right => (-BUMPER_OVERLAP..=BUMPER_SPAN).contains(&relative),
            }
        })
    }
}
