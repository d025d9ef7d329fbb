// scout_core/src/robot.rs

//! The action/query surface mission code drives the robot through.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::context::RobotContext;
use crate::control::{calibrate_gyroscope, calibrate_motors, MotionController, Movement};
use crate::error::{self, Result};
use crate::geometry::Point;
use crate::mapping::DiscoveryMap;
use crate::perception::{self, ProximityMap};
use crate::services::{SoundWorker, SpeechWorker};

pub struct Robot {
    context: Arc<RobotContext>,
    motion: MotionController,
    proximity_map: ProximityMap,
    discovery_map: DiscoveryMap,
    discovery_mode: bool,
    sound: Option<SoundWorker>,
    speech: Option<SpeechWorker>,
}

impl Robot {
    pub fn new(context: Arc<RobotContext>) -> Result<Self> {
        let config = context.config();
        let angle = config.head.look_around_angle;
        let discovery_map = DiscoveryMap::from_config(&config.mapping)?;
        Ok(Self {
            motion: MotionController::new(Arc::clone(&context)),
            proximity_map: ProximityMap::new(-angle, angle),
            discovery_map,
            discovery_mode: false,
            sound: None,
            speech: None,
            context,
        })
    }

    pub fn with_sound(mut self, sound: SoundWorker) -> Self {
        self.sound = Some(sound);
        self
    }

    pub fn with_speech(mut self, speech: SpeechWorker) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn context(&self) -> &Arc<RobotContext> {
        &self.context
    }

    // --- Calibration ---

    /// Calibrates the gyroscope, then measures the wheel steps for a full turn.
    pub fn calibrate(&mut self) -> Result<()> {
        self.calibrate_gyroscope()?;
        self.calibrate_motors()?;
        Ok(())
    }

    pub fn calibrate_gyroscope(&mut self) -> Result<()> {
        calibrate_gyroscope(&self.context)
    }

    pub fn calibrate_motors(&mut self) -> Result<i32> {
        let steps = calibrate_motors(
            &self.context,
            &mut self.proximity_map,
            self.discovery_mode,
        )?;
        self.motion.set_steps_per_360(steps);
        Ok(steps)
    }

    pub fn steps_per_360(&self) -> Option<i32> {
        self.motion.steps_per_360()
    }

    // --- Sensing ---

    pub fn look_around(&mut self, angle: i32, pass: u32) -> Result<()> {
        perception::look_around(
            &self.context,
            &mut self.proximity_map,
            angle,
            pass,
            self.discovery_mode,
        )
    }

    /// Looks around with the configured default sweep angle.
    pub fn look_around_default(&mut self, pass: u32) -> Result<()> {
        let angle = self.context.config().head.look_around_angle;
        self.look_around(angle, pass)
    }

    pub fn gyro_angle(&self) -> Result<i32> {
        self.context.gyro_angle()
    }

    pub fn head_distance(&self) -> Option<f32> {
        self.context.head_distance()
    }

    pub fn proximity_map(&self) -> &ProximityMap {
        &self.proximity_map
    }

    pub fn proximity_map_mut(&mut self) -> &mut ProximityMap {
        &mut self.proximity_map
    }

    pub fn discovery_map(&self) -> &DiscoveryMap {
        &self.discovery_map
    }

    pub fn discovery_map_mut(&mut self) -> &mut DiscoveryMap {
        &mut self.discovery_map
    }

    /// Projects the live proximity map into the discovery grid.
    ///
    /// # Arguments
    /// * `heading_offset`: Gyro bearing the proximity map's zero angle pointed at.
    pub fn add_obstacles(&mut self, heading_offset: f64) {
        self.discovery_map
            .add_obstacles(&self.proximity_map, heading_offset);
    }

    pub fn discovery_mode(&self) -> bool {
        self.discovery_mode
    }

    /// Discovery mode shifts range samples from the sensor to the robot midpoint.
    pub fn set_discovery_mode(&mut self, enabled: bool) {
        debug!("Discovery mode {}", if enabled { "on" } else { "off" });
        self.discovery_mode = enabled;
    }

    // --- Motion ---

    pub fn turn_degrees(&mut self, angle: i32) -> Result<()> {
        self.motion.turn_degrees(angle)
    }

    pub fn turn_to_bearing(&mut self, bearing: f64) -> Result<()> {
        self.motion.turn_to_bearing(bearing)
    }

    pub fn move_forward(&mut self, distance: f32) -> Result<f32> {
        self.motion.move_forward(distance)
    }

    pub fn move_forward_tracked(&mut self, distance: f32, from: Point) -> Result<Movement> {
        self.motion.move_forward_tracked(distance, from)
    }

    pub fn step_forward(&mut self, distance: f32) -> Result<f32> {
        self.motion.step_forward(distance)
    }

    pub fn step_backward(&mut self, distance: f32) -> Result<f32> {
        self.motion.step_backward(distance)
    }

    pub fn stop_all_motors_with_coast(&self) {
        self.context.stop_all_motors_with_coast();
    }

    /// Aborts the running mission with `reason`.
    pub fn fail<T>(&self, reason: impl Into<String>) -> Result<T> {
        error::fail(reason)
    }

    // --- Output ---

    pub fn say(&self, text: &str) {
        match &self.speech {
            Some(speech) => speech.say(text),
            None => info!("Saying: {text}"),
        }
    }

    pub fn play_tone(&self, frequency: u32, duration: Duration, volume: u8) {
        match &self.sound {
            Some(sound) => sound.play_tone(frequency, duration, volume),
            None => debug!("Playing tone {frequency} Hz for {} ms", duration.as_millis()),
        }
    }

    /// Blocks until queued speech and sound have been played.
    pub fn flush_output(&self) {
        if let Some(speech) = &self.speech {
            speech.flush();
        }
        if let Some(sound) = &self.sound {
            sound.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MissionFailure;
    use crate::testing::fake_context;

    fn robot() -> (Robot, crate::testing::FakeHandles) {
        let (context, handles) = fake_context();
        (Robot::new(Arc::new(context)).unwrap(), handles)
    }

    #[test]
    fn starts_with_default_look_around_window() {
        let (robot, _) = robot();
        assert_eq!(robot.proximity_map().min_angle(), -120);
        assert_eq!(robot.proximity_map().max_angle(), 120);
        assert_eq!(robot.discovery_map().grid_size(), 100);
        assert!(!robot.discovery_mode());
        assert_eq!(robot.steps_per_360(), None);
    }

    #[test]
    fn calibrate_stores_steps_and_full_circle_view() {
        let (mut robot, handles) = robot();
        handles.sonar.set(80.0);
        // Accepted reference, start angle, then the gyro after 500 steps.
        handles.gyro.push_angles(&[0.0, 0.0, 240.0]);
        robot.calibrate().unwrap();
        assert_eq!(robot.steps_per_360(), Some(750));
        assert_eq!(robot.proximity_map().min_angle(), -180);
        assert_eq!(robot.proximity_map().get(-120), Some(80.0));
    }

    #[test]
    fn fail_carries_reason() {
        let (robot, _) = robot();
        let err = robot.fail::<()>("Lost my way").unwrap_err();
        assert!(matches!(&err, MissionFailure::Reason(reason) if reason == "Lost my way"));
        assert_eq!(err.to_string(), "Lost my way");
    }
}
