// scout_core/src/prelude.rs

// --- Core Abstractions (driver contracts) ---
pub use crate::clock::{Clock, SystemClock};
pub use crate::hardware::{
    Gyroscope, HardwareConnector, Motor, MotorRole, RangeSensor, TouchSensor,
};
pub use crate::services::{SpeechSink, ToneSink, Tone};

// --- Session and configuration ---
pub use crate::config::RobotConfig;
pub use crate::context::RobotContext;
pub use crate::error::{fail, HardwareError, MapError, MissionFailure, Result, Side};
pub use crate::safety::{Shutdown, StopGuard, Timeout};

// --- Core Data Structures ---
pub use crate::geometry::Point;
pub use crate::mapping::{Cell, CellId, DiscoveryMap};
pub use crate::perception::ProximityMap;

// --- Mission surface ---
pub use crate::control::Movement;
pub use crate::mission::{MissionRegistry, MissionReport, Outcome};
pub use crate::robot::Robot;
pub use crate::services::{SoundWorker, SpeechWorker};
