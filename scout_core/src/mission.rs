// scout_core/src/mission.rs

//! Named mission handlers and the runner that executes them in order.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{error, info};

use crate::error::Result;
use crate::robot::Robot;

pub type MissionHandler = Box<dyn Fn(&mut Robot) -> Result<()> + Send + Sync>;

struct MissionEntry {
    description: String,
    handler: MissionHandler,
}

/// How a single requested mission ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed,
    Failed { reason: String, shutdown: bool },
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissionOutcome {
    pub name: String,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

/// Results of one runner invocation, in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissionReport {
    pub outcomes: Vec<MissionOutcome>,
}

impl MissionReport {
    pub fn succeeded(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.outcome == Outcome::Completed)
    }

    /// The mission that stopped the run, if any.
    pub fn failure(&self) -> Option<&MissionOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.outcome != Outcome::Completed)
    }
}

impl fmt::Display for MissionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for o in &self.outcomes {
            let status = match &o.outcome {
                Outcome::Completed => "completed".to_string(),
                Outcome::Failed { reason, .. } => format!("failed: {reason}"),
                Outcome::Unknown => "unknown mission".to_string(),
            };
            writeln!(f, "{:<14} {:>8} ms  {status}", o.name, o.elapsed.as_millis())?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MissionRegistry {
    missions: BTreeMap<String, MissionEntry>,
}

impl MissionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any earlier mission of that name.
    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        handler: impl Fn(&mut Robot) -> Result<()> + Send + Sync + 'static,
    ) -> &mut Self {
        self.missions.insert(
            name.to_string(),
            MissionEntry {
                description: description.to_string(),
                handler: Box::new(handler),
            },
        );
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.missions.contains_key(name)
    }

    /// `(name, description)` pairs in name order.
    pub fn list(&self) -> impl Iterator<Item = (&str, &str)> {
        self.missions
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.description.as_str()))
    }

    /// Runs the named missions in order, stopping at the first one that fails
    /// or is not registered. All motors are coasted before returning.
    pub fn run<S: AsRef<str>>(&self, robot: &mut Robot, names: &[S]) -> MissionReport {
        let mut report = MissionReport::default();
        for name in names.iter().map(AsRef::as_ref) {
            let started = robot.context().elapsed();
            let Some(entry) = self.missions.get(name) else {
                error!("Unknown mission: {name}");
                report.outcomes.push(MissionOutcome {
                    name: name.to_string(),
                    outcome: Outcome::Unknown,
                    elapsed: Duration::ZERO,
                });
                break;
            };

            info!("Starting {name}");
            let result = (entry.handler)(robot);
            let elapsed = robot.context().elapsed().saturating_sub(started);
            match result {
                Ok(()) => {
                    info!("Finished {name}");
                    report.outcomes.push(MissionOutcome {
                        name: name.to_string(),
                        outcome: Outcome::Completed,
                        elapsed,
                    });
                }
                Err(failure) => {
                    error!("Mission Failed! {failure}");
                    report.outcomes.push(MissionOutcome {
                        name: name.to_string(),
                        outcome: Outcome::Failed {
                            reason: failure.to_string(),
                            shutdown: failure.is_shutdown(),
                        },
                        elapsed,
                    });
                    break;
                }
            }
        }
        robot.stop_all_motors_with_coast();
        report
    }
}
