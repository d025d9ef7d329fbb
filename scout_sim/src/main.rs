// scout_sim/src/main.rs

//! Runs missions against a simulated robot.
//!
//! `cargo run -p scout_sim -- --scenario assets/scenarios/cluttered_room.toml discovery`

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use scout_core::safety::{Shutdown, StopGuard};
use scout_sim::prelude::*;

/// A good filter for focusing on our crates' logs during development.
const DEFAULT_LOG_FILTER: &str = "info,scout_core=debug,scout_sim=debug";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let limits = match cli.passes {
        Some(passes) => MissionLimits {
            discovery_passes: passes,
            avoidance_passes: passes,
        },
        None => MissionLimits::default(),
    };
    let registry = registry(limits);
    if cli.list_missions {
        for (name, description) in registry.list() {
            println!("{name:<12} {description}");
        }
        return ExitCode::SUCCESS;
    }

    // --- 1. Load Scenario ---
    info!("Loading scenario from: {}", cli.scenario.display());
    let mut scenario = match ScenarioConfig::load(&cli.scenario) {
        Ok(scenario) => scenario,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(seed) = cli.seed {
        scenario.simulation.seed = Some(seed);
    }

    // --- 2. Cooperative shutdown on Ctrl-C and SIGTERM ---
    let shutdown = Shutdown::new();
    let handler = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || handler.request()) {
        warn!("Could not install the termination handler: {e}");
    }

    // --- 3. Connect the robot ---
    let simulation = match Simulation::new(&scenario, shutdown) {
        Ok(simulation) => simulation,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    // Motors are de-energized however the run ends.
    let _stop = StopGuard::new(Arc::clone(simulation.context()));
    let mut robot = match simulation.robot_with_output() {
        Ok(robot) => robot,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // --- 4. Run the missions ---
    let missions = if !cli.missions.is_empty() {
        cli.missions.clone()
    } else if !scenario.missions.is_empty() {
        scenario.missions.clone()
    } else {
        vec!["discovery".to_string()]
    };
    let report = registry.run(&mut robot, &missions);
    robot.flush_output();

    let pose = simulation.pose();
    let elapsed = simulation.world().lock().time();
    info!(
        "Final pose: {} heading {:.0} degrees after {:.1} s of simulated time",
        pose.point(),
        pose.heading,
        elapsed.as_secs_f64()
    );
    print!("{report}");
    if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
