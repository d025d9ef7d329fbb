// scout_sim/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// Scout: a headless simulator for the two-wheeled exploration robot.
///
/// This struct defines the command-line arguments of the `scout_sim` binary.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/empty_room.toml")]
    pub scenario: PathBuf,

    /// Seed for the simulation noise, overriding the scenario's seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log filter, e.g. `info` or `scout_core=debug`. Falls back to `RUST_LOG`.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Upper bound on discovery and avoidance passes.
    #[arg(long)]
    pub passes: Option<u32>,

    /// Print the available missions and exit.
    #[arg(long, default_value_t = false)]
    pub list_missions: bool,

    /// Missions to run in order. Defaults to the scenario's list, else `discovery`.
    pub missions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_bundled_scenario() {
        let cli = Cli::parse_from(["scout_sim"]);
        assert_eq!(cli.scenario, PathBuf::from("assets/scenarios/empty_room.toml"));
        assert!(cli.missions.is_empty());
        assert!(!cli.list_missions);
    }

    #[test]
    fn missions_and_overrides_parse() {
        let cli = Cli::parse_from([
            "scout_sim",
            "--seed",
            "7",
            "--passes",
            "3",
            "-s",
            "walls.toml",
            "calibrate",
            "avoidance",
        ]);
        assert_eq!(cli.seed, Some(7));
        assert_eq!(cli.passes, Some(3));
        assert_eq!(cli.scenario, PathBuf::from("walls.toml"));
        assert_eq!(cli.missions, vec!["calibrate", "avoidance"]);
    }
}
