//! Headless runner: loads a run configuration, simulates and prints the summary.

mod telemetry;

use anyhow::{Context, Result};
use habitat_core::{PopulationConfig, SimConfig, SpeciesTable};
use habitat_world::Simulation;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Everything a run needs, as read from a JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RunnerConfig {
    sim: SimConfig,
    population: PopulationConfig,
    /// Built-in table when absent
    species: Option<SpeciesTable>,
}

impl RunnerConfig {
    fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}

fn main() -> Result<()> {
    telemetry::init_logging()?;

    let config = match std::env::args().nth(1) {
        Some(path) => RunnerConfig::load(Path::new(&path))?,
        None => {
            info!("No config given, using defaults");
            RunnerConfig::default()
        }
    };

    let species = Arc::new(config.species.unwrap_or_default());
    info!(
        species = species.len(),
        seed = config.sim.seed,
        depth = config.sim.field.depth,
        width = config.sim.field.width,
        "Starting habitat runner"
    );

    let mut simulation = Simulation::new(config.sim, species)?;
    simulation.reset(&config.population)?;
    let summary = simulation.run();

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: RunnerConfig =
            serde_json::from_str(r#"{ "sim": { "seed": 3, "field": { "depth": 8 } } }"#).unwrap();
        let defaults = SimConfig::default();
        assert_eq!(config.sim.seed, 3);
        assert_eq!(config.sim.field.depth, 8);
        assert_eq!(config.sim.field.width, defaults.field.width);
        assert_eq!(config.sim.num_ticks, defaults.num_ticks);
        assert_eq!(config.sim.clock.hours_per_day, defaults.clock.hours_per_day);
        assert_eq!(config.sim.weather.effects.len(), defaults.weather.effects.len());
        assert!(config.species.is_none());
        assert_eq!(config.population.spawn.len(), PopulationConfig::default().spawn.len());
    }

    #[test]
    fn test_default_config_runs() {
        let mut config = RunnerConfig::default();
        config.sim.num_ticks = 5;
        config.sim.field.depth = 10;
        config.sim.field.width = 10;

        let mut simulation =
            Simulation::new(config.sim, Arc::new(config.species.unwrap_or_default())).unwrap();
        simulation.reset(&config.population).unwrap();
        let summary = simulation.run();
        assert!(summary.ticks_run <= 5);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("final_population"));
    }
}
