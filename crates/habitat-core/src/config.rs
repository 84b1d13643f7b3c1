//! Configuration types for the simulation.

use crate::error::{Error, Result};
use crate::types::{Season, Weather};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_DEPTH: i32 = 80;
pub const DEFAULT_WIDTH: i32 = 120;

/// Field dimensions and cell capacity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Number of rows
    pub depth: i32,
    /// Number of columns
    pub width: i32,
    /// Maximum number of organisms sharing one cell
    pub cell_capacity: usize,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            width: DEFAULT_WIDTH,
            cell_capacity: 1,
        }
    }
}

/// Time of day and season bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub hours_per_day: u32,
    /// Hours the clock advances each tick
    pub hours_per_tick: u32,
    pub days_per_season: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            hours_per_day: 24,
            hours_per_tick: 1,
            days_per_season: 30,
        }
    }
}

/// How one kind of weather changes a cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherEffect {
    /// Added to the sight radius of an animal standing in the cell
    pub sight_delta: i32,
    /// Multiplies the seeding probability of a plant in the cell
    pub seed_multiplier: f64,
    /// Plants in the cell do not seed at all
    pub blocks_seeding: bool,
}

impl WeatherEffect {
    pub const NEUTRAL: WeatherEffect = WeatherEffect {
        sight_delta: 0,
        seed_multiplier: 1.0,
        blocks_seeding: false,
    };
}

/// Weather regions and their effects
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Side length of a square weather region; 0 disables weather
    pub region_size: i32,
    /// Per-tick chance that a region's weather re-rolls
    pub change_probability: f64,
    /// Relative likelihood of each weather when rolling
    pub weights: BTreeMap<Weather, f64>,
    pub effects: BTreeMap<Weather, WeatherEffect>,
}

impl WeatherConfig {
    /// Effect of a cell's weather; cells without weather are neutral.
    pub fn effect(&self, weather: Option<Weather>) -> WeatherEffect {
        weather
            .and_then(|w| self.effects.get(&w).copied())
            .unwrap_or(WeatherEffect::NEUTRAL)
    }

    pub fn is_enabled(&self) -> bool {
        self.region_size > 0 && self.weights.values().any(|w| *w > 0.0)
    }

    /// No weather at all.
    pub fn disabled() -> Self {
        Self {
            region_size: 0,
            change_probability: 0.0,
            weights: BTreeMap::new(),
            effects: BTreeMap::new(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        let weights = BTreeMap::from([
            (Weather::Sunny, 0.4),
            (Weather::Rain, 0.25),
            (Weather::Fog, 0.15),
            (Weather::Drought, 0.1),
            (Weather::Snow, 0.1),
        ]);
        let effects = BTreeMap::from([
            (
                Weather::Sunny,
                WeatherEffect {
                    sight_delta: 0,
                    seed_multiplier: 1.3,
                    blocks_seeding: false,
                },
            ),
            (
                Weather::Rain,
                WeatherEffect {
                    sight_delta: -1,
                    seed_multiplier: 1.3,
                    blocks_seeding: false,
                },
            ),
            (
                Weather::Fog,
                WeatherEffect {
                    sight_delta: -2,
                    seed_multiplier: 1.0,
                    blocks_seeding: false,
                },
            ),
            (
                Weather::Drought,
                WeatherEffect {
                    sight_delta: 0,
                    seed_multiplier: 0.5,
                    blocks_seeding: false,
                },
            ),
            (
                Weather::Snow,
                WeatherEffect {
                    sight_delta: -1,
                    seed_multiplier: 0.0,
                    blocks_seeding: true,
                },
            ),
        ]);

        Self {
            region_size: 10,
            change_probability: 0.05,
            weights,
            effects,
        }
    }
}

/// Rules that are policy rather than species data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EcologyRules {
    /// Crowded plants die to a neighbour of another species with a higher survival rate
    pub plant_competition: bool,
    /// Competition kicks in when at most this many adjacent cells are free
    pub competition_threshold: usize,
    /// Plants only seed during daylight
    pub plants_need_daylight: bool,
    /// Seeding probability multiplier for spring, summer, autumn, winter
    pub season_seed_multiplier: [f64; 4],
}

impl EcologyRules {
    pub fn season_multiplier(&self, season: Season) -> f64 {
        self.season_seed_multiplier[season.index()]
    }
}

impl Default for EcologyRules {
    fn default() -> Self {
        Self {
            plant_competition: true,
            competition_threshold: 4,
            plants_need_daylight: true,
            season_seed_multiplier: [1.2, 1.0, 0.8, 0.3],
        }
    }
}

/// Top-level simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Tick budget for `Simulation::run`
    pub num_ticks: u64,
    /// Ticks between population log lines
    pub log_interval: u64,
    /// Shuffle the update order every tick instead of using creation order
    pub shuffle_order: bool,
    pub field: FieldConfig,
    pub clock: ClockConfig,
    pub weather: WeatherConfig,
    pub rules: EcologyRules,
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.clock.hours_per_day == 0 || self.clock.days_per_season == 0 {
            return Err(Error::Validation(
                "clock needs non-zero hours per day and days per season".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.weather.change_probability) {
            return Err(Error::Validation(format!(
                "weather change probability {} outside [0, 1]",
                self.weather.change_probability
            )));
        }
        if self.weather.weights.values().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::Validation("weather weights must be non-negative".to_string()));
        }
        if self.rules.season_seed_multiplier.iter().any(|m| *m < 0.0) {
            return Err(Error::Validation("season multipliers must be non-negative".to_string()));
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            num_ticks: 1_000,
            log_interval: 100,
            shuffle_order: false,
            field: FieldConfig::default(),
            clock: ClockConfig::default(),
            weather: WeatherConfig::default(),
            rules: EcologyRules::default(),
        }
    }
}

/// One species' chance of being spawned in each cell at seeding time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnRule {
    /// Species name as it appears in the species table
    pub species: String,
    pub probability: f64,
}

/// Initial population parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Rolled in order for every cell; the first success spawns
    pub spawn: Vec<SpawnRule>,
    /// Start organisms at a random age and energy instead of as newborns
    pub random_age: bool,
    /// Chance that a spawned animal of a disease-carrying species starts infected
    pub initial_infection_probability: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        let rule = |species: &str, probability: f64| SpawnRule {
            species: species.to_string(),
            probability,
        };
        Self {
            spawn: vec![
                rule("wolf", 0.005),
                rule("fox", 0.015),
                rule("deer", 0.03),
                rule("rabbit", 0.06),
                rule("berry_bush", 0.05),
                rule("grass", 0.2),
            ],
            random_age: true,
            initial_infection_probability: 0.02,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let config = SimConfig::default();
        assert_eq!(config.field.depth, DEFAULT_DEPTH);
        assert_eq!(config.field.width, DEFAULT_WIDTH);
        assert_eq!(config.clock.hours_per_day, 24);
        assert!(config.validate().is_ok());
        assert!(config.weather.is_enabled());
        assert!(!WeatherConfig::disabled().is_enabled());
    }

    #[test]
    fn test_weather_effect_lookup() {
        let weather = WeatherConfig::default();
        assert_eq!(weather.effect(None), WeatherEffect::NEUTRAL);
        assert!(weather.effect(Some(Weather::Snow)).blocks_seeding);
        assert_eq!(weather.effect(Some(Weather::Fog)).sight_delta, -2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = SimConfig::default();
        config.weather.change_probability = 2.0;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.clock.hours_per_day = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = SimConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: SimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.seed, config.seed);
        assert_eq!(restored.weather.weights.len(), 5);
        assert_eq!(
            restored.rules.season_seed_multiplier,
            config.rules.season_seed_multiplier
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{ "seed": 9, "field": { "depth": 12 }, "clock": { "hours_per_tick": 2 } }"#)
                .unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.field.depth, 12);
        assert_eq!(config.field.width, DEFAULT_WIDTH);
        assert_eq!(config.clock.hours_per_tick, 2);
        assert_eq!(config.clock.hours_per_day, 24);
        assert_eq!(config.num_ticks, SimConfig::default().num_ticks);
        assert_eq!(config.weather.effects.len(), 5);

        let population: PopulationConfig = serde_json::from_str(r#"{ "random_age": false }"#).unwrap();
        assert!(!population.random_age);
        assert_eq!(population.spawn.len(), 6);
    }
}
