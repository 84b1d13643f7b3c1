//! Global clock and regional weather.

use crate::field::Field;
use habitat_core::{ClockConfig, Location, Season, Weather, WeatherConfig};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Time of day, day counter and season
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    hour: u32,
    day: u32,
    config: ClockConfig,
}

impl Clock {
    pub fn new(config: ClockConfig) -> Self {
        Self {
            hour: 0,
            day: 0,
            config,
        }
    }

    /// Move forward one tick, wrapping the hour into the next day.
    pub fn advance(&mut self) {
        self.hour += self.config.hours_per_tick;
        while self.hour >= self.config.hours_per_day {
            self.hour -= self.config.hours_per_day;
            self.day += 1;
        }
    }

    pub fn reset(&mut self) {
        self.hour = 0;
        self.day = 0;
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// Quarter of the day, 0 (from midnight) to 3
    pub fn quadrant(&self) -> u32 {
        (self.hour * 4 / self.config.hours_per_day).min(3)
    }

    /// First and last quarter of the day are night
    pub fn is_night(&self) -> bool {
        matches!(self.quadrant(), 0 | 3)
    }

    pub fn season(&self) -> Season {
        Season::from_index(self.day / self.config.days_per_season)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}

/// Top-left corners of every weather region
fn region_origins(field: &Field, size: i32) -> Vec<Location> {
    let mut origins = Vec::new();
    let mut row = 0;
    while row < field.depth() {
        let mut col = 0;
        while col < field.width() {
            origins.push(Location::new(row, col));
            col += size;
        }
        row += size;
    }
    origins
}

fn paint_region(field: &mut Field, origin: Location, size: i32, weather: Option<Weather>) {
    for row in origin.row..(origin.row + size).min(field.depth()) {
        for col in origin.col..(origin.col + size).min(field.width()) {
            field.set_weather(Location::new(row, col), weather);
        }
    }
}

fn weighted_picker(config: &WeatherConfig) -> Option<(Vec<Weather>, WeightedIndex<f64>)> {
    if !config.is_enabled() {
        return None;
    }
    let (kinds, weights): (Vec<Weather>, Vec<f64>) =
        config.weights.iter().map(|(w, p)| (*w, *p)).unzip();
    let index = WeightedIndex::new(weights).ok()?;
    Some((kinds, index))
}

/// Give every region an initial weather. Clears weather when disabled.
pub fn seed_weather(field: &mut Field, config: &WeatherConfig, rng: &mut ChaCha8Rng) {
    let Some((kinds, picker)) = weighted_picker(config) else {
        field.clear_weather();
        return;
    };

    for origin in region_origins(field, config.region_size) {
        let weather = kinds[picker.sample(rng)];
        paint_region(field, origin, config.region_size, Some(weather));
    }
}

/// Re-roll each region with the configured probability.
///
/// Returns how many regions changed weather.
pub fn update_weather(field: &mut Field, config: &WeatherConfig, rng: &mut ChaCha8Rng) -> usize {
    let Some((kinds, picker)) = weighted_picker(config) else {
        return 0;
    };

    let mut changed = 0;
    for origin in region_origins(field, config.region_size) {
        if !rng.gen_bool(config.change_probability) {
            continue;
        }
        let weather = kinds[picker.sample(rng)];
        if field.weather_at(origin) != Some(weather) {
            changed += 1;
        }
        paint_region(field, origin, config.region_size, Some(weather));
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    #[test]
    fn test_clock_wraps() {
        let mut clock = Clock::new(ClockConfig {
            hours_per_day: 24,
            hours_per_tick: 6,
            days_per_season: 1,
        });
        assert_eq!(clock.quadrant(), 0);
        assert!(clock.is_night());

        clock.advance();
        assert_eq!(clock.hour(), 6);
        assert_eq!(clock.quadrant(), 1);
        assert!(!clock.is_night());

        clock.advance();
        clock.advance();
        assert_eq!(clock.quadrant(), 3);
        assert!(clock.is_night());

        clock.advance();
        assert_eq!(clock.hour(), 0);
        assert_eq!(clock.day(), 1);
        assert_eq!(clock.season(), Season::Summer);
    }

    #[test]
    fn test_seed_weather_covers_field() {
        let mut field = Field::new(7, 9, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let config = WeatherConfig {
            region_size: 4,
            ..Default::default()
        };
        seed_weather(&mut field, &config, &mut rng);
        assert!(field.iter().all(|(_, cell)| cell.weather().is_some()));

        // cells in the same region share weather
        assert_eq!(
            field.weather_at(Location::new(0, 0)),
            field.weather_at(Location::new(3, 3))
        );
    }

    #[test]
    fn test_single_weather_kind() {
        let mut field = Field::new(5, 5, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let config = WeatherConfig {
            region_size: 2,
            change_probability: 1.0,
            weights: BTreeMap::from([(Weather::Fog, 1.0)]),
            ..Default::default()
        };
        seed_weather(&mut field, &config, &mut rng);
        assert_eq!(update_weather(&mut field, &config, &mut rng), 0);
        assert!(field
            .iter()
            .all(|(_, cell)| cell.weather() == Some(Weather::Fog)));
    }

    #[test]
    fn test_disabled_weather_clears() {
        let mut field = Field::new(4, 4, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        seed_weather(&mut field, &WeatherConfig::default(), &mut rng);
        seed_weather(&mut field, &WeatherConfig::disabled(), &mut rng);
        assert!(field.iter().all(|(_, cell)| cell.weather().is_none()));
    }
}
