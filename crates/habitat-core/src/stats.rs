//! Birth and death bookkeeping.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Why an organism left the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeathCause {
    OldAge,
    Starvation,
    Disease,
    Eaten,
    Poisoned,
    Overcrowding,
    Competition,
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeathCause::OldAge => "old_age",
            DeathCause::Starvation => "starvation",
            DeathCause::Disease => "disease",
            DeathCause::Eaten => "eaten",
            DeathCause::Poisoned => "poisoned",
            DeathCause::Overcrowding => "overcrowding",
            DeathCause::Competition => "competition",
        };
        f.write_str(name)
    }
}

/// What happened during a single tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickTally {
    pub births: u32,
    pub deaths: BTreeMap<DeathCause, u32>,
    pub new_infections: u32,
}

impl TickTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_death(&mut self, cause: DeathCause) {
        *self.deaths.entry(cause).or_insert(0) += 1;
    }

    pub fn deaths_by(&self, cause: DeathCause) -> u32 {
        self.deaths.get(&cause).copied().unwrap_or(0)
    }

    pub fn total_deaths(&self) -> u32 {
        self.deaths.values().sum()
    }
}

/// Running totals over a whole run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationStats {
    pub ticks: u64,
    pub total_births: u64,
    pub total_infections: u64,
    pub deaths: BTreeMap<DeathCause, u64>,
    pub peak_population: usize,
    pub peak_tick: u64,
}

impl PopulationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick into the totals
    pub fn update(&mut self, tick: u64, tally: &TickTally, population: usize) {
        self.ticks = self.ticks.max(tick);
        self.total_births += tally.births as u64;
        self.total_infections += tally.new_infections as u64;
        for (cause, count) in &tally.deaths {
            *self.deaths.entry(*cause).or_insert(0) += *count as u64;
        }
        if population > self.peak_population {
            self.peak_population = population;
            self.peak_tick = tick;
        }
    }

    pub fn total_deaths(&self) -> u64 {
        self.deaths.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_counts() {
        let mut tally = TickTally::new();
        tally.record_death(DeathCause::Eaten);
        tally.record_death(DeathCause::Eaten);
        tally.record_death(DeathCause::OldAge);
        assert_eq!(tally.deaths_by(DeathCause::Eaten), 2);
        assert_eq!(tally.deaths_by(DeathCause::Disease), 0);
        assert_eq!(tally.total_deaths(), 3);
    }

    #[test]
    fn test_stats_update() {
        let mut stats = PopulationStats::new();

        let mut first = TickTally::new();
        first.births = 4;
        first.record_death(DeathCause::Starvation);
        stats.update(1, &first, 10);

        let mut second = TickTally::new();
        second.births = 1;
        second.new_infections = 2;
        second.record_death(DeathCause::Starvation);
        stats.update(2, &second, 7);

        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.total_births, 5);
        assert_eq!(stats.total_infections, 2);
        assert_eq!(stats.total_deaths(), 2);
        assert_eq!(stats.peak_population, 10);
        assert_eq!(stats.peak_tick, 1);
    }

    #[test]
    fn test_cause_display() {
        assert_eq!(DeathCause::Overcrowding.to_string(), "overcrowding");
    }
}
