//! Read-only view of the world after a tick, for renderers and tests.

use crate::field::Field;
use crate::organism::Organism;
use habitat_core::{DeathCause, Location, OrganismId, Season, SpeciesId, SpeciesTable, TickTally};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotView {
    pub tick: u64,
    pub hour: u32,
    pub day: u32,
    pub season: Season,
    pub is_night: bool,
    pub depth: i32,
    pub width: i32,
    /// Row-major; the species shown for each cell, if any
    cells: Vec<Option<SpeciesId>>,
    /// Live organisms per species id
    pub counts: BTreeMap<SpeciesId, usize>,
    /// Live organisms per species name
    pub populations: BTreeMap<String, usize>,
    pub infected: usize,
    pub births: u32,
    pub deaths: BTreeMap<DeathCause, u32>,
}

impl SnapshotView {
    pub(crate) fn capture(
        tick: u64,
        field: &Field,
        organisms: &BTreeMap<OrganismId, Organism>,
        species: &SpeciesTable,
        tally: &TickTally,
    ) -> Self {
        let clock = field.clock();

        // animals are drawn over the plants they share a cell with
        let cells = field
            .iter()
            .map(|(_, cell)| {
                let present: Vec<&Organism> = cell
                    .occupants()
                    .iter()
                    .filter_map(|id| organisms.get(id))
                    .filter(|organism| organism.is_alive())
                    .collect();
                present
                    .iter()
                    .find(|organism| organism.is_animal())
                    .or_else(|| present.first())
                    .map(|organism| organism.species)
            })
            .collect();

        let mut counts = BTreeMap::new();
        let mut infected = 0;
        for organism in organisms.values().filter(|o| o.is_alive()) {
            *counts.entry(organism.species).or_insert(0) += 1;
            if organism.is_infected() {
                infected += 1;
            }
        }

        let populations = species
            .iter()
            .map(|(id, descriptor)| (descriptor.name.clone(), counts.get(&id).copied().unwrap_or(0)))
            .collect();

        Self {
            tick,
            hour: clock.hour(),
            day: clock.day(),
            season: clock.season(),
            is_night: clock.is_night(),
            depth: field.depth(),
            width: field.width(),
            cells,
            counts,
            populations,
            infected,
            births: tally.births,
            deaths: tally.deaths.clone(),
        }
    }

    /// Species shown at `loc`; `None` for empty cells and out-of-bounds locations.
    pub fn species_at(&self, loc: Location) -> Option<SpeciesId> {
        if loc.row < 0 || loc.col < 0 || loc.row >= self.depth || loc.col >= self.width {
            return None;
        }
        self.cells[(loc.row * self.width + loc.col) as usize]
    }

    /// Cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (Location, Option<SpeciesId>)> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, species)| {
                let index = index as i32;
                (Location::new(index / width, index % width), *species)
            })
    }

    pub fn population(&self, species: SpeciesId) -> usize {
        self.counts.get(&species).copied().unwrap_or(0)
    }

    pub fn total_population(&self) -> usize {
        self.counts.values().sum()
    }

    /// Number of species with at least one live member
    pub fn species_alive(&self) -> usize {
        self.counts.values().filter(|count| **count > 0).count()
    }

    /// At least two species remain
    pub fn is_viable(&self) -> bool {
        self.species_alive() >= 2
    }
}
