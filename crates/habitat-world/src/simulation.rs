//! Step scheduler.
//!
//! Each tick advances the clock and weather, lets every live organism act
//! once in a fixed order, then commits: the dead leave the population and the
//! newborns buffered during the pass join it.

use crate::environment::{seed_weather, update_weather};
use crate::field::Field;
use crate::lifecycle::{act, TickContext};
use crate::organism::Organism;
use crate::populate::Populator;
use crate::snapshot::SnapshotView;
use habitat_core::{
    Error, Gender, IdSequence, Kind, Location, OrganismId, PopulationConfig, PopulationStats,
    Result, SimConfig, SpeciesId, SpeciesTable, TickTally,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, trace};

/// Outcome of [`Simulation::run`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    pub ticks_run: u64,
    /// The run ended because fewer than two species were left
    pub stopped_early: bool,
    pub final_population: BTreeMap<String, usize>,
    pub stats: PopulationStats,
}

pub struct Simulation {
    config: SimConfig,
    species: Arc<SpeciesTable>,
    field: Field,
    organisms: BTreeMap<OrganismId, Organism>,
    /// Removed during the last commit
    deceased: Vec<Organism>,
    rng: ChaCha8Rng,
    ids: IdSequence,
    tick: u64,
    last_tally: TickTally,
    stats: PopulationStats,
}

impl Simulation {
    /// An empty world; fill it with [`Simulation::reset`] or [`Simulation::add_organisms`].
    pub fn new(config: SimConfig, species: Arc<SpeciesTable>) -> Result<Self> {
        config.validate()?;
        species.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut field = Field::from_config(&config.field, &config.clock);
        seed_weather(&mut field, &config.weather, &mut rng);

        Ok(Self {
            config,
            species,
            field,
            organisms: BTreeMap::new(),
            deceased: Vec::new(),
            rng,
            ids: IdSequence::new(),
            tick: 0,
            last_tally: TickTally::new(),
            stats: PopulationStats::new(),
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn species(&self) -> &SpeciesTable {
        &self.species
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn stats(&self) -> &PopulationStats {
        &self.stats
    }

    /// Clear the world and seed a fresh population from `population`.
    ///
    /// The PRNG is reseeded from the configured seed, so equal configurations
    /// replay identically.
    pub fn reset(&mut self, population: &PopulationConfig) -> Result<()> {
        self.field.clear();
        self.field.clock_mut().reset();
        self.organisms.clear();
        self.deceased.clear();
        self.ids.reset();
        self.tick = 0;
        self.last_tally = TickTally::new();
        self.stats = PopulationStats::new();
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        seed_weather(&mut self.field, &self.config.weather, &mut self.rng);

        let organisms = Populator::new(population.clone()).populate(
            &mut self.field,
            &self.species,
            &mut self.rng,
            &mut self.ids,
        )?;
        self.add_organisms(organisms)?;

        info!(
            event = "simulation_reset",
            seed = self.config.seed,
            population = self.organisms.len(),
            "World reset"
        );
        Ok(())
    }

    /// Adopt pre-built organisms, placing any that are not on the field yet.
    ///
    /// The batch is all or nothing: on error neither the population nor the
    /// field changes.
    pub fn add_organisms(&mut self, organisms: Vec<Organism>) -> Result<()> {
        let mut batch = BTreeSet::new();
        for organism in &organisms {
            let id = organism.id;
            if self.organisms.contains_key(&id) || !batch.insert(id) {
                return Err(Error::AlreadyExists(format!("organism {id}")));
            }
            let descriptor = self
                .species
                .try_get(organism.species)
                .ok_or_else(|| Error::NotFound(format!("species {}", organism.species)))?;
            if descriptor.is_animal() != organism.is_animal() {
                return Err(Error::Validation(format!(
                    "organism {id} does not match the kind of {}",
                    descriptor.name
                )));
            }
            if !organism.is_alive() {
                return Err(Error::Validation(format!("organism {id} is dead")));
            }
        }

        let mut placed = Vec::new();
        for organism in &organisms {
            let (id, loc) = (organism.id, organism.location);
            let result = self.field.cell(loc).map(|cell| cell.contains(id)).and_then(|present| {
                if !present {
                    self.field.place(id, loc)?;
                    placed.push((id, loc));
                }
                Ok(())
            });
            if let Err(err) = result {
                for (id, loc) in placed {
                    self.field.remove(id, loc)?;
                }
                return Err(err);
            }
        }

        for organism in organisms {
            self.ids.observe(organism.id);
            self.organisms.insert(organism.id, organism);
        }
        Ok(())
    }

    fn spawn(&mut self, species: SpeciesId, kind: Kind, loc: Location, gender: Gender) -> Result<OrganismId> {
        let descriptor = self
            .species
            .try_get(species)
            .ok_or_else(|| Error::NotFound(format!("species {species}")))?;
        if descriptor.kind != kind {
            return Err(Error::Validation(format!(
                "{} is not {}",
                descriptor.name,
                if kind == Kind::Animal { "an animal" } else { "a plant" }
            )));
        }

        let id = self.ids.next_id();
        let organism = Organism::new(id, species, descriptor, loc, gender);
        self.add_organisms(vec![organism])?;
        Ok(id)
    }

    pub fn spawn_animal(&mut self, species: SpeciesId, loc: Location, gender: Gender) -> Result<OrganismId> {
        self.spawn(species, Kind::Animal, loc, gender)
    }

    pub fn spawn_plant(&mut self, species: SpeciesId, loc: Location) -> Result<OrganismId> {
        // plants carry no gender; the value is ignored
        self.spawn(species, Kind::Plant, loc, Gender::Female)
    }

    pub fn organism(&self, id: OrganismId) -> Option<&Organism> {
        self.organisms.get(&id)
    }

    /// Mutable access for test setups. Moving the organism here leaves the
    /// field stale; use it for age, energy and infection only.
    pub fn organism_mut(&mut self, id: OrganismId) -> Option<&mut Organism> {
        self.organisms.get_mut(&id)
    }

    /// Live organisms in id order
    pub fn organisms(&self) -> impl Iterator<Item = &Organism> + '_ {
        self.organisms.values()
    }

    /// Organisms that died during the last tick
    pub fn recently_deceased(&self) -> &[Organism] {
        &self.deceased
    }

    pub fn population_counts(&self) -> BTreeMap<SpeciesId, usize> {
        let mut counts = BTreeMap::new();
        for organism in self.organisms.values().filter(|o| o.is_alive()) {
            *counts.entry(organism.species).or_insert(0) += 1;
        }
        counts
    }

    /// At least two species still have live members
    pub fn is_viable(&self) -> bool {
        self.population_counts().len() >= 2
    }

    pub fn snapshot(&self) -> SnapshotView {
        SnapshotView::capture(
            self.tick,
            &self.field,
            &self.organisms,
            &self.species,
            &self.last_tally,
        )
    }

    /// Check that cells and organisms agree on who stands where.
    pub fn verify_occupancy(&self) -> Result<()> {
        let capacity = self.field.capacity();
        for (loc, cell) in self.field.iter() {
            if cell.len() > capacity {
                return Err(Error::InvalidState(format!(
                    "cell {loc} holds {} of {capacity}",
                    cell.len()
                )));
            }
            for id in cell.occupants() {
                match self.organisms.get(id) {
                    Some(organism) if organism.is_alive() && organism.location == loc => {}
                    Some(organism) => {
                        return Err(Error::InvalidState(format!(
                            "cell {loc} lists {id}, which is at {} (alive: {})",
                            organism.location,
                            organism.is_alive()
                        )))
                    }
                    None => {
                        return Err(Error::InvalidState(format!(
                            "cell {loc} lists unknown organism {id}"
                        )))
                    }
                }
            }
        }

        for organism in self.organisms.values() {
            let listed = self
                .field
                .cell(organism.location)?
                .occupants()
                .iter()
                .filter(|id| **id == organism.id)
                .count();
            if organism.is_alive() && listed != 1 {
                return Err(Error::InvalidState(format!(
                    "organism {} is listed {listed} times at {}",
                    organism.id, organism.location
                )));
            }
        }
        Ok(())
    }

    /// Run one tick and return the resulting snapshot.
    pub fn step(&mut self) -> SnapshotView {
        self.tick += 1;
        self.field.advance_clock();
        let changed = update_weather(&mut self.field, &self.config.weather, &mut self.rng);
        if changed > 0 {
            trace!(tick = self.tick, regions = changed, "Weather changed");
        }

        let mut order: Vec<OrganismId> = self.organisms.keys().copied().collect();
        if self.config.shuffle_order {
            order.shuffle(&mut self.rng);
        }

        let mut tally = TickTally::new();
        let mut births = Vec::new();
        let mut ctx = TickContext {
            field: &mut self.field,
            organisms: &mut self.organisms,
            species: &self.species,
            weather: &self.config.weather,
            rules: &self.config.rules,
            rng: &mut self.rng,
            ids: &mut self.ids,
            births: &mut births,
            tally: &mut tally,
            tick: self.tick,
        };
        for id in order {
            // eaten earlier this tick, or already gone
            let Some(mut organism) = ctx.organisms.remove(&id) else {
                continue;
            };
            if organism.is_alive() {
                act(&mut ctx, &mut organism);
            }
            ctx.organisms.insert(id, organism);
        }

        self.commit(births, tally);

        if self.config.log_interval > 0 && self.tick % self.config.log_interval == 0 {
            self.log_population();
        }
        self.snapshot()
    }

    fn commit(&mut self, births: Vec<Organism>, tally: TickTally) {
        let dead: Vec<OrganismId> = self
            .organisms
            .values()
            .filter(|o| !o.is_alive())
            .map(|o| o.id)
            .collect();
        self.deceased = dead
            .iter()
            .filter_map(|id| self.organisms.remove(id))
            .collect();

        for organism in births {
            self.organisms.insert(organism.id, organism);
        }

        self.stats.update(self.tick, &tally, self.organisms.len());
        if tally.births > 0 || tally.total_deaths() > 0 {
            debug!(
                event = "tick_committed",
                tick = self.tick,
                births = tally.births,
                deaths = tally.total_deaths(),
                new_infections = tally.new_infections,
                population = self.organisms.len(),
                "Tick committed"
            );
        }
        self.last_tally = tally;
    }

    fn log_population(&self) {
        let counts = self.population_counts();
        let infected = self.organisms.values().filter(|o| o.is_infected()).count();
        let per_species: Vec<String> = self
            .species
            .iter()
            .map(|(id, descriptor)| {
                format!("{}={}", descriptor.name, counts.get(&id).copied().unwrap_or(0))
            })
            .collect();

        info!(
            event = "population_metrics",
            tick = self.tick,
            day = self.field.clock().day(),
            season = ?self.field.clock().season(),
            total_population = self.organisms.len(),
            species_alive = counts.len(),
            infected,
            births = self.last_tally.births,
            deaths = self.last_tally.total_deaths(),
            populations = %per_species.join(" "),
            "Population metrics"
        );
    }

    /// Step until the tick budget is spent or fewer than two species remain.
    #[instrument(skip(self), fields(num_ticks = self.config.num_ticks, seed = self.config.seed))]
    pub fn run(&mut self) -> RunSummary {
        info!("Starting simulation for {} ticks", self.config.num_ticks);

        let mut ticks_run = 0;
        let mut stopped_early = false;
        while ticks_run < self.config.num_ticks {
            if !self.is_viable() {
                stopped_early = true;
                info!(
                    event = "run_not_viable",
                    tick = self.tick,
                    species_alive = self.population_counts().len(),
                    "Fewer than two species left, stopping"
                );
                break;
            }
            self.step();
            ticks_run += 1;
        }

        let final_population = self.snapshot().populations;
        let summary = RunSummary {
            seed: self.config.seed,
            ticks_run,
            stopped_early,
            final_population,
            stats: self.stats.clone(),
        };

        info!(
            event = "run_summary",
            ticks_run,
            final_tick = self.tick,
            stopped_early,
            total_births = summary.stats.total_births,
            total_deaths = summary.stats.total_deaths(),
            total_infections = summary.stats.total_infections,
            peak_population = summary.stats.peak_population,
            peak_tick = summary.stats.peak_tick,
            "Simulation finished"
        );
        for (cause, count) in &summary.stats.deaths {
            info!(event = "deaths_by_cause", cause = %cause, count, "Deaths by cause");
        }

        summary
    }
}
