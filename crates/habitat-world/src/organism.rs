//! Organism state and management.

use habitat_core::{DeathCause, Gender, Kind, Location, OrganismId, SpeciesDescriptor, SpeciesId};
use serde::{Deserialize, Serialize};

/// A running infection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infection {
    /// Awake ticks left before the infection resolves
    pub remaining: u32,
}

/// State only animals carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalState {
    pub gender: Gender,
    pub infection: Option<Infection>,
    /// Recovered organisms cannot be infected again
    pub immune: bool,
    /// Ticks until the animal may breed again
    pub breeding_cooldown: u32,
}

/// Capability tag with per-capability state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Capability {
    Animal(AnimalState),
    Plant,
}

/// An organism in the simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organism {
    pub id: OrganismId,
    pub species: SpeciesId,
    pub location: Location,
    pub alive: bool,
    pub age: u32,
    /// Food level for animals, biomass for plants
    pub energy: i32,
    pub capability: Capability,
    /// Set when the organism dies
    pub death: Option<DeathCause>,
}

impl Organism {
    /// A newborn of the given species; animals get the supplied gender.
    pub fn new(
        id: OrganismId,
        species: SpeciesId,
        descriptor: &SpeciesDescriptor,
        location: Location,
        gender: Gender,
    ) -> Self {
        let capability = match descriptor.kind {
            Kind::Animal => Capability::Animal(AnimalState {
                gender,
                infection: None,
                immune: false,
                breeding_cooldown: 0,
            }),
            Kind::Plant => Capability::Plant,
        };

        Self {
            id,
            species,
            location,
            alive: true,
            age: 0,
            energy: descriptor.initial_energy.min(descriptor.max_energy),
            capability,
            death: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_animal(&self) -> bool {
        matches!(self.capability, Capability::Animal(_))
    }

    pub fn animal(&self) -> Option<&AnimalState> {
        match &self.capability {
            Capability::Animal(state) => Some(state),
            Capability::Plant => None,
        }
    }

    pub fn animal_mut(&mut self) -> Option<&mut AnimalState> {
        match &mut self.capability {
            Capability::Animal(state) => Some(state),
            Capability::Plant => None,
        }
    }

    pub fn gender(&self) -> Option<Gender> {
        self.animal().map(|state| state.gender)
    }

    pub fn is_infected(&self) -> bool {
        self.animal().map_or(false, |state| state.infection.is_some())
    }

    /// Start an infection unless already infected or immune.
    ///
    /// Returns whether a new infection began.
    pub fn infect(&mut self, duration: u32) -> bool {
        if !self.alive {
            return false;
        }
        match self.animal_mut() {
            Some(state) if state.infection.is_none() && !state.immune => {
                state.infection = Some(Infection {
                    remaining: duration.max(1),
                });
                true
            }
            _ => false,
        }
    }

    /// Mark dead; the caller is responsible for removing it from the field.
    pub fn set_dead(&mut self, cause: DeathCause) {
        if self.alive {
            self.alive = false;
            self.death = Some(cause);
        }
    }

    /// Age by one tick; returns true when past the species' lifespan.
    pub fn grow_older(&mut self, max_age: u32) -> bool {
        self.age = self.age.saturating_add(1);
        self.age > max_age
    }

    /// Add energy, clamped to `max`
    pub fn add_energy(&mut self, amount: i32, max: i32) {
        self.energy = (self.energy + amount).min(max);
    }

    /// Burn energy; returns false once the organism has run dry.
    pub fn consume_energy(&mut self, amount: i32) -> bool {
        self.energy = (self.energy - amount).max(0);
        self.energy > 0
    }

    pub fn move_to(&mut self, new_location: Location) {
        self.location = new_location;
    }
}
