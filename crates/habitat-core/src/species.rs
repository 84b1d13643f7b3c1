//! Species registry.
//!
//! Every behavioural difference between species is data in a
//! [`SpeciesDescriptor`]. The engine runs a single organism type and reads
//! per-species numbers from the [`SpeciesTable`]; there is no per-species code.

use crate::error::{Error, Result};
use crate::types::SpeciesId;
use serde::{Deserialize, Serialize};

/// Capability tag of a species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Animal,
    Plant,
}

/// Which quarters of the day a species is awake in.
///
/// Bit `q` set means the species is active during quadrant `q` of the clock
/// (quadrant 0 starts at midnight).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveHours(pub u8);

impl ActiveHours {
    pub const ALWAYS: ActiveHours = ActiveHours(0b1111);
    pub const DIURNAL: ActiveHours = ActiveHours(0b0110);
    pub const NOCTURNAL: ActiveHours = ActiveHours(0b1001);

    pub fn is_active(&self, quadrant: u32) -> bool {
        quadrant < 4 && self.0 & (1 << quadrant) != 0
    }
}

impl Default for ActiveHours {
    fn default() -> Self {
        ActiveHours::ALWAYS
    }
}

/// What happens when an infection runs its course
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RecoveryPolicy {
    /// Always recover; optionally become immune afterwards
    Recover { immune: bool },
    /// Always die
    Die,
    /// Die with the given probability, otherwise recover with immunity
    Chance { fatality: f64 },
}

/// Disease parameters for a species that can carry an infection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfectionProfile {
    /// Ticks an infection lasts
    pub duration: u32,
    /// Extra energy lost per awake tick while infected
    pub energy_penalty: i32,
    /// Chance of passing the infection to each same-species neighbour per tick
    pub spread_probability: f64,
    /// Chebyshev radius of contagion
    pub spread_radius: i32,
    pub recovery: RecoveryPolicy,
}

impl Default for InfectionProfile {
    fn default() -> Self {
        Self {
            duration: 5,
            energy_penalty: 1,
            spread_probability: 0.1,
            spread_radius: 1,
            recovery: RecoveryPolicy::Recover { immune: true },
        }
    }
}

/// Immutable per-species parameter table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDescriptor {
    pub name: String,
    pub kind: Kind,
    /// Age in ticks beyond which the organism dies
    pub max_age: u32,
    /// Age at which animals may breed and plants start seeding
    pub breeding_age: u32,
    /// Chance of a litter (or seeding) per eligible tick, 0.0 to 1.0
    pub breeding_probability: f64,
    /// Upper bound for offspring (or seeds) per event
    pub max_litter_size: u32,
    /// Ticks an animal must wait after giving birth
    pub breeding_cooldown: u32,
    /// Nutrition granted to whoever eats this organism
    pub food_value: i32,
    pub max_energy: i32,
    /// Energy of a newborn
    pub initial_energy: i32,
    /// Below this energy an animal goes looking for food
    pub hunger_threshold: i32,
    /// Energy lost per awake tick
    pub metabolism: i32,
    /// Energy regained per sleeping tick
    pub rest_recovery: i32,
    /// Plant biomass regained per tick
    pub growth_per_tick: i32,
    /// Share of a plant's biomass removed per bite (1.0 = eaten whole)
    pub grazing_fraction: f64,
    /// Plants with a higher survival rate win competition for space
    pub survival_rate: f64,
    /// Species this one eats
    pub diet: Vec<SpeciesId>,
    /// Search radius in cells
    pub sight_radius: u32,
    pub active_hours: ActiveHours,
    /// Eating a poisonous organism costs its food value instead of granting it
    pub poisonous: bool,
    pub infection: Option<InfectionProfile>,
}

impl SpeciesDescriptor {
    /// A generic animal; tweak with struct update syntax.
    pub fn animal(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: Kind::Animal,
            max_age: 100,
            breeding_age: 10,
            breeding_probability: 0.1,
            max_litter_size: 2,
            breeding_cooldown: 5,
            food_value: 10,
            max_energy: 40,
            initial_energy: 20,
            hunger_threshold: 15,
            metabolism: 1,
            rest_recovery: 1,
            growth_per_tick: 0,
            grazing_fraction: 1.0,
            survival_rate: 0.0,
            diet: Vec::new(),
            sight_radius: 3,
            active_hours: ActiveHours::ALWAYS,
            poisonous: false,
            infection: None,
        }
    }

    /// A generic plant; tweak with struct update syntax.
    pub fn plant(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: Kind::Plant,
            max_age: 200,
            breeding_age: 3,
            breeding_probability: 0.05,
            max_litter_size: 2,
            breeding_cooldown: 0,
            food_value: 8,
            max_energy: 10,
            initial_energy: 10,
            hunger_threshold: 0,
            metabolism: 0,
            rest_recovery: 0,
            growth_per_tick: 1,
            grazing_fraction: 1.0,
            survival_rate: 0.5,
            diet: Vec::new(),
            sight_radius: 0,
            active_hours: ActiveHours::ALWAYS,
            poisonous: false,
            infection: None,
        }
    }

    pub fn is_animal(&self) -> bool {
        self.kind == Kind::Animal
    }

    pub fn eats(&self, prey: SpeciesId) -> bool {
        self.diet.contains(&prey)
    }
}

/// The closed set of species a simulation runs with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesTable {
    species: Vec<SpeciesDescriptor>,
}

impl SpeciesTable {
    /// Build a table; the position of a descriptor is its [`SpeciesId`].
    pub fn new(species: Vec<SpeciesDescriptor>) -> Result<Self> {
        let table = Self { species };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<()> {
        if self.species.is_empty() {
            return Err(Error::Validation("species table is empty".to_string()));
        }
        if self.species.len() > u16::MAX as usize {
            return Err(Error::Validation("too many species".to_string()));
        }

        for (index, spec) in self.species.iter().enumerate() {
            let name = &spec.name;
            if self.species[..index].iter().any(|other| &other.name == name) {
                return Err(Error::Validation(format!("duplicate species name {name}")));
            }
            if !(0.0..=1.0).contains(&spec.breeding_probability) {
                return Err(Error::Validation(format!(
                    "{name}: breeding probability {} outside [0, 1]",
                    spec.breeding_probability
                )));
            }
            if !(spec.grazing_fraction > 0.0 && spec.grazing_fraction <= 1.0) {
                return Err(Error::Validation(format!(
                    "{name}: grazing fraction {} outside (0, 1]",
                    spec.grazing_fraction
                )));
            }
            if spec.max_energy <= 0 {
                return Err(Error::Validation(format!("{name}: max energy must be positive")));
            }
            if spec.initial_energy <= 0 {
                return Err(Error::Validation(format!("{name}: initial energy must be positive")));
            }
            if let Some(prey) = spec.diet.iter().find(|id| id.index() >= self.species.len()) {
                return Err(Error::Validation(format!("{name}: diet refers to unknown {prey}")));
            }
            if let Some(profile) = &spec.infection {
                if !(0.0..=1.0).contains(&profile.spread_probability) {
                    return Err(Error::Validation(format!(
                        "{name}: spread probability {} outside [0, 1]",
                        profile.spread_probability
                    )));
                }
                if let RecoveryPolicy::Chance { fatality } = profile.recovery {
                    if !(0.0..=1.0).contains(&fatality) {
                        return Err(Error::Validation(format!(
                            "{name}: fatality {fatality} outside [0, 1]"
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Descriptor for an id handed out by this table.
    ///
    /// Panics on a foreign id; ids only come from the table itself.
    pub fn get(&self, id: SpeciesId) -> &SpeciesDescriptor {
        &self.species[id.index()]
    }

    pub fn try_get(&self, id: SpeciesId) -> Option<&SpeciesDescriptor> {
        self.species.get(id.index())
    }

    pub fn id_of(&self, name: &str) -> Result<SpeciesId> {
        self.species
            .iter()
            .position(|spec| spec.name == name)
            .map(|index| SpeciesId(index as u16))
            .ok_or_else(|| Error::NotFound(format!("species {name}")))
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpeciesId, &SpeciesDescriptor)> + '_ {
        self.species
            .iter()
            .enumerate()
            .map(|(index, spec)| (SpeciesId(index as u16), spec))
    }
}

impl Default for SpeciesTable {
    /// Two plants, two grazers and two predators.
    fn default() -> Self {
        let grass = SpeciesId(0);
        let berry_bush = SpeciesId(1);
        let rabbit = SpeciesId(2);
        let deer = SpeciesId(3);

        let species = vec![
            SpeciesDescriptor {
                max_age: 200,
                breeding_age: 3,
                breeding_probability: 0.08,
                max_litter_size: 3,
                food_value: 8,
                survival_rate: 0.6,
                ..SpeciesDescriptor::plant("grass")
            },
            SpeciesDescriptor {
                max_age: 400,
                breeding_age: 10,
                breeding_probability: 0.04,
                max_litter_size: 2,
                food_value: 14,
                max_energy: 30,
                initial_energy: 30,
                growth_per_tick: 2,
                grazing_fraction: 0.5,
                survival_rate: 0.8,
                ..SpeciesDescriptor::plant("berry_bush")
            },
            SpeciesDescriptor {
                max_age: 60,
                breeding_age: 6,
                breeding_probability: 0.3,
                max_litter_size: 4,
                breeding_cooldown: 5,
                food_value: 12,
                max_energy: 30,
                initial_energy: 20,
                hunger_threshold: 15,
                diet: vec![grass, berry_bush],
                sight_radius: 3,
                active_hours: ActiveHours::DIURNAL,
                ..SpeciesDescriptor::animal("rabbit")
            },
            SpeciesDescriptor {
                max_age: 120,
                breeding_age: 15,
                breeding_probability: 0.15,
                max_litter_size: 2,
                breeding_cooldown: 10,
                food_value: 25,
                max_energy: 50,
                initial_energy: 35,
                hunger_threshold: 25,
                diet: vec![grass, berry_bush],
                sight_radius: 4,
                active_hours: ActiveHours::DIURNAL,
                ..SpeciesDescriptor::animal("deer")
            },
            SpeciesDescriptor {
                max_age: 150,
                breeding_age: 20,
                breeding_probability: 0.1,
                max_litter_size: 3,
                breeding_cooldown: 12,
                food_value: 15,
                max_energy: 60,
                initial_energy: 40,
                hunger_threshold: 35,
                diet: vec![rabbit],
                sight_radius: 5,
                active_hours: ActiveHours::NOCTURNAL,
                infection: Some(InfectionProfile {
                    duration: 6,
                    energy_penalty: 2,
                    spread_probability: 0.2,
                    spread_radius: 1,
                    recovery: RecoveryPolicy::Recover { immune: true },
                }),
                ..SpeciesDescriptor::animal("fox")
            },
            SpeciesDescriptor {
                max_age: 200,
                breeding_age: 25,
                breeding_probability: 0.08,
                max_litter_size: 2,
                breeding_cooldown: 15,
                food_value: 20,
                max_energy: 80,
                initial_energy: 50,
                hunger_threshold: 45,
                diet: vec![rabbit, deer],
                sight_radius: 6,
                infection: Some(InfectionProfile {
                    duration: 8,
                    energy_penalty: 1,
                    spread_probability: 0.1,
                    spread_radius: 2,
                    recovery: RecoveryPolicy::Chance { fatality: 0.3 },
                }),
                ..SpeciesDescriptor::animal("wolf")
            },
        ];

        Self { species }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_valid() {
        let table = SpeciesTable::default();
        assert!(table.validate().is_ok());
        assert_eq!(table.len(), 6);
        assert_eq!(table.id_of("fox").unwrap(), SpeciesId(4));
        assert!(table.get(SpeciesId(4)).eats(SpeciesId(2)));
        assert!(!table.get(SpeciesId(2)).eats(SpeciesId(4)));
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(matches!(SpeciesTable::new(Vec::new()), Err(Error::Validation(_))));
    }

    #[test]
    fn test_unknown_diet_rejected() {
        let hare = SpeciesDescriptor {
            diet: vec![SpeciesId(9)],
            ..SpeciesDescriptor::animal("hare")
        };
        assert!(SpeciesTable::new(vec![hare]).is_err());
    }

    #[test]
    fn test_bad_probability_rejected() {
        let hare = SpeciesDescriptor {
            breeding_probability: 1.5,
            ..SpeciesDescriptor::animal("hare")
        };
        assert!(SpeciesTable::new(vec![hare]).is_err());
    }

    #[test]
    fn test_non_positive_initial_energy_rejected() {
        let fern = SpeciesDescriptor {
            initial_energy: 0,
            ..SpeciesDescriptor::plant("fern")
        };
        assert!(matches!(SpeciesTable::new(vec![fern]), Err(Error::Validation(_))));
    }

    #[test]
    fn test_active_hours() {
        assert!(ActiveHours::ALWAYS.is_active(0));
        assert!(ActiveHours::DIURNAL.is_active(1));
        assert!(!ActiveHours::DIURNAL.is_active(3));
        assert!(ActiveHours::NOCTURNAL.is_active(3));
        assert!(!ActiveHours::NOCTURNAL.is_active(2));
        assert!(!ActiveHours::ALWAYS.is_active(4));
    }

    #[test]
    fn test_table_serialization() {
        let table = SpeciesTable::default();
        let json = serde_json::to_string(&table).unwrap();
        let restored: SpeciesTable = serde_json::from_str(&json).unwrap();
        assert_eq!(table, restored);
    }
}
