//! Initial population seeding.
//!
//! Walks the field once and rolls the spawn rules in order for every free
//! cell; the first rule that succeeds claims the cell.

use crate::field::Field;
use crate::organism::Organism;
use habitat_core::{
    Error, Gender, IdSequence, Location, PopulationConfig, Result, SpeciesId, SpeciesTable,
};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

pub struct Populator {
    config: PopulationConfig,
}

impl Populator {
    pub fn new(config: PopulationConfig) -> Self {
        Self { config }
    }

    fn resolve(&self, species: &SpeciesTable) -> Result<Vec<(SpeciesId, f64)>> {
        self.config
            .spawn
            .iter()
            .map(|rule| {
                if !(0.0..=1.0).contains(&rule.probability) {
                    return Err(Error::Validation(format!(
                        "spawn probability {} for {} outside [0, 1]",
                        rule.probability, rule.species
                    )));
                }
                Ok((species.id_of(&rule.species)?, rule.probability))
            })
            .collect()
    }

    /// Create and place the starting organisms.
    ///
    /// Organisms are placed on `field` as they are created and returned in id
    /// order.
    pub fn populate(
        &self,
        field: &mut Field,
        species: &SpeciesTable,
        rng: &mut ChaCha8Rng,
        ids: &mut IdSequence,
    ) -> Result<Vec<Organism>> {
        let rules = self.resolve(species)?;
        let infection_chance = self.config.initial_infection_probability;
        if !(0.0..=1.0).contains(&infection_chance) {
            return Err(Error::Validation(format!(
                "initial infection probability {infection_chance} outside [0, 1]"
            )));
        }

        let mut organisms = Vec::new();
        for row in 0..field.depth() {
            for col in 0..field.width() {
                let loc = Location::new(row, col);
                if !field.is_free(loc) {
                    continue;
                }
                let Some(kind) = rules
                    .iter()
                    .find(|(_, probability)| rng.gen_bool(*probability))
                    .map(|(kind, _)| *kind)
                else {
                    continue;
                };

                let descriptor = species.get(kind);
                let id = ids.next_id();
                let gender = Gender::random(rng);
                let mut organism = Organism::new(id, kind, descriptor, loc, gender);

                if self.config.random_age {
                    if descriptor.max_age > 0 {
                        organism.age = rng.gen_range(0..descriptor.max_age);
                    }
                    let ceiling = organism.energy.max(1);
                    organism.energy = rng.gen_range(1..=ceiling);
                }
                if let Some(profile) = &descriptor.infection {
                    if rng.gen_bool(infection_chance) {
                        organism.infect(profile.duration);
                    }
                }

                field.place(id, loc)?;
                organisms.push(organism);
            }
        }

        debug!(
            event = "population_seeded",
            organisms = organisms.len(),
            infected = organisms.iter().filter(|o| o.is_infected()).count(),
            "Seeded initial population"
        );
        Ok(organisms)
    }
}

impl Default for Populator {
    fn default() -> Self {
        Self::new(PopulationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitat_core::{OrganismId, SpawnRule, SpeciesDescriptor};
    use rand::SeedableRng;

    fn table() -> SpeciesTable {
        SpeciesTable::new(vec![
            SpeciesDescriptor::plant("grass"),
            SpeciesDescriptor {
                infection: Some(Default::default()),
                ..SpeciesDescriptor::animal("hare")
            },
        ])
        .unwrap()
    }

    fn config(rules: &[(&str, f64)]) -> PopulationConfig {
        PopulationConfig {
            spawn: rules
                .iter()
                .map(|(species, probability)| SpawnRule {
                    species: species.to_string(),
                    probability: *probability,
                })
                .collect(),
            random_age: false,
            initial_infection_probability: 0.0,
        }
    }

    #[test]
    fn test_certain_rule_fills_every_cell() {
        let species = table();
        let mut field = Field::new(4, 5, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut ids = IdSequence::new();

        let organisms = Populator::new(config(&[("hare", 1.0), ("grass", 1.0)]))
            .populate(&mut field, &species, &mut rng, &mut ids)
            .unwrap();

        assert_eq!(organisms.len(), 20);
        assert_eq!(field.total_occupants(), 20);
        // earlier rules win
        assert!(organisms.iter().all(|o| o.species == SpeciesId(1)));
        assert!(organisms.iter().all(|o| o.age == 0));
        for organism in &organisms {
            assert_eq!(field.occupants(organism.location), &[organism.id]);
        }
    }

    #[test]
    fn test_occupied_cells_are_skipped() {
        let species = table();
        let mut field = Field::new(2, 2, 1);
        field.place(OrganismId(99), Location::new(0, 0)).unwrap();
        let mut ids = IdSequence::new();
        ids.observe(OrganismId(99));

        let organisms = Populator::new(config(&[("grass", 1.0)]))
            .populate(&mut field, &species, &mut ChaCha8Rng::seed_from_u64(1), &mut ids)
            .unwrap();
        assert_eq!(organisms.len(), 3);
        assert!(organisms.iter().all(|o| o.id.0 >= 100));
    }

    #[test]
    fn test_random_age_and_infection() {
        let species = table();
        let mut field = Field::new(6, 6, 1);
        let mut populate_config = config(&[("hare", 1.0)]);
        populate_config.random_age = true;
        populate_config.initial_infection_probability = 1.0;

        let organisms = Populator::new(populate_config)
            .populate(&mut field, &species, &mut ChaCha8Rng::seed_from_u64(5), &mut IdSequence::new())
            .unwrap();

        let hare = species.get(SpeciesId(1));
        for organism in &organisms {
            assert!(organism.age < hare.max_age);
            assert!(organism.energy >= 1 && organism.energy <= hare.initial_energy);
            assert!(organism.is_infected());
        }
    }

    #[test]
    fn test_unknown_species_rejected() {
        let err = Populator::new(config(&[("unicorn", 0.5)]))
            .populate(
                &mut Field::new(2, 2, 1),
                &table(),
                &mut ChaCha8Rng::seed_from_u64(0),
                &mut IdSequence::new(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_bad_probability_rejected() {
        let err = Populator::new(config(&[("grass", 1.5)]))
            .populate(
                &mut Field::new(2, 2, 1),
                &table(),
                &mut ChaCha8Rng::seed_from_u64(0),
                &mut IdSequence::new(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
