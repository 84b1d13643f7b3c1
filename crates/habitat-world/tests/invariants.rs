//! Property tests for the engine invariants across random seeds and layouts.

use habitat_core::{
    FieldConfig, Location, OrganismId, PopulationConfig, SimConfig, SpeciesTable,
};
use habitat_world::{search::search_with_visits, Field, Simulation};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::sync::Arc;

fn simulation(seed: u64, depth: i32, width: i32, capacity: usize, shuffle: bool) -> Simulation {
    let config = SimConfig {
        seed,
        shuffle_order: shuffle,
        field: FieldConfig {
            depth,
            width,
            cell_capacity: capacity,
        },
        ..SimConfig::default()
    };
    let mut sim = Simulation::new(config, Arc::new(SpeciesTable::default())).unwrap();
    sim.reset(&PopulationConfig::default()).unwrap();
    sim
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_occupancy_invariant(
        seed in any::<u64>(),
        depth in 4i32..16,
        width in 4i32..16,
        capacity in 1usize..3,
        shuffle in any::<bool>(),
    ) {
        let mut sim = simulation(seed, depth, width, capacity, shuffle);
        prop_assert!(sim.verify_occupancy().is_ok());
        for _ in 0..30 {
            sim.step();
            prop_assert!(sim.verify_occupancy().is_ok());
            prop_assert_eq!(sim.field().total_occupants(), sim.organisms().count());
            for organism in sim.organisms() {
                prop_assert!(sim.field().contains(organism.location));
            }
        }
    }

    #[test]
    fn prop_age_and_energy_bounds(seed in any::<u64>(), shuffle in any::<bool>()) {
        let mut sim = simulation(seed, 12, 12, 1, shuffle);
        for _ in 0..40 {
            let before: BTreeMap<OrganismId, u32> =
                sim.organisms().map(|o| (o.id, o.age)).collect();
            sim.step();

            for organism in sim.organisms() {
                let descriptor = sim.species().get(organism.species);
                prop_assert!(organism.is_alive());
                prop_assert!(organism.age <= descriptor.max_age);
                prop_assert!(organism.energy <= descriptor.max_energy);
                prop_assert!(organism.energy > 0 || !organism.is_animal());
                if let Some(age) = before.get(&organism.id) {
                    prop_assert!(organism.age >= *age);
                }
            }
            for dead in sim.recently_deceased() {
                prop_assert!(!dead.is_alive());
                prop_assert!(dead.death.is_some());
            }
        }
    }

    #[test]
    fn prop_litters_within_bounds(seed in any::<u64>()) {
        let mut sim = simulation(seed, 12, 12, 1, false);
        let largest = sim
            .species()
            .iter()
            .map(|(_, descriptor)| descriptor.max_litter_size as usize)
            .max()
            .unwrap_or(0);
        for _ in 0..40 {
            let parents = sim.organisms().count();
            let view = sim.step();
            prop_assert!((view.births as usize) <= parents * largest);
        }
    }

    #[test]
    fn prop_search_terminates_within_radius(
        seed in any::<u64>(),
        radius in 0u32..8,
        row in 0i32..20,
        col in 0i32..20,
        blocked in proptest::collection::vec((0i32..20, 0i32..20), 0..60),
    ) {
        let mut field = Field::new(20, 20, 1);
        for (index, (r, c)) in blocked.into_iter().enumerate() {
            let loc = Location::new(r, c);
            if field.is_free(loc) {
                field.place(OrganismId(index as u64 + 1), loc).unwrap();
            }
        }
        let origin = Location::new(row, col);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        // nothing qualifies, so the search has to exhaust its range
        let (outcome, visited) = search_with_visits(&field, origin, radius, &mut rng, |_| false);
        prop_assert!(outcome.is_none());
        let side = 2 * radius as usize + 1;
        prop_assert!(visited <= side * side);
    }

    #[test]
    fn prop_search_step_is_adjacent_and_closer(
        seed in any::<u64>(),
        target_row in 0i32..10,
        target_col in 0i32..10,
    ) {
        let origin = Location::new(5, 5);
        let target = Location::new(target_row, target_col);
        prop_assume!(target != origin);

        let mut field = Field::new(10, 10, 1);
        let target_id = OrganismId(1);
        field.place(target_id, target).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let distance = origin.chebyshev_distance(&target) as u32;
        let outcome = habitat_world::sensory_search(&field, origin, distance, &mut rng, |id| id == target_id)
            .expect("target within sight");
        let step = outcome.location();
        prop_assert!(step.is_adjacent(&origin));
        prop_assert_eq!(step.chebyshev_distance(&target) + 1, origin.chebyshev_distance(&target));
    }
}
