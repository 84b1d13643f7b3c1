//! Sensory search: bounded breadth-first search for food or mates.
//!
//! Expands outward from the seeker one ring of hops at a time, only walking
//! through cells with spare capacity. The first qualifying occupant
//! discovered wins; because [`Field::adjacent_locations`] shuffles its
//! output, ties at equal distance are broken by discovery order and are not
//! spatially deterministic. The result is the single step the seeker should
//! take, never the target's own location unless the target is already within
//! reach.

use crate::field::Field;
use habitat_core::{Location, OrganismId};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet, VecDeque};

/// Where a successful search leads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The target stands in this cell, which is the seeker's own cell or adjacent to it
    Reached(Location),
    /// First step of a shortest path towards the target
    Step(Location),
}

impl SearchOutcome {
    pub fn location(&self) -> Location {
        match self {
            SearchOutcome::Reached(loc) | SearchOutcome::Step(loc) => *loc,
        }
    }
}

/// Search up to `radius` hops from `origin` for an occupant accepted by `qualifies`.
pub fn sensory_search<F>(
    field: &Field,
    origin: Location,
    radius: u32,
    rng: &mut ChaCha8Rng,
    qualifies: F,
) -> Option<SearchOutcome>
where
    F: FnMut(OrganismId) -> bool,
{
    search_with_visits(field, origin, radius, rng, qualifies).0
}

/// [`sensory_search`] that also reports how many cells it looked at.
pub fn search_with_visits<F>(
    field: &Field,
    origin: Location,
    radius: u32,
    rng: &mut ChaCha8Rng,
    mut qualifies: F,
) -> (Option<SearchOutcome>, usize)
where
    F: FnMut(OrganismId) -> bool,
{
    if field.occupants(origin).iter().any(|id| qualifies(*id)) {
        return (Some(SearchOutcome::Reached(origin)), 1);
    }
    if radius == 0 {
        return (None, 1);
    }

    let mut visited: HashSet<Location> = HashSet::from([origin]);
    let mut parent: HashMap<Location, Location> = HashMap::new();
    let mut frontier: VecDeque<(Location, u32)> = VecDeque::from([(origin, 0)]);

    while let Some((current, distance)) = frontier.pop_front() {
        for next in field.adjacent_locations(current, rng) {
            if !visited.insert(next) {
                continue;
            }
            parent.insert(next, current);

            if field.occupants(next).iter().any(|id| qualifies(*id)) {
                return (Some(first_step(origin, next, &parent)), visited.len());
            }
            if distance + 1 < radius && field.is_free(next) {
                frontier.push_back((next, distance + 1));
            }
        }
    }

    (None, visited.len())
}

/// Walk the predecessor chain back to the cell adjacent to `origin`.
fn first_step(origin: Location, target: Location, parent: &HashMap<Location, Location>) -> SearchOutcome {
    let mut step = target;
    while let Some(&previous) = parent.get(&step) {
        if previous == origin {
            break;
        }
        step = previous;
    }

    if step == target {
        SearchOutcome::Reached(target)
    } else {
        SearchOutcome::Step(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const TARGET: OrganismId = OrganismId(100);

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    fn is_target(id: OrganismId) -> bool {
        id == TARGET
    }

    #[test]
    fn test_step_towards_diagonal_target() {
        let mut field = Field::new(6, 6, 1);
        field.place(TARGET, Location::new(2, 2)).unwrap();

        for seed in 0..10 {
            let outcome = sensory_search(&field, Location::new(0, 0), 3, &mut rng(seed), is_target);
            assert_eq!(outcome, Some(SearchOutcome::Step(Location::new(1, 1))));
        }
    }

    #[test]
    fn test_step_lies_on_shortest_path() {
        let mut field = Field::new(6, 6, 1);
        let target = Location::new(0, 2);
        field.place(TARGET, target).unwrap();

        for seed in 0..20 {
            let outcome = sensory_search(&field, Location::new(0, 0), 3, &mut rng(seed), is_target)
                .expect("target within range");
            let step = match outcome {
                SearchOutcome::Step(step) => step,
                other => panic!("unexpected outcome {other:?}"),
            };
            assert!(step.is_adjacent(&Location::new(0, 0)));
            assert_eq!(step.chebyshev_distance(&target), 1);
        }
    }

    #[test]
    fn test_adjacent_target_is_reached() {
        let mut field = Field::new(5, 5, 1);
        field.place(TARGET, Location::new(1, 0)).unwrap();
        let outcome = sensory_search(&field, Location::new(0, 0), 3, &mut rng(1), is_target);
        assert_eq!(outcome, Some(SearchOutcome::Reached(Location::new(1, 0))));
    }

    #[test]
    fn test_target_in_own_cell() {
        let mut field = Field::new(5, 5, 2);
        field.place(OrganismId(1), Location::new(2, 2)).unwrap();
        field.place(TARGET, Location::new(2, 2)).unwrap();
        let outcome = sensory_search(&field, Location::new(2, 2), 2, &mut rng(1), is_target);
        assert_eq!(outcome, Some(SearchOutcome::Reached(Location::new(2, 2))));
    }

    #[test]
    fn test_nothing_in_range() {
        let mut field = Field::new(10, 10, 1);
        field.place(TARGET, Location::new(0, 4)).unwrap();
        assert_eq!(
            sensory_search(&field, Location::new(0, 0), 3, &mut rng(2), is_target),
            None
        );
        assert!(sensory_search(&field, Location::new(0, 0), 4, &mut rng(2), is_target).is_some());
    }

    #[test]
    fn test_zero_radius_sees_nothing() {
        let mut field = Field::new(5, 5, 1);
        field.place(TARGET, Location::new(0, 1)).unwrap();
        assert_eq!(
            sensory_search(&field, Location::new(0, 0), 0, &mut rng(2), is_target),
            None
        );
    }

    #[test]
    fn test_search_routes_around_blocked_cells() {
        // wall along column 1 except the bottom row
        let mut field = Field::new(4, 4, 1);
        for row in 0..3 {
            field.place(OrganismId(row as u64), Location::new(row, 1)).unwrap();
        }
        field.place(TARGET, Location::new(0, 2)).unwrap();

        // the only route runs down to row 3 and back up: too far for radius 3
        assert_eq!(
            sensory_search(&field, Location::new(0, 0), 3, &mut rng(5), is_target),
            None
        );

        let outcome = sensory_search(&field, Location::new(0, 0), 6, &mut rng(5), is_target);
        assert_eq!(outcome, Some(SearchOutcome::Step(Location::new(1, 0))));
    }

    #[test]
    fn test_visits_bounded_by_radius() {
        let field = Field::new(50, 50, 1);
        for radius in 1..6u32 {
            let (outcome, visited) =
                search_with_visits(&field, Location::new(25, 25), radius, &mut rng(9), is_target);
            assert!(outcome.is_none());
            let side = 2 * radius as usize + 1;
            assert!(visited <= side * side);
        }
    }
}
