//! Core type definitions for the simulation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an organism instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrganismId(pub u64);

impl fmt::Display for OrganismId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic source of organism identifiers.
///
/// Identifiers are handed out in creation order, so ordering organisms by id
/// reproduces the order in which they joined the population.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> OrganismId {
        let id = OrganismId(self.next);
        self.next += 1;
        id
    }

    /// Make sure ids handed out later never collide with `id`.
    pub fn observe(&mut self, id: OrganismId) {
        self.next = self.next.max(id.0 + 1);
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// Index of a species in the species table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesId(pub u16);

impl SpeciesId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "species:{}", self.0)
    }
}

/// Grid coordinate, row-major
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub row: i32,
    pub col: i32,
}

impl Location {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn offset(&self, drow: i32, dcol: i32) -> Self {
        Self {
            row: self.row + drow,
            col: self.col + dcol,
        }
    }

    /// Number of king moves between two locations
    pub fn chebyshev_distance(&self, other: &Location) -> i32 {
        (self.row - other.row).abs().max((self.col - other.col).abs())
    }

    /// Manhattan distance to another location
    pub fn manhattan_distance(&self, other: &Location) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }

    pub fn is_adjacent(&self, other: &Location) -> bool {
        self.chebyshev_distance(other) == 1
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The eight Moore-neighbourhood directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    /// (row, col) delta; north is towards row 0
    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (-1, 0),
            Direction::South => (1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
            Direction::NorthEast => (-1, 1),
            Direction::NorthWest => (-1, -1),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (1, -1),
        }
    }

    pub fn all() -> [Direction; 8] {
        [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
            Direction::NorthEast,
            Direction::NorthWest,
            Direction::SouthEast,
            Direction::SouthWest,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Gender::Male
        } else {
            Gender::Female
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Gender::Male => Gender::Female,
            Gender::Female => Gender::Male,
        }
    }
}

/// Local weather attached to a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weather {
    Sunny,
    Rain,
    Fog,
    Drought,
    Snow,
}

impl Weather {
    pub fn all() -> [Weather; 5] {
        [
            Weather::Sunny,
            Weather::Rain,
            Weather::Fog,
            Weather::Drought,
            Weather::Snow,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub fn from_index(index: u32) -> Self {
        match index % 4 {
            0 => Season::Spring,
            1 => Season::Summer,
            2 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Season::Spring => 0,
            Season::Summer => 1,
            Season::Autumn => 2,
            Season::Winter => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_distances() {
        let a = Location::new(0, 0);
        let b = Location::new(3, 4);
        assert_eq!(a.manhattan_distance(&b), 7);
        assert_eq!(a.chebyshev_distance(&b), 4);
        assert!(a.is_adjacent(&Location::new(1, 1)));
        assert!(!a.is_adjacent(&a));
    }

    #[test]
    fn test_direction_delta() {
        assert_eq!(Direction::North.to_delta(), (-1, 0));
        assert_eq!(Direction::SouthEast.to_delta(), (1, 1));
        let origin = Location::new(5, 5);
        for dir in Direction::all() {
            let (dr, dc) = dir.to_delta();
            assert!(origin.is_adjacent(&origin.offset(dr, dc)));
        }
    }

    #[test]
    fn test_id_sequence() {
        let mut ids = IdSequence::new();
        assert_eq!(ids.next_id(), OrganismId(0));
        ids.observe(OrganismId(10));
        assert_eq!(ids.next_id(), OrganismId(11));
        ids.observe(OrganismId(3));
        assert_eq!(ids.next_id(), OrganismId(12));
    }

    #[test]
    fn test_gender_random_produces_both() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let genders: Vec<Gender> = (0..64).map(|_| Gender::random(&mut rng)).collect();
        assert!(genders.contains(&Gender::Male));
        assert!(genders.contains(&Gender::Female));
        assert_eq!(Gender::Male.opposite(), Gender::Female);
    }

    #[test]
    fn test_season_cycle() {
        assert_eq!(Season::from_index(0), Season::Spring);
        assert_eq!(Season::from_index(3), Season::Winter);
        assert_eq!(Season::from_index(5), Season::Summer);
    }
}
