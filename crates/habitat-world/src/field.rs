//! Bounded 2D field of cells.

use crate::environment::Clock;
use habitat_core::{
    ClockConfig, Direction, Error, FieldConfig, Location, OrganismId, Result, Weather,
    DEFAULT_DEPTH, DEFAULT_WIDTH,
};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One grid position
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cell {
    occupants: Vec<OrganismId>,
    weather: Option<Weather>,
}

impl Cell {
    pub fn occupants(&self) -> &[OrganismId] {
        &self.occupants
    }

    pub fn len(&self) -> usize {
        self.occupants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    pub fn contains(&self, id: OrganismId) -> bool {
        self.occupants.contains(&id)
    }

    pub fn weather(&self) -> Option<Weather> {
        self.weather
    }
}

/// A rectangular, non-wrapping grid.
///
/// Cells record which organisms stand in them; organisms record their own
/// location. [`Field::place`] and [`Field::remove`] must be paired on every
/// move so the two views never disagree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    depth: i32,
    width: i32,
    capacity: usize,
    cells: Vec<Cell>,
    clock: Clock,
}

impl Field {
    pub fn try_new(depth: i32, width: i32, capacity: usize) -> Result<Self> {
        if depth <= 0 || width <= 0 {
            return Err(Error::InvalidDimensions { depth, width });
        }
        Ok(Self {
            depth,
            width,
            capacity: capacity.max(1),
            cells: vec![Cell::default(); (depth * width) as usize],
            clock: Clock::default(),
        })
    }

    /// Like [`Field::try_new`], but non-positive dimensions fall back to the
    /// defaults (80 x 120) instead of failing.
    pub fn new(depth: i32, width: i32, capacity: usize) -> Self {
        match Self::try_new(depth, width, capacity) {
            Ok(field) => field,
            Err(err) => {
                warn!(
                    event = "field_dimensions_fallback",
                    depth,
                    width,
                    default_depth = DEFAULT_DEPTH,
                    default_width = DEFAULT_WIDTH,
                    "{}, using defaults",
                    err
                );
                Self {
                    depth: DEFAULT_DEPTH,
                    width: DEFAULT_WIDTH,
                    capacity: capacity.max(1),
                    cells: vec![Cell::default(); (DEFAULT_DEPTH * DEFAULT_WIDTH) as usize],
                    clock: Clock::default(),
                }
            }
        }
    }

    /// Create a field from configuration
    pub fn from_config(config: &FieldConfig, clock: &ClockConfig) -> Self {
        let mut field = Self::new(config.depth, config.width, config.cell_capacity);
        field.clock = Clock::new(clock.clone());
        field
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, loc: Location) -> bool {
        loc.row >= 0 && loc.row < self.depth && loc.col >= 0 && loc.col < self.width
    }

    fn index(&self, loc: Location) -> usize {
        assert!(self.contains(loc), "{}", Error::InvalidLocation(loc));
        (loc.row * self.width + loc.col) as usize
    }

    /// Get location from index
    pub fn index_to_location(&self, index: usize) -> Location {
        let row = (index as i32) / self.width;
        let col = (index as i32) % self.width;
        Location::new(row, col)
    }

    /// Checked access for callers holding untrusted coordinates
    pub fn cell(&self, loc: Location) -> Result<&Cell> {
        if !self.contains(loc) {
            return Err(Error::InvalidLocation(loc));
        }
        Ok(&self.cells[self.index(loc)])
    }

    pub fn occupants(&self, loc: Location) -> &[OrganismId] {
        &self.cells[self.index(loc)].occupants
    }

    /// Whether the cell has room for one more occupant
    pub fn is_free(&self, loc: Location) -> bool {
        self.cells[self.index(loc)].occupants.len() < self.capacity
    }

    /// In-bounds Moore neighbours, shuffled on every call.
    pub fn adjacent_locations(&self, loc: Location, rng: &mut ChaCha8Rng) -> Vec<Location> {
        debug_assert!(self.contains(loc), "{}", Error::InvalidLocation(loc));
        let mut locations: Vec<Location> = Direction::all()
            .iter()
            .map(|dir| {
                let (drow, dcol) = dir.to_delta();
                loc.offset(drow, dcol)
            })
            .filter(|next| self.contains(*next))
            .collect();
        locations.shuffle(rng);
        locations
    }

    pub fn free_adjacent_locations(&self, loc: Location, rng: &mut ChaCha8Rng) -> Vec<Location> {
        self.adjacent_locations(loc, rng)
            .into_iter()
            .filter(|next| self.is_free(*next))
            .collect()
    }

    /// A random adjacent cell with room, if any
    pub fn free_adjacent_location(&self, loc: Location, rng: &mut ChaCha8Rng) -> Option<Location> {
        self.adjacent_locations(loc, rng)
            .into_iter()
            .find(|next| self.is_free(*next))
    }

    /// Every in-bounds cell within Chebyshev distance `radius`, excluding `loc`.
    pub fn locations_within_radius(&self, loc: Location, radius: i32) -> Vec<Location> {
        debug_assert!(self.contains(loc), "{}", Error::InvalidLocation(loc));
        let mut locations = Vec::new();
        for row in (loc.row - radius).max(0)..=(loc.row + radius).min(self.depth - 1) {
            for col in (loc.col - radius).max(0)..=(loc.col + radius).min(self.width - 1) {
                let next = Location::new(row, col);
                if next != loc {
                    locations.push(next);
                }
            }
        }
        locations
    }

    /// Add an occupant to a cell
    pub fn place(&mut self, id: OrganismId, loc: Location) -> Result<()> {
        if !self.contains(loc) {
            return Err(Error::InvalidLocation(loc));
        }
        let capacity = self.capacity;
        let index = self.index(loc);
        let cell = &mut self.cells[index];
        if cell.occupants.contains(&id) {
            return Err(Error::AlreadyExists(format!("organism {id} at {loc}")));
        }
        if cell.occupants.len() >= capacity {
            return Err(Error::CellFull(loc));
        }
        cell.occupants.push(id);
        Ok(())
    }

    /// Remove an occupant from a cell
    pub fn remove(&mut self, id: OrganismId, loc: Location) -> Result<()> {
        if !self.contains(loc) {
            return Err(Error::InvalidLocation(loc));
        }
        let index = self.index(loc);
        let cell = &mut self.cells[index];
        match cell.occupants.iter().position(|occupant| *occupant == id) {
            Some(pos) => {
                cell.occupants.remove(pos);
                Ok(())
            }
            None => Err(Error::NotFound(format!("organism {id} at {loc}"))),
        }
    }

    /// Move an occupant; leaves the field untouched if the target is full.
    pub fn relocate(&mut self, id: OrganismId, from: Location, to: Location) -> Result<()> {
        if !self.contains(to) {
            return Err(Error::InvalidLocation(to));
        }
        if !self.is_free(to) {
            return Err(Error::CellFull(to));
        }
        self.remove(id, from)?;
        self.place(id, to)
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    /// Advance the time of day by one tick
    pub fn advance_clock(&mut self) {
        self.clock.advance();
    }

    pub fn weather_at(&self, loc: Location) -> Option<Weather> {
        self.cells[self.index(loc)].weather
    }

    pub fn set_weather(&mut self, loc: Location, weather: Option<Weather>) {
        let index = self.index(loc);
        self.cells[index].weather = weather;
    }

    pub fn clear_weather(&mut self) {
        for cell in &mut self.cells {
            cell.weather = None;
        }
    }

    /// Drop every occupant; weather and clock are kept
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.occupants.clear();
        }
    }

    pub fn total_occupants(&self) -> usize {
        self.cells.iter().map(|cell| cell.occupants.len()).sum()
    }

    /// Iterator over all cells with locations
    pub fn iter(&self) -> impl Iterator<Item = (Location, &Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (self.index_to_location(i), cell))
    }
}
