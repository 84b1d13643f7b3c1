//! Habitat simulation engine: field, organisms, sensory search and the step scheduler.

pub mod environment;
pub mod field;
mod lifecycle;
pub mod organism;
pub mod populate;
pub mod search;
pub mod simulation;
pub mod snapshot;

pub use environment::Clock;
pub use field::{Cell, Field};
pub use organism::{AnimalState, Capability, Infection, Organism};
pub use populate::Populator;
pub use search::{sensory_search, SearchOutcome};
pub use simulation::{RunSummary, Simulation};
pub use snapshot::SnapshotView;
