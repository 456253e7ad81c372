//! Surface hydrology for generated worlds: rain falls on a height field, flows
//! between cells, optionally carves the terrain, and the final standing water
//! is classified into streams, rivers and lakes.

pub mod classify;
pub mod driver;
pub mod error;
pub mod field;
pub mod forcing;
pub mod grid;
pub mod hydraulic;
pub mod params;
pub mod snapshot;
pub mod terrain;

pub use classify::{classify_depth, classify_field, WaterClass};
pub use driver::{simulate, HydrologyResult, IterationStats, RunState, Simulation};
pub use error::{HydroError, Result};
pub use field::{Field, HeightField, SedimentField, WaterField};
pub use grid::EdgeMode;
pub use params::{Evaporation, FlowMode, SimulationParams};
pub use snapshot::{MemorySnapshots, NoSnapshots, SnapshotSink};
