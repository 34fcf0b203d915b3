//! Colegio Geo: offline importer for Costa Rica's province, canton and
//! district reference data.
//!
//! Three public CSV datasets are fetched, their columns located by name
//! heuristics, joined on canton and province codes, and written as a
//! single `provincia,canton,distrito` table.

pub mod error;
pub mod locations;
pub mod sources;
pub mod table;

pub use error::GeoError;
pub use locations::{Location, consolidate, write_locations};
pub use sources::{GeoSources, import};
pub use table::{Table, find_column};
