//! Shared types, errors, and constants for the pollution-spread
//! simulation worker.
//!
//! This crate has no subsystem logic of its own: [`crate::grid::Grid`],
//! the field buffers, [`crate::job::SimulationJob`], and
//! [`crate::error::SimulationError`] are the vocabulary every other
//! `plume-*` crate builds on.

#![forbid(unsafe_code)]

pub mod constants;
pub mod error;
pub mod field;
pub mod grid;
pub mod job;
pub mod measurement;

pub use error::{ErrorKind, SimulationError};
pub use field::{DenseField, SparseField};
pub use grid::{CellBounds, Grid};
pub use job::{GridDensity, SimulationJob};
pub use measurement::Measurement;
