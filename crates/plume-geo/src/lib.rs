//! Grid construction and sparse-field interpolation.

#![forbid(unsafe_code)]

pub mod builder;
pub mod interpolate;

pub use builder::{build_grid, PRESSURE, TEMPERATURE, WIND_U, WIND_V};
pub use interpolate::{chessboard_distance, fill, fill_all, interpolation_pass};
