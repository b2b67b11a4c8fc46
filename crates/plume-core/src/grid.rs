//! The uniform lat/lon box grid.

use serde::{Deserialize, Serialize};

/// Geographic bounds of a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellBounds {
    /// Minimum latitude of the cell.
    pub lat_min: f64,
    /// Maximum latitude of the cell.
    pub lat_max: f64,
    /// Minimum longitude of the cell.
    pub lon_min: f64,
    /// Maximum longitude of the cell.
    pub lon_max: f64,
}

impl CellBounds {
    /// Latitude at the cell's center.
    pub fn lat_center(&self) -> f64 {
        (self.lat_min + self.lat_max) / 2.0
    }
}

/// A uniform rectangular lat/lon grid.
///
/// Cells are stored flat in row-major `(i * ny + j)` order, matching the
/// dense flat-buffer convention used for every per-cell quantity in this
/// pipeline (temperature, pressure, wind, pollutant fields).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Number of cells along the latitude axis.
    pub nx: usize,
    /// Number of cells along the longitude axis.
    pub ny: usize,
    /// Uniform cell size along latitude, in degrees.
    pub cell_lat: f64,
    /// Uniform cell size along longitude, in degrees.
    pub cell_lon: f64,
    /// Latitude of the grid's lower-left origin.
    pub lat_min: f64,
    /// Longitude of the grid's lower-left origin.
    pub lon_min: f64,
    /// Flat, row-major cell geometry.
    pub cells: Vec<CellBounds>,
}

impl Grid {
    /// Total number of cells (`nx * ny`).
    pub fn cell_count(&self) -> usize {
        self.nx * self.ny
    }

    /// Flat row-major index for `(i, j)`.
    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.ny + j
    }

    /// Locate the `(i, j)` cell containing `(lat, lon)`, if any.
    ///
    /// Returns `None` when the point falls outside the grid bounds; the
    /// caller is responsible for treating that as a dropped measurement.
    pub fn locate(&self, lat: f64, lon: f64) -> Option<(usize, usize)> {
        let i = ((lat - self.lat_min) / self.cell_lat).floor();
        let j = ((lon - self.lon_min) / self.cell_lon).floor();
        if i < 0.0 || j < 0.0 {
            return None;
        }
        let (i, j) = (i as usize, j as usize);
        if i < self.nx && j < self.ny {
            Some((i, j))
        } else {
            None
        }
    }

    /// Mean x/y cell size in meters, used by the stepper.
    ///
    /// `dy = cell_lat * 111320`; `dx = cell_lon * 111320 * cos(lat_center)`
    /// per cell, averaged across all cells.
    pub fn mean_cell_size_meters(&self) -> (f64, f64) {
        use crate::constants::DEG_LAT_TO_METERS;

        let dy = self.cell_lat * DEG_LAT_TO_METERS;
        let dx_sum: f64 = self
            .cells
            .iter()
            .map(|c| self.cell_lon * DEG_LAT_TO_METERS * c.lat_center().to_radians().cos())
            .sum();
        let dx = dx_sum / self.cells.len().max(1) as f64;
        (dx, dy)
    }
}
