//! Measurement records: the immutable sparse observations a job is built from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// A single drone-flight measurement point.
///
/// Wind direction is azimuth degrees (0 = north, clockwise); see
/// [`Measurement::wind_components`] for the Cartesian conversion used
/// throughout the grid builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Source measurement id.
    pub id: i64,
    /// Human-readable label.
    pub name: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Air temperature in degrees Celsius.
    pub temperature: f64,
    /// Wind speed in m/s.
    pub wind_speed: f64,
    /// Wind direction, azimuth degrees (0 = north, clockwise).
    pub wind_direction: f64,
    /// Atmospheric pressure in Pascals.
    pub pressure: f64,
    /// Id of the drone flight this measurement belongs to.
    pub flight_id: i64,
    /// Pollutant name -> concentration, e.g. `"CO" -> 5234.0`.
    pub pollutants: BTreeMap<String, f64>,
}

impl Measurement {
    /// Convert `(speed, azimuth_degrees)` into Cartesian wind components.
    ///
    /// `u = V*sin(theta)`, `v = V*cos(theta)`, theta in radians.
    pub fn wind_components(&self) -> (f64, f64) {
        let theta = self.wind_direction.to_radians();
        let u = self.wind_speed * theta.sin();
        let v = self.wind_speed * theta.cos();
        (u, v)
    }

    /// Concentration of `pollutant` on this measurement, if present.
    pub fn pollutant(&self, pollutant: &str) -> Option<f64> {
        self.pollutants.get(pollutant).copied()
    }
}

/// Validate that every measurement carries every pollutant the job
/// requests. Returns the first violation found, in measurement order.
pub fn validate_pollutant_coverage(
    measurements: &[Measurement],
    pollutants: &[String],
) -> Result<(), SimulationError> {
    for m in measurements {
        for pollutant in pollutants {
            if !m.pollutants.contains_key(pollutant) {
                return Err(SimulationError::MissingPollutantField {
                    measurement_id: m.id,
                    pollutant: pollutant.clone(),
                });
            }
        }
    }
    Ok(())
}
