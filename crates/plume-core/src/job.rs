//! The simulation job request.

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::measurement::{validate_pollutant_coverage, Measurement};

/// Target grid resolution, chosen by the requester.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridDensity {
    /// ~10 cells before margin/urbanization scaling.
    Sparse,
    /// ~100 cells before margin/urbanization scaling.
    Medium,
    /// ~1000 cells before margin/urbanization scaling.
    Dense,
}

impl GridDensity {
    /// Target cell count before the `urbanized` doubling.
    pub fn target_cells(self) -> f64 {
        match self {
            Self::Sparse => 10.0,
            Self::Medium => 100.0,
            Self::Dense => 1000.0,
        }
    }
}

/// A fully-specified simulation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationJob {
    /// Sparse point observations the grid is built from.
    pub measurements: Vec<Measurement>,
    /// Number of time steps to advance.
    pub num_steps: usize,
    /// Pollutants to simulate; every measurement must carry each of these.
    pub pollutants: Vec<String>,
    /// Target grid resolution.
    pub grid_density: GridDensity,
    /// Whether the area is urbanized (doubles target cell count, raises
    /// surface roughness for turbulent diffusion).
    pub urbanized: bool,
    /// Padding cells added on each side of the measurement bounding box.
    pub margin_boxes: usize,
    /// Initial Chebyshev distance used by the interpolator.
    pub initial_distance: usize,
    /// Exponential decay rate (per hour) applied each step.
    pub decay_rate: f64,
    /// Emission rate (per hour) used to derive the fixed per-step source.
    pub emission_rate: f64,
    /// Snapshot cadence, in steps.
    pub snap_interval: usize,
}

impl SimulationJob {
    /// Validate the job's structural invariants.
    ///
    /// Does not check grid size (that's the grid builder's job, since it
    /// requires the derived cell count) or pollutant coverage beyond
    /// presence-in-every-measurement, which is checked here.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.measurements.is_empty() {
            return Err(SimulationError::EmptyMeasurements);
        }
        if self.num_steps < 1 {
            return Err(SimulationError::InvalidJob(
                "num_steps must be >= 1".to_string(),
            ));
        }
        if self.decay_rate < 0.0 {
            return Err(SimulationError::InvalidJob(
                "decay_rate must be non-negative".to_string(),
            ));
        }
        if self.emission_rate < 0.0 {
            return Err(SimulationError::InvalidJob(
                "emission_rate must be non-negative".to_string(),
            ));
        }
        if self.initial_distance < 1 {
            return Err(SimulationError::InvalidJob(
                "initial_distance must be >= 1".to_string(),
            ));
        }
        if self.snap_interval < 1 {
            return Err(SimulationError::InvalidJob(
                "snap_interval must be >= 1".to_string(),
            ));
        }
        if self.pollutants.is_empty() {
            return Err(SimulationError::InvalidJob(
                "pollutants must not be empty".to_string(),
            ));
        }
        validate_pollutant_coverage(&self.measurements, &self.pollutants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn measurement(pollutants: &[(&str, f64)]) -> Measurement {
        Measurement {
            id: 1,
            name: "p1".into(),
            latitude: 50.0,
            longitude: 19.9,
            temperature: 20.0,
            wind_speed: 1.0,
            wind_direction: 45.0,
            pressure: 101_325.0,
            flight_id: 1,
            pollutants: pollutants
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn base_job(measurements: Vec<Measurement>) -> SimulationJob {
        SimulationJob {
            measurements,
            num_steps: 10,
            pollutants: vec!["CO".to_string()],
            grid_density: GridDensity::Medium,
            urbanized: false,
            margin_boxes: 1,
            initial_distance: 1,
            decay_rate: 0.01,
            emission_rate: 0.01,
            snap_interval: 5,
        }
    }

    #[test]
    fn rejects_empty_measurements() {
        let job = base_job(vec![]);
        assert_eq!(job.validate(), Err(SimulationError::EmptyMeasurements));
    }

    #[test]
    fn rejects_zero_steps() {
        let mut job = base_job(vec![measurement(&[("CO", 1.0)])]);
        job.num_steps = 0;
        assert!(job.validate().is_err());
    }

    #[test]
    fn accepts_well_formed_job() {
        let job = base_job(vec![measurement(&[("CO", 1.0)])]);
        assert!(job.validate().is_ok());
    }
}
