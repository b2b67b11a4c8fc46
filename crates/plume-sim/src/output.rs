//! Output message assembly.

use std::collections::BTreeMap;

use plume_core::CellBounds;
use serde::{Deserialize, Serialize};

/// Grid geometry section of the output: row-major, same order as every
/// interior field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridOutput {
    /// One entry per cell, in row-major `(i*ny+j)` order.
    pub boxes: Vec<CellBounds>,
}

/// Per-pollutant concentration section of the output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollutantsOutput {
    /// Snapshot at step 0 and every `snap_interval` steps thereafter,
    /// keyed by the step number as a decimal string.
    pub steps: BTreeMap<String, BTreeMap<String, Vec<f64>>>,
    /// The concentration field after the final step.
    pub final_step: BTreeMap<String, Vec<f64>>,
}

/// Recomputed ambient field section of the output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvironmentOutput {
    /// Interpolated temperature field, degrees Celsius.
    pub temperature: Vec<f64>,
    /// Interpolated pressure field, Pascals.
    pub pressure: Vec<f64>,
    /// Recomputed wind speed, `sqrt(u^2 + v^2)`.
    #[serde(rename = "windSpeed")]
    pub wind_speed: Vec<f64>,
    /// Recomputed wind direction, azimuth degrees in `[0, 360)`.
    #[serde(rename = "windDirection")]
    pub wind_direction: Vec<f64>,
}

/// The full `result` payload of a `completed` response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationOutput {
    /// Grid geometry.
    pub grid: GridOutput,
    /// Per-pollutant concentration snapshots.
    pub pollutants: PollutantsOutput,
    /// Recomputed ambient fields.
    pub environment: EnvironmentOutput,
}

/// Recompute `(speed, azimuth_degrees)` from Cartesian wind components,
/// inverting [`plume_core::Measurement::wind_components`].
///
/// `speed = sqrt(u^2+v^2)`. The azimuth is the standard math-angle to
/// compass-bearing conversion, `(90 - atan2(v, u)*180/pi) mod 360` —
/// `v` (north component) and `u` (east component) play the roles of
/// `y` and `x` in the math-angle `atan2`, which is what makes this the
/// exact inverse of `u = V*sin(theta), v = V*cos(theta)`.
pub fn wind_speed_direction(u: f64, v: f64) -> (f64, f64) {
    let speed = (u * u + v * v).sqrt();
    let azimuth = (90.0 - v.atan2(u).to_degrees()).rem_euclid(360.0);
    (speed, azimuth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wind_round_trip_north() {
        let theta: f64 = 0.0;
        let u = 3.0 * theta.to_radians().sin();
        let v = 3.0 * theta.to_radians().cos();
        let (speed, az) = wind_speed_direction(u, v);
        assert!((speed - 3.0).abs() < 1e-9);
        assert!((az - 0.0).abs() < 1e-6);
    }

    #[test]
    fn wind_round_trip_east() {
        let theta: f64 = 90.0;
        let u = 4.0 * theta.to_radians().sin();
        let v = 4.0 * theta.to_radians().cos();
        let (speed, az) = wind_speed_direction(u, v);
        assert!((speed - 4.0).abs() < 1e-9);
        assert!((az - 90.0).abs() < 1e-6);
    }

    #[test]
    fn wind_round_trip_arbitrary_azimuth() {
        for &deg in &[17.0, 123.4, 200.0, 359.9] {
            let theta: f64 = deg;
            let speed_in = 6.5;
            let u = speed_in * theta.to_radians().sin();
            let v = speed_in * theta.to_radians().cos();
            let (speed_out, az_out) = wind_speed_direction(u, v);
            assert!((speed_out - speed_in).abs() < 1e-6);
            assert!((az_out - deg).abs() < 1e-6, "deg={deg} got={az_out}");
        }
    }
}
