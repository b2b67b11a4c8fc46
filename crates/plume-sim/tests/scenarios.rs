//! End-to-end scenario tests driving the full grid-build/interpolate/step
//! pipeline through one job.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;

use plume_core::{GridDensity, Measurement, SimulationError, SimulationJob};
use plume_sim::run;

fn measurement(id: i64, lat: f64, lon: f64, wind_speed: f64, wind_direction: f64, co: f64) -> Measurement {
    Measurement {
        id,
        name: format!("m{id}"),
        latitude: lat,
        longitude: lon,
        temperature: 15.0,
        wind_speed,
        wind_direction,
        pressure: 101_325.0,
        flight_id: 1,
        pollutants: BTreeMap::from([("CO".to_string(), co)]),
    }
}

/// An oversized grid request fails deterministically.
#[test]
fn grid_count_cap_fails_job() {
    let job = SimulationJob {
        measurements: vec![
            measurement(1, 0.0, 0.0, 0.0, 0.0, 100.0),
            measurement(2, 50.0, 50.0, 0.0, 0.0, 200.0),
        ],
        num_steps: 5,
        pollutants: vec!["CO".to_string()],
        grid_density: GridDensity::Dense,
        urbanized: true,
        margin_boxes: 1,
        initial_distance: 1,
        decay_rate: 0.01,
        emission_rate: 0.01,
        snap_interval: 1,
    };
    let cancel = AtomicBool::new(false);
    let err = run(&job, &cancel).expect_err("must be rejected");
    assert!(matches!(err, SimulationError::GridTooLarge { .. }));
}

/// A well-formed job with calm wind produces a completed run whose
/// output carries one entry per cell for every section.
#[test]
fn calm_wind_job_runs_to_completion() {
    let job = SimulationJob {
        measurements: vec![
            measurement(1, 50.0, 19.9, 0.0, 0.0, 800.0),
            measurement(2, 50.02, 19.92, 0.0, 0.0, 5.0),
        ],
        num_steps: 4,
        pollutants: vec!["CO".to_string()],
        grid_density: GridDensity::Sparse,
        urbanized: false,
        margin_boxes: 1,
        initial_distance: 1,
        decay_rate: 0.02,
        emission_rate: 0.02,
        snap_interval: 2,
    };
    let cancel = AtomicBool::new(false);
    let output = run(&job, &cancel).expect("simulation runs");

    let cell_count = output.grid.boxes.len();
    assert_eq!(output.environment.temperature.len(), cell_count);
    assert_eq!(output.environment.pressure.len(), cell_count);
    assert_eq!(output.environment.wind_speed.len(), cell_count);
    assert_eq!(output.environment.wind_direction.len(), cell_count);
    assert_eq!(output.pollutants.final_step["CO"].len(), cell_count);
    // snap_interval=2 over 4 steps: snapshots at steps 0, 2, 4.
    assert!(output.pollutants.steps.contains_key("0"));
    assert!(output.pollutants.steps.contains_key("2"));
    assert!(output.pollutants.steps.contains_key("4"));
    assert!(output
        .pollutants
        .final_step["CO"]
        .iter()
        .all(|v| v.is_finite() && *v >= -1e-9));
}

/// Multiple pollutants are each simulated independently with their own
/// concentration field, sharing the same grid and environment.
#[test]
fn multiple_pollutants_each_get_their_own_final_step() {
    let mut m1 = measurement(1, 50.0, 19.9, 1.0, 90.0, 900.0);
    m1.pollutants.insert("NO2".to_string(), 40.0);
    let mut m2 = measurement(2, 50.03, 19.93, 1.0, 90.0, 10.0);
    m2.pollutants.insert("NO2".to_string(), 5.0);

    let job = SimulationJob {
        measurements: vec![m1, m2],
        num_steps: 2,
        pollutants: vec!["CO".to_string(), "NO2".to_string()],
        grid_density: GridDensity::Sparse,
        urbanized: false,
        margin_boxes: 1,
        initial_distance: 1,
        decay_rate: 0.01,
        emission_rate: 0.01,
        snap_interval: 1,
    };
    let cancel = AtomicBool::new(false);
    let output = run(&job, &cancel).expect("simulation runs");
    assert!(output.pollutants.final_step.contains_key("CO"));
    assert!(output.pollutants.final_step.contains_key("NO2"));
}
