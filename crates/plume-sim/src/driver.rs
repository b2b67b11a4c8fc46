//! Orchestrates grid construction, interpolation, diffusion, and
//! stepping for one job, per pollutant.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use plume_core::constants::{SURFACE_ROUGHNESS_RURAL, SURFACE_ROUGHNESS_URBAN};
use plume_core::{DenseField, Grid, SimulationError, SimulationJob, SparseField};
use plume_geo::{build_grid, fill_all, PRESSURE, TEMPERATURE, WIND_U, WIND_V};
use plume_solver::{calculate_stable_dt, diffusion_coefficients, scale_by_cell_size, step, DiffusionMethod, StepInputs};
use tracing::debug;

use crate::output::{wind_speed_direction, EnvironmentOutput, GridOutput, PollutantsOutput, SimulationOutput};

/// Build the fixed per-step emission source field for one pollutant:
/// nonzero only on cells that held an **original** measurement, with a
/// value that reproduces `C0*(1 - e^{-r*dt/3600})` concentration
/// injected per step at that cell.
fn emission_field(
    original: &SparseField,
    interpolated: &DenseField,
    dt: f64,
    emission_rate: f64,
) -> DenseField {
    let emission_factor = 1.0 - (-emission_rate * dt / 3600.0).exp();
    let mut values = vec![0.0; original.nx() * original.ny()];
    for (idx, slot) in original.as_slice().iter().enumerate() {
        if slot.is_some() {
            let c0 = interpolated.as_slice()[idx];
            values[idx] = (c0 * emission_factor) / dt;
        }
    }
    DenseField::from_flat(original.nx(), original.ny(), values)
}

/// Run the full simulation for `job`, checking `cancel` at each step
/// boundary so both shutdown and timeout enforcement can interrupt a
/// run cooperatively.
pub fn run(job: &SimulationJob, cancel: &AtomicBool) -> Result<SimulationOutput, SimulationError> {
    job.validate()?;

    let (grid, sparse_fields) = build_grid(
        &job.measurements,
        &job.pollutants,
        job.grid_density,
        job.urbanized,
        job.margin_boxes,
    )?;

    let originals: BTreeMap<String, SparseField> = job
        .pollutants
        .iter()
        .map(|p| (p.clone(), sparse_fields[p].clone()))
        .collect();

    let dense = fill_all(sparse_fields, job.initial_distance, 1)?;
    let temperature = dense[TEMPERATURE].clone();
    let pressure = dense[PRESSURE].clone();
    let u = dense[WIND_U].clone();
    let v = dense[WIND_V].clone();

    let (dx, dy) = grid.mean_cell_size_meters();
    let surface_roughness = if job.urbanized {
        SURFACE_ROUGHNESS_URBAN
    } else {
        SURFACE_ROUGHNESS_RURAL
    };
    let cell_size = dx.min(dy);

    debug!(
        nx = grid.cells.len(),
        dx, dy, urbanized = job.urbanized, "grid ready for stepping"
    );

    let mut steps: BTreeMap<String, BTreeMap<String, Vec<f64>>> = BTreeMap::new();
    let mut final_step: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for pollutant in &job.pollutants {
        if cancel.load(Ordering::Relaxed) {
            return Err(SimulationError::Cancelled);
        }

        let mut concentration = dense[pollutant].clone();

        // An "empirical" coefficient selection was never reachable in
        // practice, since only molecular and turbulent models exist; this
        // driver always takes the turbulent path.
        let base_k =
            diffusion_coefficients(DiffusionMethod::Turbulent, pollutant, &temperature, &u, &v, surface_roughness)?;
        let k_x = scale_by_cell_size(base_k, cell_size);
        let k_y = k_x.clone();

        let dt = calculate_stable_dt(&u, &v, &k_x, &k_y, dx, dy).min(1.0);
        debug!(pollutant, dt, num_steps = job.num_steps, "starting stepping loop");

        let source = emission_field(&originals[pollutant], &concentration, dt, job.emission_rate);

        let mut pollutant_steps: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        pollutant_steps.insert("0".to_string(), concentration.as_slice().to_vec());

        for step_index in 1..=job.num_steps {
            if cancel.load(Ordering::Relaxed) {
                return Err(SimulationError::Cancelled);
            }

            let inputs = StepInputs {
                c: &concentration,
                u: &u,
                v: &v,
                k_x: &k_x,
                k_y: &k_y,
                dx,
                dy,
                dt,
                source: &source,
                decay_rate: job.decay_rate,
            };
            concentration = step(&inputs, pollutant, step_index)?;

            if step_index % job.snap_interval == 0 {
                pollutant_steps.insert(step_index.to_string(), concentration.as_slice().to_vec());
            }
        }

        steps.insert(pollutant.clone(), pollutant_steps);
        final_step.insert(pollutant.clone(), concentration.into_vec());
    }

    Ok(assemble_output(&grid, steps, final_step, &temperature, &pressure, &u, &v))
}

fn assemble_output(
    grid: &Grid,
    steps: BTreeMap<String, BTreeMap<String, Vec<f64>>>,
    final_step: BTreeMap<String, Vec<f64>>,
    temperature: &DenseField,
    pressure: &DenseField,
    u: &DenseField,
    v: &DenseField,
) -> SimulationOutput {
    let n = u.as_slice().len();
    let mut wind_speed = Vec::with_capacity(n);
    let mut wind_direction = Vec::with_capacity(n);
    for i in 0..n {
        let (speed, dir) = wind_speed_direction(u.as_slice()[i], v.as_slice()[i]);
        wind_speed.push(speed);
        wind_direction.push(dir);
    }

    // `steps` is keyed per pollutant; re-shape into "step index -> {pollutant: values}".
    let mut by_step: BTreeMap<usize, BTreeMap<String, Vec<f64>>> = BTreeMap::new();
    for (pollutant, pollutant_steps) in steps {
        for (step_key, values) in pollutant_steps {
            let step_index: usize = step_key.parse().expect("step keys are step indices");
            by_step
                .entry(step_index)
                .or_default()
                .insert(pollutant.clone(), values);
        }
    }
    let steps_out: BTreeMap<String, BTreeMap<String, Vec<f64>>> = by_step
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

    SimulationOutput {
        grid: GridOutput {
            boxes: grid.cells.clone(),
        },
        pollutants: PollutantsOutput {
            steps: steps_out,
            final_step,
        },
        environment: EnvironmentOutput {
            temperature: temperature.as_slice().to_vec(),
            pressure: pressure.as_slice().to_vec(),
            wind_speed,
            wind_direction,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_core::{GridDensity, Measurement};
    use std::collections::BTreeMap as Map;

    fn measurement(id: i64, lat: f64, lon: f64, co: f64) -> Measurement {
        Measurement {
            id,
            name: format!("p{id}"),
            latitude: lat,
            longitude: lon,
            temperature: 20.0,
            wind_speed: 0.0,
            wind_direction: 0.0,
            pressure: 101_325.0,
            flight_id: 1,
            pollutants: Map::from([("CO".to_string(), co)]),
        }
    }

    fn base_job() -> SimulationJob {
        SimulationJob {
            measurements: vec![
                measurement(1, 50.0, 19.9, 1000.0),
                measurement(2, 50.05, 19.95, 10.0),
            ],
            num_steps: 3,
            pollutants: vec!["CO".to_string()],
            grid_density: GridDensity::Sparse,
            urbanized: false,
            margin_boxes: 1,
            initial_distance: 1,
            decay_rate: 0.01,
            emission_rate: 0.01,
            snap_interval: 1,
        }
    }

    #[test]
    fn runs_end_to_end_and_produces_final_step_for_each_pollutant() {
        let job = base_job();
        let cancel = AtomicBool::new(false);
        let output = run(&job, &cancel).expect("simulation runs");
        assert!(output.pollutants.final_step.contains_key("CO"));
        assert_eq!(
            output.pollutants.final_step["CO"].len(),
            output.grid.boxes.len()
        );
        assert!(output.pollutants.steps.contains_key("0"));
    }

    #[test]
    fn grid_too_large_is_rejected() {
        let mut job = base_job();
        job.grid_density = GridDensity::Dense;
        job.urbanized = true;
        job.measurements = vec![
            measurement(1, 0.0, 0.0, 1000.0),
            measurement(2, 50.0, 50.0, 10.0),
        ];
        let cancel = AtomicBool::new(false);
        let err = run(&job, &cancel).expect_err("must exceed MAX_CELLS");
        assert!(matches!(err, SimulationError::GridTooLarge { .. }));
    }

    #[test]
    fn cancellation_flag_stops_the_loop() {
        let job = base_job();
        let cancel = AtomicBool::new(true);
        let err = run(&job, &cancel).expect_err("must observe cancellation");
        assert_eq!(err, SimulationError::Cancelled);
    }
}
