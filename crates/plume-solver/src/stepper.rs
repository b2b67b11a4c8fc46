//! Crank–Nicolson advection-diffusion stepper.

use plume_core::constants::{STEPPER_MAX_ITER, STEPPER_TOLERANCE};
use plume_core::{DenseField, SimulationError};
use tracing::warn;

/// A padded flat buffer, `(nx+2) x (ny+2)`, row-major.
struct Padded {
    width: usize,
    values: Vec<f64>,
}

impl Padded {
    fn at(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.width + j]
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        self.values[i * self.width + j] = value;
    }
}

/// Zero-pad `field` by one cell on each side (used for `C` and the
/// source term).
fn pad_zero(field: &DenseField) -> Padded {
    let (nx, ny) = (field.nx(), field.ny());
    let width = ny + 2;
    let mut values = vec![0.0; (nx + 2) * width];
    for i in 0..nx {
        for j in 0..ny {
            values[(i + 1) * width + (j + 1)] = field.at(i, j);
        }
    }
    Padded { width, values }
}

/// Edge-extend `field` by one cell on each side (used for `K`, `u`, `v`).
fn pad_edge(field: &DenseField) -> Padded {
    let (nx, ny) = (field.nx(), field.ny());
    let width = ny + 2;
    let mut values = vec![0.0; (nx + 2) * width];
    for i in 0..nx {
        for j in 0..ny {
            values[(i + 1) * width + (j + 1)] = field.at(i, j);
        }
    }
    let mut padded = Padded { width, values };

    // Replicate interior edge rows/cols outward, then corners.
    for j in 1..=ny {
        let top = padded.at(1, j);
        let bottom = padded.at(nx, j);
        padded.set(0, j, top);
        padded.set(nx + 1, j, bottom);
    }
    for i in 0..nx + 2 {
        let left = padded.at(i, 1);
        let right = padded.at(i, ny);
        padded.set(i, 0, left);
        padded.set(i, ny + 1, right);
    }
    padded
}

/// Inputs to one [`step`] call.
pub struct StepInputs<'a> {
    /// Current concentration field.
    pub c: &'a DenseField,
    /// Wind x-component, m/s.
    pub u: &'a DenseField,
    /// Wind y-component, m/s.
    pub v: &'a DenseField,
    /// Diffusion coefficient along x, m^2/s (already cell-scaled).
    pub k_x: &'a DenseField,
    /// Diffusion coefficient along y, m^2/s (already cell-scaled, equals `k_x`).
    pub k_y: &'a DenseField,
    /// Cell size along x, meters.
    pub dx: f64,
    /// Cell size along y, meters.
    pub dy: f64,
    /// Time step, seconds.
    pub dt: f64,
    /// Per-cell emission source, concentration-units/s.
    pub source: &'a DenseField,
    /// Exponential decay rate, per hour.
    pub decay_rate: f64,
}

/// Advance `C` by one Crank–Nicolson time step with upwind advection,
/// Picard iteration, decay, and emission.
///
/// Pads, iterates the implicit right-hand side to convergence (or
/// [`STEPPER_MAX_ITER`] iterations), trims the border, and returns the
/// new interior field. Returns
/// [`SimulationError::NonFiniteConcentration`] if any interior cell is
/// non-finite after trimming — the caller is expected to treat this as a
/// fatal, potentially dt-reducible, instability.
pub fn step(
    inputs: &StepInputs<'_>,
    pollutant: &str,
    step_index: usize,
) -> Result<DenseField, SimulationError> {
    let nx = inputs.c.nx();
    let ny = inputs.c.ny();

    let c = pad_zero(inputs.c);
    let source = pad_zero(inputs.source);
    let k_x = pad_edge(inputs.k_x);
    let k_y = pad_edge(inputs.k_y);
    let u = pad_edge(inputs.u);
    let v = pad_edge(inputs.v);

    let decay_factor = (-inputs.decay_rate * inputs.dt / 3600.0).exp();
    let width = ny + 2;
    let mut c_new = Padded {
        width,
        values: c.values.clone(),
    };

    let mut converged = false;
    for _iter in 0..STEPPER_MAX_ITER {
        let c_prev = Padded {
            width,
            values: c_new.values.clone(),
        };

        let mut max_diff = 0.0_f64;

        for i in 1..=nx {
            for j in 1..=ny {
                let u_ij = u.at(i, j);
                let v_ij = v.at(i, j);

                let conv_x_n = if u_ij > 0.0 {
                    -u_ij * (c.at(i, j) - c.at(i - 1, j)) / inputs.dx
                } else {
                    -u_ij * (c.at(i + 1, j) - c.at(i, j)) / inputs.dx
                };
                let conv_y_n = if v_ij > 0.0 {
                    -v_ij * (c.at(i, j) - c.at(i, j - 1)) / inputs.dy
                } else {
                    -v_ij * (c.at(i, j + 1) - c.at(i, j)) / inputs.dy
                };

                let conv_x_np1 = if u_ij > 0.0 {
                    -u_ij * (c_prev.at(i, j) - c_prev.at(i - 1, j)) / inputs.dx
                } else {
                    -u_ij * (c_prev.at(i + 1, j) - c_prev.at(i, j)) / inputs.dx
                };
                let conv_y_np1 = if v_ij > 0.0 {
                    -v_ij * (c_prev.at(i, j) - c_prev.at(i, j - 1)) / inputs.dy
                } else {
                    -v_ij * (c_prev.at(i, j + 1) - c_prev.at(i, j)) / inputs.dy
                };

                let kx_ij = k_x.at(i, j);
                let ky_ij = k_y.at(i, j);

                let diff_x_n = kx_ij
                    * ((c.at(i + 1, j) - c.at(i, j)) - (c.at(i, j) - c.at(i - 1, j)))
                    / (inputs.dx * inputs.dx);
                let diff_y_n = ky_ij
                    * ((c.at(i, j + 1) - c.at(i, j)) - (c.at(i, j) - c.at(i, j - 1)))
                    / (inputs.dy * inputs.dy);

                let diff_x_np1 = kx_ij
                    * ((c_prev.at(i + 1, j) - c_prev.at(i, j))
                        - (c_prev.at(i, j) - c_prev.at(i - 1, j)))
                    / (inputs.dx * inputs.dx);
                let diff_y_np1 = ky_ij
                    * ((c_prev.at(i, j + 1) - c_prev.at(i, j))
                        - (c_prev.at(i, j) - c_prev.at(i, j - 1)))
                    / (inputs.dy * inputs.dy);

                let conv_x = 0.5 * (conv_x_n + conv_x_np1);
                let conv_y = 0.5 * (conv_y_n + conv_y_np1);
                let diff_x = 0.5 * (diff_x_n + diff_x_np1);
                let diff_y = 0.5 * (diff_y_n + diff_y_np1);

                let source_ij = source.at(i, j);

                let mut updated = c.at(i, j) + inputs.dt * (conv_x + conv_y + diff_x + diff_y);
                updated = updated * decay_factor + source_ij * inputs.dt;

                let diff = (updated - c_prev.at(i, j)).abs();
                if diff > max_diff {
                    max_diff = diff;
                }

                c_new.set(i, j, updated);
            }
        }

        if max_diff < STEPPER_TOLERANCE {
            converged = true;
            break;
        }
    }

    if !converged {
        warn!(pollutant, step_index, STEPPER_MAX_ITER, "Picard iteration did not converge within the iteration cap");
    }

    let mut out = vec![0.0; nx * ny];
    for i in 0..nx {
        for j in 0..ny {
            let value = c_new.at(i + 1, j + 1);
            if !value.is_finite() {
                return Err(SimulationError::NonFiniteConcentration {
                    pollutant: pollutant.to_string(),
                    cell: i * ny + j,
                    step: step_index,
                });
            }
            out[i * ny + j] = value;
        }
    }

    Ok(DenseField::from_flat(nx, ny, out))
}
