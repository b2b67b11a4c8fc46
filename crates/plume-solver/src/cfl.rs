//! CFL-stable time step computation.

use plume_core::constants::EPSILON;
use plume_core::DenseField;

/// Largest time step, in seconds, that keeps the explicit advection and
/// diffusion terms stable for the given wind and diffusion fields.
///
/// `dt = min(dx / (|u|_max + eps), dy / (|v|_max + eps),
///           dx^2 / (2*K_max + eps), dy^2 / (2*K_max + eps))`.
pub fn calculate_stable_dt(
    u: &DenseField,
    v: &DenseField,
    k_x: &DenseField,
    k_y: &DenseField,
    dx: f64,
    dy: f64,
) -> f64 {
    let u_max = u.max_abs();
    let v_max = v.max_abs();
    let k_max = k_x.max().max(k_y.max());

    let dt_advection_x = dx / (u_max + EPSILON);
    let dt_advection_y = dy / (v_max + EPSILON);
    let dt_diffusion_x = (dx * dx) / (2.0 * k_max + EPSILON);
    let dt_diffusion_y = (dy * dy) / (2.0 * k_max + EPSILON);

    dt_advection_x
        .min(dt_advection_y)
        .min(dt_diffusion_x)
        .min(dt_diffusion_y)
}
