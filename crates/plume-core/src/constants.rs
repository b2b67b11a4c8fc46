//! Physical and operational constants shared across the simulation pipeline.

/// Hard cap on `nx * ny` for any job's grid.
pub const MAX_CELLS: usize = 5000;

/// Pollutants with a built-in molecular diffusion coefficient table.
/// Jobs may request additional pollutant names; they are only rejected
/// if the molecular diffusion method is selected for an unlisted one.
pub const BUILTIN_POLLUTANTS: [&str; 4] = ["CO", "NO2", "SO2", "O3"];

/// Von Kármán constant used by the turbulent (Monin–Obukhov, neutral)
/// diffusion model.
pub const VON_KARMAN: f64 = 0.4;

/// Reference height (m) for turbulent diffusion.
pub const REFERENCE_HEIGHT_M: f64 = 10.0;

/// Surface roughness length (m) for rural terrain.
pub const SURFACE_ROUGHNESS_RURAL: f64 = 0.1;

/// Surface roughness length (m) for urbanized terrain.
pub const SURFACE_ROUGHNESS_URBAN: f64 = 1.0;

/// Degrees-of-latitude to meters conversion factor.
pub const DEG_LAT_TO_METERS: f64 = 111_320.0;

/// Small epsilon guard against division by zero in CFL and diffusion math.
pub const EPSILON: f64 = 1e-10;

/// Picard iteration cap for the Crank–Nicolson stepper.
pub const STEPPER_MAX_ITER: usize = 20;

/// Picard iteration convergence tolerance.
pub const STEPPER_TOLERANCE: f64 = 1e-4;

/// Molecular diffusion coefficients per pollutant: `(D0 [cm^2/s], exponent)`.
///
/// Empirical `D0`/exponent pairs for the built-in pollutant table.
pub fn molecular_coefficients(pollutant: &str) -> Option<(f64, f64)> {
    match pollutant {
        "CO" => Some((0.16, 1.75)),
        "NO2" => Some((0.14, 1.76)),
        "SO2" => Some((0.15, 1.78)),
        "O3" => Some((0.11, 1.82)),
        _ => None,
    }
}
