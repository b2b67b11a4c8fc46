//! Per-cell diffusion coefficients.

use plume_core::constants::{molecular_coefficients, REFERENCE_HEIGHT_M, VON_KARMAN};
use plume_core::{DenseField, SimulationError};

/// Which diffusion model computes `K`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffusionMethod {
    /// Temperature-driven, per-pollutant empirical table.
    Molecular,
    /// Monin–Obukhov (neutral) wind-driven turbulence.
    Turbulent,
}

/// Molecular (temperature-driven) diffusion coefficient field, in m^2/s.
///
/// `K = (D0 / 1e4) * (T_K / 293.15)^exponent`, `T_K = T_C + 273.15`.
pub fn molecular(pollutant: &str, temperature_c: &DenseField) -> Result<DenseField, SimulationError> {
    let (d0, exponent) = molecular_coefficients(pollutant)
        .ok_or_else(|| SimulationError::UnknownDiffusionPollutant(pollutant.to_string()))?;
    let d0_si = d0 / 10_000.0;

    let values: Vec<f64> = temperature_c
        .as_slice()
        .iter()
        .map(|&t_c| {
            let t_k = t_c + 273.15;
            d0_si * (t_k / 293.15).powf(exponent)
        })
        .collect();

    Ok(DenseField::from_flat(
        temperature_c.nx(),
        temperature_c.ny(),
        values,
    ))
}

/// Turbulent (Monin–Obukhov, neutral) diffusion coefficient field, in m^2/s.
///
/// `u* = alpha * |V| / ln(z / z0)`, `K = alpha * u* * z`.
pub fn turbulent(u: &DenseField, v: &DenseField, surface_roughness: f64) -> DenseField {
    let values: Vec<f64> = u
        .as_slice()
        .iter()
        .zip(v.as_slice())
        .map(|(&uc, &vc)| {
            let speed = (uc * uc + vc * vc).sqrt();
            let u_star = (VON_KARMAN * speed) / (REFERENCE_HEIGHT_M / surface_roughness).ln();
            VON_KARMAN * u_star * REFERENCE_HEIGHT_M
        })
        .collect();

    DenseField::from_flat(u.nx(), u.ny(), values)
}

/// Compute the diffusion coefficient field for `method`, dispatching to
/// [`molecular`] or [`turbulent`] with whichever inputs that model needs.
pub fn diffusion_coefficients(
    method: DiffusionMethod,
    pollutant: &str,
    temperature_c: &DenseField,
    u: &DenseField,
    v: &DenseField,
    surface_roughness: f64,
) -> Result<DenseField, SimulationError> {
    match method {
        DiffusionMethod::Molecular => molecular(pollutant, temperature_c),
        DiffusionMethod::Turbulent => Ok(turbulent(u, v, surface_roughness)),
    }
}

/// Scale a base diffusion coefficient field by the cell side in meters.
///
/// The model applies the same `K` along both axes (`K_x = K_y`), so
/// callers clone the scaled result for both.
pub fn scale_by_cell_size(k: DenseField, cell_size_m: f64) -> DenseField {
    let values: Vec<f64> = k.as_slice().iter().map(|&v| v * cell_size_m).collect();
    DenseField::from_flat(k.nx(), k.ny(), values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn molecular_rejects_unknown_pollutant() {
        let t = DenseField::filled(1, 1, 20.0);
        let err = molecular("XYZ", &t).expect_err("must fail");
        assert!(matches!(err, SimulationError::UnknownDiffusionPollutant(_)));
    }

    #[test]
    fn molecular_increases_with_temperature() {
        let cold = DenseField::filled(1, 1, 0.0);
        let hot = DenseField::filled(1, 1, 40.0);
        let k_cold = molecular("CO", &cold).unwrap();
        let k_hot = molecular("CO", &hot).unwrap();
        assert!(k_hot.at(0, 0) > k_cold.at(0, 0));
    }

    #[test]
    fn turbulent_zero_wind_gives_zero_k() {
        let u = DenseField::filled(2, 2, 0.0);
        let v = DenseField::filled(2, 2, 0.0);
        let k = turbulent(&u, &v, 0.1);
        assert!(k.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn turbulent_scales_with_wind_speed() {
        let u_low = DenseField::filled(1, 1, 1.0);
        let v_low = DenseField::filled(1, 1, 0.0);
        let u_high = DenseField::filled(1, 1, 5.0);
        let v_high = DenseField::filled(1, 1, 0.0);
        let k_low = turbulent(&u_low, &v_low, 0.1);
        let k_high = turbulent(&u_high, &v_high, 0.1);
        assert!(k_high.at(0, 0) > k_low.at(0, 0));
    }

    #[test]
    fn dispatcher_selects_the_requested_method() {
        let t = DenseField::filled(1, 1, 20.0);
        let u = DenseField::filled(1, 1, 2.0);
        let v = DenseField::filled(1, 1, 0.0);

        let molecular_k =
            diffusion_coefficients(DiffusionMethod::Molecular, "CO", &t, &u, &v, 0.1).unwrap();
        let turbulent_k =
            diffusion_coefficients(DiffusionMethod::Turbulent, "CO", &t, &u, &v, 0.1).unwrap();

        assert_eq!(molecular_k.at(0, 0), molecular("CO", &t).unwrap().at(0, 0));
        assert_eq!(turbulent_k.at(0, 0), turbulent(&u, &v, 0.1).at(0, 0));
    }
}
