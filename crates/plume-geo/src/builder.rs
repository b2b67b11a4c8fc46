//! Grid construction from irregular sampling points.

use std::collections::BTreeMap;

use plume_core::constants::MAX_CELLS;
use plume_core::{CellBounds, Grid, GridDensity, Measurement, SimulationError, SparseField};

/// Names for the non-pollutant fields binned alongside pollutants.
pub const TEMPERATURE: &str = "temperature";
pub const PRESSURE: &str = "pressure";
pub const WIND_U: &str = "u";
pub const WIND_V: &str = "v";

/// Build a uniform grid from `measurements` and bin every requested
/// quantity into it.
///
/// Returns the dense geometry plus one [`SparseField`] per quantity:
/// `"temperature"`, `"pressure"`, `"u"`, `"v"`, and each pollutant in
/// `pollutants`. Fields are not yet interpolated — see
/// [`crate::interpolate`].
pub fn build_grid(
    measurements: &[Measurement],
    pollutants: &[String],
    density: GridDensity,
    urbanized: bool,
    margin_boxes: usize,
) -> Result<(Grid, BTreeMap<String, SparseField>), SimulationError> {
    if measurements.is_empty() {
        return Err(SimulationError::EmptyMeasurements);
    }

    let lat_min = measurements
        .iter()
        .map(|m| m.latitude)
        .fold(f64::INFINITY, f64::min);
    let lat_max = measurements
        .iter()
        .map(|m| m.latitude)
        .fold(f64::NEG_INFINITY, f64::max);
    let lon_min = measurements
        .iter()
        .map(|m| m.longitude)
        .fold(f64::INFINITY, f64::min);
    let lon_max = measurements
        .iter()
        .map(|m| m.longitude)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut target = density.target_cells();
    if urbanized {
        target *= 2.0;
    }

    let total_area = (lat_max - lat_min) * (lon_max - lon_min);
    let s = (total_area / target).sqrt();
    if !s.is_finite() || s <= 0.0 {
        return Err(SimulationError::InvalidJob(
            "degenerate measurement bounding box (all points coincide)".to_string(),
        ));
    }

    let margin = margin_boxes as f64 * s;
    let lat_min = lat_min - margin;
    let lat_max = lat_max + margin;
    let lon_min = lon_min - margin;
    let lon_max = lon_max + margin;

    let nx = ((lat_max - lat_min) / s).ceil() as usize;
    let ny = ((lon_max - lon_min) / s).ceil() as usize;
    let total = nx * ny;
    if total > MAX_CELLS {
        return Err(SimulationError::GridTooLarge {
            nx,
            ny,
            total,
            max: MAX_CELLS,
        });
    }

    let mut cells = Vec::with_capacity(total);
    for i in 0..nx {
        for j in 0..ny {
            cells.push(CellBounds {
                lat_min: lat_min + i as f64 * s,
                lat_max: lat_min + (i + 1) as f64 * s,
                lon_min: lon_min + j as f64 * s,
                lon_max: lon_min + (j + 1) as f64 * s,
            });
        }
    }

    let grid = Grid {
        nx,
        ny,
        cell_lat: s,
        cell_lon: s,
        lat_min,
        lon_min,
        cells,
    };

    let mut fields: BTreeMap<String, SparseField> = BTreeMap::new();
    fields.insert(TEMPERATURE.to_string(), SparseField::empty(nx, ny));
    fields.insert(PRESSURE.to_string(), SparseField::empty(nx, ny));
    fields.insert(WIND_U.to_string(), SparseField::empty(nx, ny));
    fields.insert(WIND_V.to_string(), SparseField::empty(nx, ny));
    for pollutant in pollutants {
        fields
            .entry(pollutant.clone())
            .or_insert_with(|| SparseField::empty(nx, ny));
    }

    for m in measurements {
        let Some((i, j)) = grid.locate(m.latitude, m.longitude) else {
            tracing::warn!(
                measurement_id = m.id,
                lat = m.latitude,
                lon = m.longitude,
                "measurement fell outside derived grid bounds; dropped"
            );
            continue;
        };
        let idx = grid.index(i, j);
        let (u, v) = m.wind_components();

        fields.get_mut(TEMPERATURE).unwrap().bin(idx, m.temperature);
        fields.get_mut(PRESSURE).unwrap().bin(idx, m.pressure);
        fields.get_mut(WIND_U).unwrap().bin(idx, u);
        fields.get_mut(WIND_V).unwrap().bin(idx, v);
        for pollutant in pollutants {
            if let Some(value) = m.pollutant(pollutant) {
                fields.get_mut(pollutant).unwrap().bin(idx, value);
            }
        }
    }

    tracing::debug!(nx, ny, total, "grid constructed");

    Ok((grid, fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    fn point(id: i64, lat: f64, lon: f64, co: f64) -> Measurement {
        Measurement {
            id,
            name: format!("p{id}"),
            latitude: lat,
            longitude: lon,
            temperature: 20.0,
            wind_speed: 1.0,
            wind_direction: 90.0,
            pressure: 101_325.0,
            flight_id: 1,
            pollutants: Map::from([("CO".to_string(), co)]),
        }
    }

    #[test]
    fn grid_count_matches_formula() {
        let points = vec![point(1, 50.0, 19.9, 100.0), point(2, 50.01, 19.91, 200.0)];
        let (grid, _) = build_grid(
            &points,
            &["CO".to_string()],
            GridDensity::Medium,
            false,
            1,
        )
        .expect("build ok");
        assert_eq!(grid.cell_count(), grid.nx * grid.ny);
        assert!(grid.nx > 0 && grid.ny > 0);
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let points = vec![point(1, 0.0, 0.0, 1.0), point(2, 50.0, 50.0, 2.0)];
        let err = build_grid(
            &points,
            &["CO".to_string()],
            GridDensity::Dense,
            true,
            1,
        )
        .expect_err("must exceed MAX_CELLS");
        assert!(matches!(err, SimulationError::GridTooLarge { .. }));
    }

    #[test]
    fn running_pairwise_average_matches_bin_semantics() {
        // Two measurements at the exact same coordinates fall in the same
        // cell regardless of cell size; a third distant point keeps the
        // bounding box non-degenerate.
        let points = vec![
            point(1, 50.0, 19.9, 10.0),
            point(2, 50.0, 19.9, 20.0),
            point(3, 51.0, 20.9, 5.0),
        ];
        let (grid, fields) = build_grid(
            &points,
            &["CO".to_string()],
            GridDensity::Sparse,
            false,
            0,
        )
        .expect("build ok");
        let idx = grid
            .locate(50.0, 19.9)
            .map(|(i, j)| grid.index(i, j))
            .unwrap();
        // Both points bin into the same cell: (10+20)/2 = 15.
        assert_eq!(fields["CO"].get(idx), Some(15.0));
    }
}
