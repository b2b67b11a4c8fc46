//! Multi-pass weighted neighborhood interpolation.

use std::collections::BTreeMap;

use plume_core::{DenseField, SimulationError, SparseField};

/// Chebyshev (chessboard) distance between two cells.
pub fn chessboard_distance(i1: usize, j1: usize, i2: usize, j2: usize) -> usize {
    let di = i1.abs_diff(i2);
    let dj = j1.abs_diff(j2);
    di.max(dj)
}

/// Run one weighted-interpolation pass at Chebyshev distance `distance`
/// over `field`, returning a new field with every cell reachable in this
/// pass filled in.
///
/// Every **known** cell contributes `value * weight` to every **unknown**
/// neighbor within `distance`, with `weight = 1 / (1 + dist^2)`; touched
/// unknowns become the accumulated weighted average. Cells untouched
/// this pass remain unknown for the next.
pub fn interpolation_pass(field: &SparseField, distance: usize) -> SparseField {
    let nx = field.nx();
    let ny = field.ny();
    let effective_distance = distance.max(1).min(nx.max(ny));

    let mut out = field.clone();
    let mut accum: BTreeMap<usize, (f64, f64)> = BTreeMap::new();

    for i in 0..nx {
        for j in 0..ny {
            let idx = field.index(i, j);
            let Some(value) = field.get(idx) else {
                continue;
            };

            let i_lo = i.saturating_sub(effective_distance);
            let i_hi = (i + effective_distance).min(nx - 1);
            let j_lo = j.saturating_sub(effective_distance);
            let j_hi = (j + effective_distance).min(ny - 1);

            for ni in i_lo..=i_hi {
                for nj in j_lo..=j_hi {
                    if ni == i && nj == j {
                        continue;
                    }
                    let dist = chessboard_distance(i, j, ni, nj);
                    if dist > effective_distance {
                        continue;
                    }
                    let nidx = field.index(ni, nj);
                    if field.get(nidx).is_some() {
                        continue;
                    }
                    let weight = 1.0 / (1.0 + (dist * dist) as f64);
                    let entry = accum.entry(nidx).or_insert((0.0, 0.0));
                    entry.0 += value * weight;
                    entry.1 += weight;
                }
            }
        }
    }

    for (idx, (sum, weight_sum)) in accum {
        out.as_mut_slice()[idx] = Some(sum / weight_sum);
    }

    out
}

/// Repeatedly apply [`interpolation_pass`] with a growing distance until
/// `field` is fully dense.
///
/// Fails with [`SimulationError::NoKnownCells`] if `field` starts with no
/// known cells at all, since no pass could ever make progress.
pub fn fill(
    field: SparseField,
    initial_distance: usize,
    increment: usize,
    field_name: &str,
) -> Result<DenseField, SimulationError> {
    if field.unknown_count() == field.nx() * field.ny() {
        return Err(SimulationError::NoKnownCells {
            field: field_name.to_string(),
        });
    }

    let mut current = field;
    let mut distance = initial_distance.max(1);
    while !current.is_dense() {
        current = interpolation_pass(&current, distance);
        distance += increment.max(1);
    }

    Ok(current
        .into_dense()
        .expect("loop invariant: current.is_dense() was just checked"))
}

/// Fill every field in `fields` in lockstep, incrementing a single shared
/// distance across all of them each pass.
pub fn fill_all(
    fields: BTreeMap<String, SparseField>,
    initial_distance: usize,
    increment: usize,
) -> Result<BTreeMap<String, DenseField>, SimulationError> {
    for (name, field) in &fields {
        if field.unknown_count() == field.nx() * field.ny() {
            return Err(SimulationError::NoKnownCells {
                field: name.clone(),
            });
        }
    }

    let mut current = fields;
    let mut distance = initial_distance.max(1);
    loop {
        if current.values().all(SparseField::is_dense) {
            break;
        }
        for field in current.values_mut() {
            if !field.is_dense() {
                *field = interpolation_pass(field, distance);
            }
        }
        distance += increment.max(1);
    }

    let mut dense = BTreeMap::new();
    for (name, field) in current {
        dense.insert(
            name,
            field
                .into_dense()
                .expect("loop invariant: all fields dense before exit"),
        );
    }
    Ok(dense)
}
