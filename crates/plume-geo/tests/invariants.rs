//! Property tests for interpolation's core invariants: known values
//! are preserved, the result is fully dense, and the process terminates.

use plume_core::SparseField;
use plume_geo::fill;
use proptest::prelude::*;

fn arb_shape() -> impl Strategy<Value = (usize, usize)> {
    (1usize..8, 1usize..8)
}

proptest! {
    /// Invariant 2: for any sparse field with at least one known cell
    /// and `initial_distance >= 1`, interpolation terminates with no
    /// remaining unknowns.
    #[test]
    fn interpolation_always_terminates_fully_dense(
        (nx, ny) in arb_shape(),
        known_idx in 0usize..64,
        known_value in -100.0f64..100.0,
        initial_distance in 1usize..4,
        increment in 1usize..3,
    ) {
        let known_idx = known_idx % (nx * ny);
        let mut field = SparseField::empty(nx, ny);
        field.bin(known_idx, known_value);

        let dense = fill(field, initial_distance, increment, "prop").unwrap();
        prop_assert!(dense.as_slice().iter().all(|v| v.is_finite()));
        prop_assert_eq!(dense.as_slice().len(), nx * ny);
    }

    /// Invariant 3: a cell that starts known keeps its exact value after
    /// interpolation (self-weight is never applied).
    #[test]
    fn known_cells_are_never_overwritten(
        (nx, ny) in arb_shape(),
        known_idx in 0usize..64,
        other_idx in 0usize..64,
        v1 in -50.0f64..50.0,
        v2 in -50.0f64..50.0,
        initial_distance in 1usize..4,
    ) {
        let known_idx = known_idx % (nx * ny);
        let other_idx = other_idx % (nx * ny);
        prop_assume!(known_idx != other_idx);

        let mut field = SparseField::empty(nx, ny);
        field.bin(known_idx, v1);
        field.bin(other_idx, v2);

        let dense = fill(field, initial_distance, 1, "prop").unwrap();
        prop_assert_eq!(dense.as_slice()[known_idx], v1);
        prop_assert_eq!(dense.as_slice()[other_idx], v2);
    }
}
