//! Error types for the simulation pipeline.
//!
//! One enum scoped to the whole grid-build/interpolate/step pipeline;
//! every variant maps to the same `failed` wire status at the broker
//! layer, so there is no value in splitting it per subsystem.

use std::fmt;

/// Errors raised while building, filling, or stepping a simulation grid.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// The job carried no measurements.
    #[error("job has no measurements")]
    EmptyMeasurements,

    /// `nx * ny` exceeded `MAX_CELLS`.
    #[error("grid exceeds maximum cell count: {nx} x {ny} = {total} > {max}")]
    GridTooLarge {
        /// Computed grid width.
        nx: usize,
        /// Computed grid height.
        ny: usize,
        /// `nx * ny`.
        total: usize,
        /// The configured cap.
        max: usize,
    },

    /// A measurement was missing a value for a pollutant the job requested.
    #[error("measurement {measurement_id} is missing pollutant '{pollutant}'")]
    MissingPollutantField {
        /// The offending measurement's id.
        measurement_id: i64,
        /// The pollutant name that was absent.
        pollutant: String,
    },

    /// A sparse field had no known cells at all, so interpolation could
    /// never terminate.
    #[error("field '{field}' has no known cells to interpolate from")]
    NoKnownCells {
        /// Name of the field (e.g. `"temperature"`, or a pollutant name).
        field: String,
    },

    /// A job-level invariant was violated (`num_steps >= 1`, rates
    /// non-negative, `initial_distance >= 1`).
    #[error("invalid job configuration: {0}")]
    InvalidJob(String),

    /// The molecular diffusion method was requested for a pollutant with
    /// no entry in the coefficient table.
    #[error("no molecular diffusion coefficients for pollutant '{0}'")]
    UnknownDiffusionPollutant(String),

    /// A step produced a non-finite concentration value, signaling
    /// numerical instability.
    #[error("non-finite concentration for pollutant '{pollutant}' at cell {cell} on step {step}")]
    NonFiniteConcentration {
        /// The pollutant whose field went unstable.
        pollutant: String,
        /// Flat row-major index of the offending cell.
        cell: usize,
        /// The step index at which it was detected.
        step: usize,
    },

    /// The job's cancellation flag was observed set at a step boundary.
    /// Carries no payload of its own — callers distinguish a
    /// timeout-driven cancellation from a shutdown-driven one by context,
    /// not by this variant.
    #[error("job cancelled at a step boundary")]
    Cancelled,
}

/// Lightweight machine-readable category, used by the broker layer to
/// decide whether a failure is "malformed payload"-shaped or an internal
/// simulation bug, without string-matching `Display` output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caused by the request itself (bad/empty input, grid too large).
    Validation,
    /// Caused by the solver during execution.
    Solver,
    /// Cooperative cancellation (shutdown or timeout), not a failure of
    /// the request itself.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Solver => write!(f, "solver"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl SimulationError {
    /// Classify the error for logging/metrics purposes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyMeasurements
            | Self::GridTooLarge { .. }
            | Self::MissingPollutantField { .. }
            | Self::InvalidJob(_)
            | Self::UnknownDiffusionPollutant(_) => ErrorKind::Validation,
            Self::NoKnownCells { .. } | Self::NonFiniteConcentration { .. } => ErrorKind::Solver,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}
