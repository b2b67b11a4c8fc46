//! Job handles and outcomes: `completed`/`failed`/`timeExceeded`.

use plume_core::{ErrorKind, SimulationError};
use plume_sim::SimulationOutput;

/// The terminal result of a job, matching the wire status values.
#[derive(Debug)]
pub enum JobOutcome {
    /// The simulation produced a full result.
    Completed(SimulationOutput),
    /// Validation or solver failure; no partial result is carried.
    Failed(SimulationError),
    /// The job exceeded its wall-clock budget and was cancelled.
    TimeExceeded,
}

impl JobOutcome {
    /// The wire status string for this outcome.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::TimeExceeded => "timeExceeded",
        }
    }

    /// Build an outcome from a driver result, mapping cooperative
    /// cancellation to [`JobOutcome::TimeExceeded`] and every other
    /// error to [`JobOutcome::Failed`]. A cancellation observed here is
    /// always timeout-driven; shutdown-driven cancellation is handled by
    /// the pool discarding the reply entirely.
    pub fn from_driver_result(result: Result<SimulationOutput, SimulationError>) -> Self {
        match result {
            Ok(output) => Self::Completed(output),
            Err(SimulationError::Cancelled) => Self::TimeExceeded,
            Err(other) => Self::Failed(other),
        }
    }

    /// Whether this outcome originated from a request-shaped problem
    /// (malformed/validation) versus an internal solver failure.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Failed(err) => Some(err.kind()),
            _ => None,
        }
    }
}
