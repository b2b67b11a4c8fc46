//! Fixed-size worker pool isolating simulation jobs from the broker's
//! I/O loop.

#![forbid(unsafe_code)]

pub mod job;
pub mod pool;

pub use job::JobOutcome;
pub use pool::{JobHandle, WorkerPool};
