//! The simulation driver: orchestrates grid construction, interpolation,
//! diffusion coefficients, and stepping into one pollutant-spread run,
//! and assembles the wire-format result.

#![forbid(unsafe_code)]

pub mod driver;
pub mod output;

pub use driver::run;
pub use output::{wind_speed_direction, EnvironmentOutput, GridOutput, PollutantsOutput, SimulationOutput};
