//! Diffusion coefficients and the Crank-Nicolson advection-diffusion
//! stepper.

#![forbid(unsafe_code)]

pub mod cfl;
pub mod diffusion;
pub mod stepper;

pub use cfl::calculate_stable_dt;
pub use diffusion::{diffusion_coefficients, molecular, scale_by_cell_size, turbulent, DiffusionMethod};
pub use stepper::{step, StepInputs};
