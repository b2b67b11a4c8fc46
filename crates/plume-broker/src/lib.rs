#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod supervisor;

pub use client::{run, BrokerState};
pub use config::{BrokerConfig, ConfigError};
pub use error::BrokerError;
pub use message::{SimulationRequest, SimulationResponse};
pub use supervisor::Supervisor;
