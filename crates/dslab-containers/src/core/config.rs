//! Simulation configuration and config value parsing.

pub mod options;
pub mod sim_config;

pub use sim_config::{ConfigError, FileConfig, HostConfig, SimulationConfig};
