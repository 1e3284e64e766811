//! ---
//! hydro_section: "01-core-functionality"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Shared primitives and utilities for the simulator runtime."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
//! Core shared primitives for the HydroSim workspace.
//! This crate exposes configuration loading, logging bootstrap, and time
//! utilities consumed across the workspace.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    AppConfig, BrokerConfig, DeviceConfig, LoggingConfig, ProtocolConfig, QosLevel, RainConfig,
    SimulationConfig,
};
pub use logging::{init_tracing, LogFormat};
pub use time::unix_timestamp_ms;
