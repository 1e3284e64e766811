//! ---
//! hydro_section: "11-simulation"
//! hydro_subsection: "01-bootstrap"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Simulation runtime module exports and shared types."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
//! Synthetic water-level telemetry for the HydroSim project.
//!
//! Each simulated device owns one [`WaveformGenerator`], seeded from its
//! fleet index so that concurrently running devices never emit identical
//! traces. The generator drives a [`rain::RainEvent`] sub-state machine that
//! perturbs the level trajectory with bounded storm surges.

pub mod generator;
pub mod rain;
pub mod reading;

pub use generator::WaveformGenerator;
pub use rain::{RainEvent, RainState};
pub use reading::{DeviceStatus, SensorReading};
