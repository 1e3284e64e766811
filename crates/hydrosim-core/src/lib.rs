//! ---
//! hydro_section: "01-core-functionality"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Primary orchestration and lifecycle management."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
//! Fleet orchestration for the HydroSim simulator.
//!
//! One [`device::DeviceRunner`] per configured profile, each driving its own
//! generate -> frame -> publish tick loop over an exclusively owned transport
//! connection. The [`fleet::FleetCoordinator`] spawns the runners and manages
//! their cooperative shutdown.

pub mod device;
pub mod fleet;
pub mod runtime;

pub use device::{DeviceProfile, DeviceRunner};
pub use fleet::{
    FleetCoordinator, FleetHandle, MemoryTransportFactory, MqttTransportFactory, TransportFactory,
};
pub use runtime::RateLimiter;
