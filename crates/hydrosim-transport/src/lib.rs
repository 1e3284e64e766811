//! ---
//! hydro_section: "02-messaging-ipc-data-model"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Transport implementations for telemetry publishing."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
//! Transport layer for HydroSim telemetry.
//!
//! The simulator core only ever speaks to [`Transport`]: open an
//! authenticated connection, publish bytes to a named topic at a delivery
//! guarantee level, disconnect. The MQTT implementation lives in
//! [`mqtt::MqttTransport`]; [`memory::InMemoryTransport`] backs tests and
//! single-process integration.

pub mod memory;
pub mod mqtt;

use async_trait::async_trait;
use hydrosim_common::QosLevel;

/// Shared result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors raised by transport implementations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection establishment failed; the owning device run aborts.
    #[error("connect failed: {0}")]
    Connect(String),
    /// A single publish attempt failed; the tick loop continues.
    #[error("publish to '{topic}' failed: {reason}")]
    Publish { topic: String, reason: String },
    /// Disconnect did not complete cleanly.
    #[error("disconnect failed: {0}")]
    Disconnect(String),
}

/// Message registered with the broker at connect time and delivered by the
/// broker itself on abnormal disconnect.
#[derive(Debug, Clone)]
pub struct WillMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QosLevel,
    pub retain: bool,
}

/// Publish/subscribe client abstraction used by every device runner.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the authenticated connection.
    async fn connect(&mut self) -> Result<()>;

    /// Publish a byte payload to the named topic.
    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QosLevel, retain: bool)
        -> Result<()>;

    /// Close the connection, releasing any background resources.
    async fn disconnect(&mut self) -> Result<()>;

    /// Human-readable transport name for logging.
    fn name(&self) -> &'static str;
}

pub use memory::{InMemoryTransport, PublishRecord};
pub use mqtt::{MqttConfig, MqttTransport};
