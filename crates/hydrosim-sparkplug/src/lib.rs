//! ---
//! hydro_section: "02-messaging-ipc-data-model"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Sparkplug B schema helpers and protocol codecs."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
//! Sparkplug B framing for the HydroSim workspace.
//!
//! The wire contract is the Eclipse Sparkplug convention: one NBIRTH frame
//! declares every metric with its alias and metadata, then NDATA frames carry
//! alias-only samples. An 8-bit sequence number increments by exactly one per
//! frame and wraps 255 -> 0 so a compliant host can detect gaps.

pub mod metric;
pub mod protocol;
pub mod sequencer;
pub mod topic;

/// Shared result type for Sparkplug framing operations.
pub type Result<T> = std::result::Result<T, SparkplugError>;

/// Errors raised while framing or encoding Sparkplug payloads.
#[derive(Debug, thiserror::Error)]
pub enum SparkplugError {
    /// A data frame was requested before the session's birth frame.
    #[error("data frame requested before birth frame")]
    BirthNotSent,
    /// Protobuf encoding failed.
    #[error("payload encode error: {0}")]
    Encode(#[from] prost::EncodeError),
    /// Protobuf decoding failed.
    #[error("payload decode error: {0}")]
    Decode(#[from] prost::DecodeError),
}

pub use metric::{device_metrics, DataType, Metric, MetricValue};
pub use protocol::Payload;
pub use sequencer::Sequencer;
pub use topic::NodeTopics;
