//! ---
//! hydro_section: "01-core-functionality"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Shared primitives and utilities for the simulator runtime."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Sparkplug metric and payload timestamps require millisecond precision.
pub fn unix_timestamp_ms() -> u64 {
    timestamp_ms(Utc::now())
}

/// Convert a chrono timestamp to milliseconds since the Unix epoch, saturating
/// at zero for pre-epoch values.
pub fn timestamp_ms(at: DateTime<Utc>) -> u64 {
    at.timestamp_millis().max(0) as u64
}
