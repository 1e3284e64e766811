//! ---
//! hydro_section: "11-simulation"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Simulation runtime helpers and telemetry frames."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operational status reported alongside each sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Normal,
    Warning,
}

/// One synthetic sensor sample produced for a device tick.
///
/// Serializes to the tenant telemetry JSON contract (camelCase keys,
/// ISO-8601 timestamp).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub device_id: Uuid,
    pub device_index: usize,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    /// Water level in meters, clamped to the configured bounds.
    pub water_level: f64,
    /// Ambient temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity percentage.
    pub humidity: f64,
    /// Battery charge percentage.
    pub battery_level: f64,
    /// Received signal strength in dBm.
    pub signal_strength: i32,
    /// Atmospheric pressure in hPa.
    pub pressure: f64,
    /// Water pH level.
    pub ph: f64,
    pub status: DeviceStatus,
    /// Data reliability indicator in [0, 1].
    pub data_quality: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn serializes_with_camel_case_keys() {
        let reading = SensorReading {
            device_id: Uuid::nil(),
            device_index: 1,
            location: "Reservoir Monitoring Point A".to_owned(),
            timestamp: Utc.with_ymd_and_hms(2025, 9, 23, 12, 0, 0).unwrap(),
            water_level: 1.503,
            temperature: 21.4,
            humidity: 68.2,
            battery_level: 93.1,
            signal_strength: -62,
            pressure: 1011.87,
            ph: 7.12,
            status: DeviceStatus::Normal,
            data_quality: 0.97,
        };
        let json = serde_json::to_value(&reading).expect("reading serializes");
        assert_eq!(json["deviceId"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["waterLevel"], 1.503);
        assert_eq!(json["signalStrength"], -62);
        assert_eq!(json["status"], "normal");
        assert!(json["timestamp"]
            .as_str()
            .expect("timestamp is a string")
            .starts_with("2025-09-23T12:00:00"));
    }
}
