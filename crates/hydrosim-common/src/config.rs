//! ---
//! hydro_section: "01-core-functionality"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Shared primitives and utilities for the simulator runtime."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;
use uuid::Uuid;

use crate::logging::LogFormat;

fn default_broker_host() -> String {
    "localhost".to_owned()
}

fn default_broker_port() -> u16 {
    1883
}

fn default_keepalive() -> Duration {
    Duration::from_secs(60)
}

fn default_qos() -> QosLevel {
    QosLevel::AtLeastOnce
}

fn default_send_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_base_water_level() -> f64 {
    1.5
}

fn default_min_water_level() -> f64 {
    0.0
}

fn default_max_water_level() -> f64 {
    5.0
}

fn default_max_variation() -> f64 {
    0.3
}

fn default_alert_level() -> f64 {
    3.0
}

fn default_temp_range() -> (f64, f64) {
    (15.0, 30.0)
}

fn default_humidity_range() -> (f64, f64) {
    (50.0, 90.0)
}

fn default_battery_range() -> (f64, f64) {
    (70.0, 100.0)
}

fn default_signal_range() -> (i32, i32) {
    (-90, -40)
}

fn default_ph_range() -> (f64, f64) {
    (6.0, 8.0)
}

fn default_pressure_base() -> f64 {
    1013.25
}

fn default_pressure_variation() -> f64 {
    15.0
}

fn default_rain_probability() -> f64 {
    0.05
}

fn default_rain_min_duration() -> Duration {
    Duration::from_secs(120)
}

fn default_rain_max_duration() -> Duration {
    Duration::from_secs(300)
}

fn default_rise_rate_range() -> (f64, f64) {
    (0.005, 0.02)
}

fn default_overshoot_factor() -> f64 {
    1.5
}

fn default_decay_rate() -> f64 {
    0.01
}

fn default_simulation_seed() -> u64 {
    0x5EED_u64
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for the simulator runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub devices: IndexMap<String, DeviceConfig>,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "HYDROSIM_CONFIG";

    /// Load configuration from disk, respecting the `HYDROSIM_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Retrieve a device configuration by its table key.
    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.get(name)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.devices.is_empty() {
            return Err(anyhow!("configuration must contain at least one device"));
        }
        self.simulation.validate()?;
        for (name, device) in &self.devices {
            device.validate(name, &self.simulation)?;
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            devices: IndexMap::new(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Delivery guarantee requested for telemetry publishes.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum QosLevel {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

/// MQTT broker connection parameters shared by every device.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_host")]
    pub host: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    #[serde(default = "default_keepalive")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub keepalive: Duration,
    #[serde(default = "default_qos")]
    pub qos: QosLevel,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            keepalive: default_keepalive(),
            qos: default_qos(),
        }
    }
}

/// Per-device identity, credentials, and addressing.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub device_id: Uuid,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub protocol: ProtocolConfig,
    #[serde(default = "default_base_water_level")]
    pub base_water_level: f64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_send_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub send_interval: Duration,
}

impl DeviceConfig {
    pub fn validate(&self, name: &str, simulation: &SimulationConfig) -> Result<()> {
        if self.send_interval.is_zero() {
            return Err(anyhow!("device '{}' send_interval must be non-zero", name));
        }
        if self.base_water_level < simulation.min_water_level
            || self.base_water_level > simulation.max_water_level
        {
            return Err(anyhow!(
                "device '{}' base_water_level {} outside [{}, {}]",
                name,
                self.base_water_level,
                simulation.min_water_level,
                simulation.max_water_level
            ));
        }
        match &self.protocol {
            ProtocolConfig::Telemetry { topic } if topic.is_empty() => {
                Err(anyhow!("device '{}' telemetry topic must not be empty", name))
            }
            ProtocolConfig::Sparkplug {
                group_id,
                edge_node_id,
            } if group_id.is_empty() || edge_node_id.is_empty() => Err(anyhow!(
                "device '{}' sparkplug group_id and edge_node_id must not be empty",
                name
            )),
            _ => Ok(()),
        }
    }

    /// Resolved location label, falling back to the table key.
    pub fn location_or(&self, fallback: &str) -> String {
        self.location
            .clone()
            .unwrap_or_else(|| fallback.to_owned())
    }
}

/// Wire flavor spoken by a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProtocolConfig {
    /// Tenant-scoped plain JSON telemetry publishes.
    Telemetry { topic: String },
    /// Sparkplug B framing with birth/data messages.
    Sparkplug {
        group_id: String,
        edge_node_id: String,
    },
}

/// Rain event model parameters.
///
/// The trigger probability is evaluated once per tick, so storm frequency is
/// coupled to each device's `send_interval`.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RainConfig {
    #[serde(default = "default_rain_probability")]
    pub probability: f64,
    #[serde(default = "default_rain_min_duration")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub min_duration: Duration,
    #[serde(default = "default_rain_max_duration")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub max_duration: Duration,
    /// Bounds for the per-event rise rate in meters per second.
    #[serde(default = "default_rise_rate_range")]
    pub rise_rate_range: (f64, f64),
    /// The level never exceeds `alert_level * overshoot_factor` during rain.
    #[serde(default = "default_overshoot_factor")]
    pub overshoot_factor: f64,
    /// Post-event decay toward the oscillation baseline, meters per second.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
}

impl Default for RainConfig {
    fn default() -> Self {
        Self {
            probability: default_rain_probability(),
            min_duration: default_rain_min_duration(),
            max_duration: default_rain_max_duration(),
            rise_rate_range: default_rise_rate_range(),
            overshoot_factor: default_overshoot_factor(),
            decay_rate: default_decay_rate(),
        }
    }
}

/// Physical simulation parameters shared by every device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_min_water_level")]
    pub min_water_level: f64,
    #[serde(default = "default_max_water_level")]
    pub max_water_level: f64,
    #[serde(default = "default_max_variation")]
    pub max_variation: f64,
    #[serde(default = "default_alert_level")]
    pub alert_level: f64,
    #[serde(default = "default_temp_range")]
    pub temp_range: (f64, f64),
    #[serde(default = "default_humidity_range")]
    pub humidity_range: (f64, f64),
    #[serde(default = "default_battery_range")]
    pub battery_range: (f64, f64),
    #[serde(default = "default_signal_range")]
    pub signal_range: (i32, i32),
    #[serde(default = "default_ph_range")]
    pub ph_range: (f64, f64),
    #[serde(default = "default_pressure_base")]
    pub pressure_base: f64,
    #[serde(default = "default_pressure_variation")]
    pub pressure_variation: f64,
    #[serde(default)]
    pub rain: RainConfig,
    #[serde(default = "default_simulation_seed")]
    pub random_seed: u64,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_water_level >= self.max_water_level {
            return Err(anyhow!(
                "min_water_level {} must be below max_water_level {}",
                self.min_water_level,
                self.max_water_level
            ));
        }
        if !(0.0..=1.0).contains(&self.rain.probability) {
            return Err(anyhow!(
                "rain probability {} must lie in [0, 1]",
                self.rain.probability
            ));
        }
        if self.rain.min_duration > self.rain.max_duration {
            return Err(anyhow!("rain min_duration must not exceed max_duration"));
        }
        if self.rain.overshoot_factor < 1.0 {
            return Err(anyhow!(
                "rain overshoot_factor {} must be at least 1.0",
                self.rain.overshoot_factor
            ));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            min_water_level: default_min_water_level(),
            max_water_level: default_max_water_level(),
            max_variation: default_max_variation(),
            alert_level: default_alert_level(),
            temp_range: default_temp_range(),
            humidity_range: default_humidity_range(),
            battery_range: default_battery_range(),
            signal_range: default_signal_range(),
            ph_range: default_ph_range(),
            pressure_base: default_pressure_base(),
            pressure_variation: default_pressure_variation(),
            rain: RainConfig::default(),
            random_seed: default_simulation_seed(),
        }
    }
}

/// Logging output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
