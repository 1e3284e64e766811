//! ---
//! hydro_section: "02-messaging-ipc-data-model"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Sparkplug B schema helpers and protocol codecs."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
use hydrosim_sim::SensorReading;

/// Fixed metric aliases, aligned with the host's metric definition table.
///
/// Alias 2 is reserved in the upstream definitions and must stay unassigned.
pub mod alias {
    pub const WATER_LEVEL: u64 = 1;
    pub const BATTERY_VOLTAGE: u64 = 3;
    pub const SIGNAL_STRENGTH: u64 = 4;
    pub const TEMPERATURE: u64 = 5;
    pub const HUMIDITY: u64 = 6;
    pub const PRESSURE: u64 = 7;
    pub const PH: u64 = 8;
}

/// Sparkplug basic data types used by the water-level devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int32,
    Int64,
    Float,
    Double,
    Boolean,
    Text,
}

impl DataType {
    /// Wire code from the Sparkplug B specification.
    pub fn code(self) -> u32 {
        match self {
            DataType::Int32 => 3,
            DataType::Int64 => 4,
            DataType::Float => 9,
            DataType::Double => 10,
            DataType::Boolean => 11,
            DataType::Text => 12,
        }
    }
}

/// A typed metric sample value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Text(String),
}

impl MetricValue {
    pub fn data_type(&self) -> DataType {
        match self {
            MetricValue::Int32(_) => DataType::Int32,
            MetricValue::Int64(_) => DataType::Int64,
            MetricValue::Float(_) => DataType::Float,
            MetricValue::Double(_) => DataType::Double,
            MetricValue::Boolean(_) => DataType::Boolean,
            MetricValue::Text(_) => DataType::Text,
        }
    }
}

/// One tracked metric with the metadata declared in the birth frame.
///
/// Name, unit, and description travel only in NBIRTH; NDATA repeats nothing
/// but the alias, timestamp, and value.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub alias: u64,
    pub value: MetricValue,
    pub unit: Option<String>,
    pub description: Option<String>,
}

impl Metric {
    pub fn new(name: impl Into<String>, alias: u64, value: MetricValue) -> Self {
        Self {
            name: name.into(),
            alias,
            value,
            unit: None,
            description: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn data_type(&self) -> DataType {
        self.value.data_type()
    }
}

/// Approximate pack voltage for a Li-ion cell at the given charge percentage.
fn battery_voltage(percent: f64) -> f32 {
    let voltage = 3.0 + (percent / 100.0) * 1.2;
    ((voltage * 100.0).round() / 100.0) as f32
}

/// Build the tracked metric list for one sample.
///
/// The host's definition table stores water level in centimeters, so the
/// meter-denominated reading is converted here.
pub fn device_metrics(reading: &SensorReading) -> Vec<Metric> {
    let location = reading.location.as_str();
    let water_level_cm = ((reading.water_level * 100.0) * 100.0).round() / 100.0;
    vec![
        Metric::new(
            "WaterLevel",
            alias::WATER_LEVEL,
            MetricValue::Float(water_level_cm as f32),
        )
        .with_unit("CENTIMETER")
        .with_description(format!("Water level measurement at {location}")),
        Metric::new(
            "BatteryVoltage",
            alias::BATTERY_VOLTAGE,
            MetricValue::Float(battery_voltage(reading.battery_level)),
        )
        .with_unit("VOLT")
        .with_description(format!("Battery voltage for device at {location}")),
        Metric::new(
            "SignalStrength",
            alias::SIGNAL_STRENGTH,
            MetricValue::Int32(reading.signal_strength),
        )
        .with_unit("DBM")
        .with_description(format!("RSSI for device at {location}")),
        Metric::new(
            "Temperature",
            alias::TEMPERATURE,
            MetricValue::Float(reading.temperature as f32),
        )
        .with_unit("CELSIUS")
        .with_description(format!("Ambient temperature at {location}")),
        Metric::new(
            "Humidity",
            alias::HUMIDITY,
            MetricValue::Float(reading.humidity as f32),
        )
        .with_unit("PERCENT")
        .with_description(format!("Relative humidity at {location}")),
        Metric::new(
            "Pressure",
            alias::PRESSURE,
            MetricValue::Float(reading.pressure as f32),
        )
        .with_unit("HPA")
        .with_description(format!("Atmospheric pressure at {location}")),
        Metric::new("Ph", alias::PH, MetricValue::Float(reading.ph as f32))
            .with_unit("PH")
            .with_description(format!("Water pH level at {location}")),
    ]
}
