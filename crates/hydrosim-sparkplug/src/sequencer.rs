//! ---
//! hydro_section: "02-messaging-ipc-data-model"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Sparkplug B schema helpers and protocol codecs."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
use crate::metric::{Metric, MetricValue};
use crate::protocol::{payload, Payload};
use crate::{Result, SparkplugError};

/// Per-device birth/data framing state.
///
/// Invariants enforced here: exactly one birth frame precedes the first data
/// frame of a session, and the sequence number advances by exactly one per
/// frame, wrapping 255 -> 0, never skipping or repeating.
#[derive(Debug, Default)]
pub struct Sequencer {
    seq: u8,
    has_sent_birth: bool,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next frame will carry.
    pub fn seq(&self) -> u8 {
        self.seq
    }

    pub fn has_sent_birth(&self) -> bool {
        self.has_sent_birth
    }

    /// Frame an NBIRTH payload carrying the full definition of every tracked
    /// metric. Resets the session sequence counter before stamping the frame.
    pub fn birth(&mut self, metrics: &[Metric], timestamp_ms: u64) -> Payload {
        self.seq = 0;
        let frame = Payload {
            timestamp: Some(timestamp_ms),
            metrics: metrics
                .iter()
                .map(|metric| birth_metric(metric, timestamp_ms))
                .collect(),
            seq: Some(u64::from(self.seq)),
            uuid: None,
            body: None,
        };
        self.advance();
        self.has_sent_birth = true;
        frame
    }

    /// Frame an NDATA payload carrying alias-only samples. The host is
    /// expected to have cached names and metadata from the birth frame.
    pub fn data(&mut self, metrics: &[Metric], timestamp_ms: u64) -> Result<Payload> {
        if !self.has_sent_birth {
            return Err(SparkplugError::BirthNotSent);
        }
        let frame = Payload {
            timestamp: Some(timestamp_ms),
            metrics: metrics
                .iter()
                .map(|metric| data_metric(metric, timestamp_ms))
                .collect(),
            seq: Some(u64::from(self.seq)),
            uuid: None,
            body: None,
        };
        self.advance();
        Ok(frame)
    }

    fn advance(&mut self) {
        self.seq = self.seq.wrapping_add(1);
    }
}

fn birth_metric(metric: &Metric, timestamp_ms: u64) -> payload::Metric {
    payload::Metric {
        name: Some(metric.name.clone()),
        alias: Some(metric.alias),
        timestamp: Some(timestamp_ms),
        datatype: Some(metric.data_type().code()),
        is_null: None,
        properties: properties_of(metric),
        value: Some(wire_value(&metric.value)),
    }
}

fn data_metric(metric: &Metric, timestamp_ms: u64) -> payload::Metric {
    payload::Metric {
        name: None,
        alias: Some(metric.alias),
        timestamp: Some(timestamp_ms),
        datatype: None,
        is_null: None,
        properties: None,
        value: Some(wire_value(&metric.value)),
    }
}

fn properties_of(metric: &Metric) -> Option<payload::PropertySet> {
    let mut keys = Vec::new();
    let mut values = Vec::new();
    if let Some(unit) = &metric.unit {
        keys.push("Engineering Units".to_owned());
        values.push(string_property(unit));
    }
    if let Some(description) = &metric.description {
        keys.push("Description".to_owned());
        values.push(string_property(description));
    }
    if keys.is_empty() {
        None
    } else {
        Some(payload::PropertySet { keys, values })
    }
}

fn string_property(value: &str) -> payload::PropertyValue {
    payload::PropertyValue {
        r#type: Some(crate::metric::DataType::Text.code()),
        is_null: None,
        value: Some(payload::property_value::Value::StringValue(
            value.to_owned(),
        )),
    }
}

fn wire_value(value: &MetricValue) -> payload::metric::Value {
    match value {
        MetricValue::Int32(v) => payload::metric::Value::IntValue(*v as u32),
        MetricValue::Int64(v) => payload::metric::Value::LongValue(*v as u64),
        MetricValue::Float(v) => payload::metric::Value::FloatValue(*v),
        MetricValue::Double(v) => payload::metric::Value::DoubleValue(*v),
        MetricValue::Boolean(v) => payload::metric::Value::BooleanValue(*v),
        MetricValue::Text(v) => payload::metric::Value::StringValue(v.clone()),
    }
}
