//! ---
//! hydro_section: "02-messaging-ipc-data-model"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Sparkplug B schema helpers and protocol codecs."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
//! Protobuf wire types for Sparkplug B payloads.
//!
//! Hand-maintained, tag-faithful subset of the Eclipse Tahu
//! `sparkplug_b.proto` schema, written in generated style so payloads stay
//! byte-compatible with Sparkplug-aware hosts without a protoc build step.
//! Template, DataSet, and extension fields are omitted; the water-level
//! devices only publish scalar metrics.

use prost::Message as _;

use crate::Result;

/// Top-level Sparkplug B payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Payload {
    /// Milliseconds since the Unix epoch at frame creation.
    #[prost(uint64, optional, tag = "1")]
    pub timestamp: ::core::option::Option<u64>,
    #[prost(message, repeated, tag = "2")]
    pub metrics: ::prost::alloc::vec::Vec<payload::Metric>,
    /// Rolling 0-255 frame sequence number.
    #[prost(uint64, optional, tag = "3")]
    pub seq: ::core::option::Option<u64>,
    #[prost(string, optional, tag = "4")]
    pub uuid: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub body: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

/// Nested message and enum types in `Payload`.
pub mod payload {
    /// A single named or aliased sample.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Metric {
        #[prost(string, optional, tag = "1")]
        pub name: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(uint64, optional, tag = "2")]
        pub alias: ::core::option::Option<u64>,
        #[prost(uint64, optional, tag = "3")]
        pub timestamp: ::core::option::Option<u64>,
        /// Sparkplug basic data type code.
        #[prost(uint32, optional, tag = "4")]
        pub datatype: ::core::option::Option<u32>,
        #[prost(bool, optional, tag = "7")]
        pub is_null: ::core::option::Option<bool>,
        #[prost(message, optional, tag = "9")]
        pub properties: ::core::option::Option<PropertySet>,
        #[prost(oneof = "metric::Value", tags = "10, 11, 12, 13, 14, 15")]
        pub value: ::core::option::Option<metric::Value>,
    }

    /// Nested message and enum types in `Metric`.
    pub mod metric {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Value {
            #[prost(uint32, tag = "10")]
            IntValue(u32),
            #[prost(uint64, tag = "11")]
            LongValue(u64),
            #[prost(float, tag = "12")]
            FloatValue(f32),
            #[prost(double, tag = "13")]
            DoubleValue(f64),
            #[prost(bool, tag = "14")]
            BooleanValue(bool),
            #[prost(string, tag = "15")]
            StringValue(::prost::alloc::string::String),
        }
    }

    /// Property keys and values attached to a birth metric.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PropertySet {
        #[prost(string, repeated, tag = "1")]
        pub keys: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
        #[prost(message, repeated, tag = "2")]
        pub values: ::prost::alloc::vec::Vec<PropertyValue>,
    }

    /// A single typed property value.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PropertyValue {
        #[prost(uint32, optional, tag = "1")]
        pub r#type: ::core::option::Option<u32>,
        #[prost(bool, optional, tag = "2")]
        pub is_null: ::core::option::Option<bool>,
        #[prost(oneof = "property_value::Value", tags = "3, 4, 5, 6, 7, 8")]
        pub value: ::core::option::Option<property_value::Value>,
    }

    /// Nested message and enum types in `PropertyValue`.
    pub mod property_value {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Value {
            #[prost(uint32, tag = "3")]
            IntValue(u32),
            #[prost(uint64, tag = "4")]
            LongValue(u64),
            #[prost(float, tag = "5")]
            FloatValue(f32),
            #[prost(double, tag = "6")]
            DoubleValue(f64),
            #[prost(bool, tag = "7")]
            BooleanValue(bool),
            #[prost(string, tag = "8")]
            StringValue(::prost::alloc::string::String),
        }
    }
}

/// Serialize a payload to its protobuf wire representation.
pub fn encode(payload: &Payload) -> Vec<u8> {
    payload.encode_to_vec()
}

/// Parse a payload from its protobuf wire representation.
pub fn decode(bytes: &[u8]) -> Result<Payload> {
    Ok(Payload::decode(bytes)?)
}
