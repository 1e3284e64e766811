//! ---
//! hydro_section: "15-testing-qa-runbook"
//! hydro_subsection: "integration"
//! hydro_type: "source"
//! hydro_scope: "test"
//! hydro_description: "Sparkplug session contract checks over the in-memory transport."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use hydrosim_common::AppConfig;
use hydrosim_core::{FleetCoordinator, MemoryTransportFactory};
use hydrosim_sparkplug::protocol::Payload;
use hydrosim_sparkplug::topic::STATE_ONLINE;
use prost::Message as _;

const EDGE_NODE_CONFIG: &str = r#"
[devices.sb-water-1]
device_id = "44547ced-e7fa-489b-8f04-891a30a0adb6"
client_id = "spb_1_2_sb_water_device_1"
username = "device_2_44547ced"
password = "5e5d44bd67874f0c"
base_water_level = 1.5
location = "Community Reservoir Edge Node"
send_interval = 1

[devices.sb-water-1.protocol]
kind = "sparkplug"
group_id = "community-1"
edge_node_id = "sb_water_device_1"
"#;

#[tokio::test]
async fn session_opens_with_presence_and_birth_then_streams_data() {
    let factory = Arc::new(MemoryTransportFactory::new());
    let config = AppConfig::from_str(EDGE_NODE_CONFIG).expect("edge node config parses");
    let handle = FleetCoordinator::new(config, factory.clone()).start(None);

    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.shutdown().await.expect("fleet shuts down");

    let transport = factory
        .transport_for("spb_1_2_sb_water_device_1")
        .expect("edge node transport");
    let records = transport.published();
    assert!(
        records.len() >= 3,
        "expected presence, birth, and at least one data frame"
    );

    // Presence: retained last-known-value announcing the node online.
    let presence = &records[0];
    assert_eq!(
        presence.topic,
        "spBv1.0/community-1/STATE/sb_water_device_1"
    );
    assert!(presence.retain);
    assert_eq!(presence.payload, STATE_ONLINE.as_bytes());

    // Exactly one birth frame, and it precedes every data frame.
    let birth_topics: Vec<&str> = records
        .iter()
        .filter(|record| record.topic.contains("/NBIRTH/"))
        .map(|record| record.topic.as_str())
        .collect();
    assert_eq!(birth_topics.len(), 1);
    assert_eq!(records[1].topic, "spBv1.0/community-1/NBIRTH/sb_water_device_1");

    let birth = Payload::decode(records[1].payload.as_slice()).expect("birth decodes");
    assert_eq!(birth.seq, Some(0));
    assert_eq!(birth.metrics.len(), 7);
    for metric in &birth.metrics {
        assert!(metric.name.is_some(), "birth metric missing its name");
        assert!(metric.alias.is_some(), "birth metric missing its alias");
        assert!(metric.datatype.is_some(), "birth metric missing its datatype");
        assert!(
            metric.properties.is_some(),
            "birth metric missing engineering metadata"
        );
    }

    // Data frames: alias-only metrics, sequence advancing by exactly one.
    let mut expected_seq = 1u64;
    for record in &records[2..] {
        assert_eq!(record.topic, "spBv1.0/community-1/NDATA/sb_water_device_1");
        let frame = Payload::decode(record.payload.as_slice()).expect("data frame decodes");
        assert_eq!(
            frame.seq,
            Some(expected_seq % 256),
            "sequence skipped or repeated"
        );
        assert_eq!(frame.metrics.len(), 7);
        for metric in &frame.metrics {
            assert!(metric.name.is_none(), "data metric repeated its name");
            assert!(metric.properties.is_none(), "data metric repeated metadata");
            assert!(metric.alias.is_some());
            assert!(metric.value.is_some());
        }
        expected_seq += 1;
    }
}

#[tokio::test]
async fn birth_aliases_match_the_data_frame_aliases() {
    let factory = Arc::new(MemoryTransportFactory::new());
    let config = AppConfig::from_str(EDGE_NODE_CONFIG).expect("edge node config parses");
    let handle = FleetCoordinator::new(config, factory.clone()).start(None);

    tokio::time::sleep(Duration::from_millis(120)).await;
    handle.shutdown().await.expect("fleet shuts down");

    let records = factory
        .transport_for("spb_1_2_sb_water_device_1")
        .expect("edge node transport")
        .published();

    let birth = Payload::decode(records[1].payload.as_slice()).expect("birth decodes");
    let declared: Vec<u64> = birth.metrics.iter().filter_map(|m| m.alias).collect();
    assert_eq!(declared, vec![1, 3, 4, 5, 6, 7, 8]);

    let data = Payload::decode(records[2].payload.as_slice()).expect("data decodes");
    let used: Vec<u64> = data.metrics.iter().filter_map(|m| m.alias).collect();
    assert_eq!(
        declared, used,
        "data frames must reuse the aliases declared at birth"
    );
}
