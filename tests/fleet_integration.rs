//! ---
//! hydro_section: "15-testing-qa-runbook"
//! hydro_subsection: "integration"
//! hydro_type: "source"
//! hydro_scope: "test"
//! hydro_description: "End-to-end fleet lifecycle scenarios over the in-memory transport."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use hydrosim_common::AppConfig;
use hydrosim_core::{FleetCoordinator, MemoryTransportFactory};

const TWO_SITE_CONFIG: &str = r#"
[devices.site-a]
device_id = "9d3e50ea-e160-4e59-a98e-6b13f51e5e1f"
client_id = "client_site_a"
username = "device_2_site_a"
password = "secret-a"
base_water_level = 1.5
location = "Reservoir Monitoring Point A"
send_interval = 1

[devices.site-a.protocol]
kind = "telemetry"
topic = "tenants/2/devices/site-a/telemetry"

[devices.site-b]
device_id = "0cabc4cb-9092-48ec-80bf-63392a3b73b9"
client_id = "client_site_b"
username = "device_2_site_b"
password = "secret-b"
base_water_level = 2.0
location = "Reservoir Monitoring Point B"
send_interval = 2

[devices.site-b.protocol]
kind = "telemetry"
topic = "tenants/2/devices/site-b/telemetry"
"#;

fn two_site_config() -> AppConfig {
    AppConfig::from_str(TWO_SITE_CONFIG).expect("two-site config parses")
}

#[tokio::test]
async fn devices_publish_independently_and_disconnect_once() {
    let factory = Arc::new(MemoryTransportFactory::new());
    let handle = FleetCoordinator::new(two_site_config(), factory.clone()).start(None);
    assert_eq!(handle.device_count(), 2);

    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.shutdown().await.expect("fleet shuts down");

    let site_a = factory.transport_for("client_site_a").expect("site-a transport");
    let site_b = factory.transport_for("client_site_b").expect("site-b transport");

    for (label, transport) in [("site-a", &site_a), ("site-b", &site_b)] {
        assert_eq!(transport.connect_count(), 1, "{label} connected more than once");
        assert_eq!(
            transport.disconnect_count(),
            1,
            "{label} disconnect was not issued exactly once"
        );
        assert!(!transport.published().is_empty(), "{label} never published");
    }

    // Each device publishes on its own tenant topic, never a sibling's.
    for record in site_a.published() {
        assert_eq!(record.topic, "tenants/2/devices/site-a/telemetry");
    }
    for record in site_b.published() {
        assert_eq!(record.topic, "tenants/2/devices/site-b/telemetry");
    }
}

#[tokio::test]
async fn telemetry_payload_matches_the_tenant_contract() {
    let factory = Arc::new(MemoryTransportFactory::new());
    let handle = FleetCoordinator::new(two_site_config(), factory.clone()).start(None);

    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.shutdown().await.expect("fleet shuts down");

    let transport = factory.transport_for("client_site_a").expect("site-a transport");
    let records = transport.published();
    let payload: serde_json::Value =
        serde_json::from_slice(&records[0].payload).expect("telemetry payload is JSON");

    for key in [
        "deviceId",
        "deviceIndex",
        "location",
        "timestamp",
        "waterLevel",
        "temperature",
        "humidity",
        "batteryLevel",
        "signalStrength",
        "pressure",
        "ph",
        "status",
        "dataQuality",
    ] {
        assert!(payload.get(key).is_some(), "telemetry payload missing '{key}'");
    }
    assert_eq!(payload["deviceId"], "9d3e50ea-e160-4e59-a98e-6b13f51e5e1f");
    assert_eq!(payload["location"], "Reservoir Monitoring Point A");
    let status = payload["status"].as_str().expect("status is a string");
    assert!(status == "normal" || status == "warning");
    let quality = payload["dataQuality"].as_f64().expect("dataQuality is numeric");
    assert!((0.0..=1.0).contains(&quality));
}

#[tokio::test]
async fn bounded_fleet_run_finishes_by_itself() {
    let factory = Arc::new(MemoryTransportFactory::new());
    let handle = FleetCoordinator::new(two_site_config(), factory.clone())
        .start(Some(Duration::from_millis(100)));

    tokio::time::timeout(Duration::from_secs(10), handle.join())
        .await
        .expect("bounded fleet run must end on its own")
        .expect("fleet joins cleanly");

    for (client_id, transport) in factory.transports() {
        assert_eq!(transport.connect_count(), 1, "{client_id} connect count");
        assert_eq!(transport.disconnect_count(), 1, "{client_id} disconnect count");
    }
}
