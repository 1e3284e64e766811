//! ---
//! hydro_section: "01-core-functionality"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Primary orchestration and lifecycle management."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use hydrosim_common::{AppConfig, BrokerConfig, DeviceConfig, ProtocolConfig, QosLevel};
use hydrosim_sparkplug::topic::STATE_OFFLINE;
use hydrosim_sparkplug::NodeTopics;
use hydrosim_transport::{
    InMemoryTransport, MqttConfig, MqttTransport, Transport, WillMessage,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::device::{DeviceProfile, DeviceRunner};

/// Creates one transport per device; the seam that lets tests run the fleet
/// without a broker.
pub trait TransportFactory: Send + Sync {
    fn create(&self, device: &DeviceConfig, will: Option<WillMessage>) -> Box<dyn Transport>;
}

/// Production factory: one authenticated MQTT session per device.
pub struct MqttTransportFactory {
    broker: BrokerConfig,
}

impl MqttTransportFactory {
    pub fn new(broker: BrokerConfig) -> Self {
        Self { broker }
    }
}

impl TransportFactory for MqttTransportFactory {
    fn create(&self, device: &DeviceConfig, will: Option<WillMessage>) -> Box<dyn Transport> {
        Box::new(MqttTransport::new(MqttConfig {
            host: self.broker.host.clone(),
            port: self.broker.port,
            client_id: device.client_id.clone(),
            username: device.username.clone(),
            password: device.password.clone(),
            keepalive: self.broker.keepalive,
            will,
        }))
    }
}

/// Test factory handing out shared-state in-memory transports and keeping an
/// observer handle for each device, keyed by client id.
#[derive(Default)]
pub struct MemoryTransportFactory {
    transports: Mutex<Vec<(String, InMemoryTransport)>>,
    fail_clients: Mutex<Vec<String>>,
}

impl MemoryTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the named client's transport refuse its connect attempts.
    pub fn fail_connects_for(&self, client_id: &str) {
        self.fail_clients
            .lock()
            .expect("factory state poisoned")
            .push(client_id.to_owned());
    }

    /// Observer handle for a device created earlier, by client id.
    pub fn transport_for(&self, client_id: &str) -> Option<InMemoryTransport> {
        self.transports
            .lock()
            .expect("factory state poisoned")
            .iter()
            .find(|(id, _)| id == client_id)
            .map(|(_, transport)| transport.clone())
    }

    pub fn transports(&self) -> Vec<(String, InMemoryTransport)> {
        self.transports
            .lock()
            .expect("factory state poisoned")
            .clone()
    }
}

impl TransportFactory for MemoryTransportFactory {
    fn create(&self, device: &DeviceConfig, _will: Option<WillMessage>) -> Box<dyn Transport> {
        let transport = InMemoryTransport::new();
        if self
            .fail_clients
            .lock()
            .expect("factory state poisoned")
            .contains(&device.client_id)
        {
            transport.reject_connects(true);
        }
        self.transports
            .lock()
            .expect("factory state poisoned")
            .push((device.client_id.clone(), transport.clone()));
        Box::new(transport)
    }
}

/// Builds and starts one device runner per configured profile.
///
/// The configuration list is the only state shared across devices, and it is
/// read-only after startup.
pub struct FleetCoordinator {
    config: AppConfig,
    factory: Arc<dyn TransportFactory>,
}

impl FleetCoordinator {
    pub fn new(config: AppConfig, factory: Arc<dyn TransportFactory>) -> Self {
        Self { config, factory }
    }

    /// Spawn every device runner and return a lifecycle handle.
    pub fn start(self, run_duration: Option<Duration>) -> FleetHandle {
        let (shutdown_tx, _) = broadcast::channel(16);
        let mut devices = Vec::new();

        for (position, (name, device_config)) in self.config.devices.iter().enumerate() {
            // Indices are 1-based so the first device already de-correlates
            // from the shared defaults.
            let index = position + 1;
            let profile = DeviceProfile::from_config(name, index, device_config);
            let will = match &device_config.protocol {
                ProtocolConfig::Sparkplug {
                    group_id,
                    edge_node_id,
                } => Some(WillMessage {
                    topic: NodeTopics::new(group_id.clone(), edge_node_id.clone()).state(),
                    payload: STATE_OFFLINE.as_bytes().to_vec(),
                    qos: QosLevel::AtLeastOnce,
                    retain: true,
                }),
                ProtocolConfig::Telemetry { .. } => None,
            };
            let transport = self.factory.create(device_config, will);
            let runner = DeviceRunner::new(
                profile,
                &self.config.simulation,
                transport,
                self.config.broker.qos,
                run_duration,
            );

            let shutdown_rx = shutdown_tx.subscribe();
            let device_name = name.clone();
            let task = tokio::spawn(async move {
                if let Err(err) = runner.run(shutdown_rx).await {
                    error!(device = %device_name, error = %err, "device run failed");
                }
            });
            devices.push(DeviceHandle {
                name: name.clone(),
                task,
            });
        }

        info!(devices = devices.len(), "fleet started");
        FleetHandle {
            shutdown: shutdown_tx,
            devices,
        }
    }
}

struct DeviceHandle {
    name: String,
    task: JoinHandle<()>,
}

/// Handle returned from fleet startup, used for lifecycle control.
pub struct FleetHandle {
    shutdown: broadcast::Sender<()>,
    devices: Vec<DeviceHandle>,
}

impl FleetHandle {
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Sender that triggers the cooperative stop of every runner. Idempotent
    /// and order-independent: each runner only reads its own receiver.
    pub fn stop_sender(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Signal every runner to stop, then wait for their orderly exit.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(());
        let result = join_devices(self.devices).await;
        info!("fleet shutdown complete");
        result
    }

    /// Wait for every runner to finish on its own (deadline-bounded runs).
    pub async fn join(self) -> Result<()> {
        // Hold the sender until the joins complete so runners never observe a
        // closed channel as a premature stop signal.
        let keep_alive = self.shutdown;
        let result = join_devices(self.devices).await;
        drop(keep_alive);
        info!("fleet run complete");
        result
    }
}

async fn join_devices(devices: Vec<DeviceHandle>) -> Result<()> {
    for device in devices {
        if let Err(err) = device.task.await {
            error!(device = %device.name, error = %err, "device task join error");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn fleet_config() -> AppConfig {
        AppConfig::from_str(
            r#"
[devices.site-a]
device_id = "9d3e50ea-e160-4e59-a98e-6b13f51e5e1f"
client_id = "client_site_a"
username = "device_2_site_a"
password = "secret-a"
send_interval = 1

[devices.site-a.protocol]
kind = "telemetry"
topic = "tenants/2/devices/site-a/telemetry"

[devices.site-b]
device_id = "44547ced-e7fa-489b-8f04-891a30a0adb6"
client_id = "client_site_b"
username = "device_2_site_b"
password = "secret-b"
base_water_level = 2.0
send_interval = 1

[devices.site-b.protocol]
kind = "sparkplug"
group_id = "community-1"
edge_node_id = "sb_water_device_1"
"#,
        )
        .expect("fleet config parses")
    }

    #[tokio::test]
    async fn fleet_runs_and_stops_every_device_exactly_once() {
        let factory = Arc::new(MemoryTransportFactory::new());
        let handle = FleetCoordinator::new(fleet_config(), factory.clone()).start(None);
        assert_eq!(handle.device_count(), 2);

        tokio::time::sleep(Duration::from_millis(120)).await;
        handle.shutdown().await.expect("fleet shuts down");

        for (client_id, transport) in factory.transports() {
            assert_eq!(transport.connect_count(), 1, "{client_id} connect count");
            assert_eq!(transport.disconnect_count(), 1, "{client_id} disconnect count");
            assert!(
                !transport.published().is_empty(),
                "{client_id} never published"
            );
        }
    }

    #[tokio::test]
    async fn one_device_connect_failure_leaves_siblings_running() {
        let factory = Arc::new(MemoryTransportFactory::new());
        factory.fail_connects_for("client_site_b");
        let handle = FleetCoordinator::new(fleet_config(), factory.clone()).start(None);

        tokio::time::sleep(Duration::from_millis(120)).await;
        handle.shutdown().await.expect("fleet shuts down");

        let healthy = factory.transport_for("client_site_a").expect("site-a exists");
        assert!(!healthy.published().is_empty(), "healthy device stopped publishing");
        let failed = factory.transport_for("client_site_b").expect("site-b exists");
        assert!(failed.published().is_empty());
        assert_eq!(failed.disconnect_count(), 0);
    }

    #[tokio::test]
    async fn bounded_run_completes_without_external_stop() {
        let factory = Arc::new(MemoryTransportFactory::new());
        let handle = FleetCoordinator::new(fleet_config(), factory.clone())
            .start(Some(Duration::from_millis(80)));

        tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .expect("fleet honours its deadline")
            .expect("fleet joins cleanly");

        for (client_id, transport) in factory.transports() {
            assert_eq!(transport.disconnect_count(), 1, "{client_id} disconnect count");
        }
    }
}
