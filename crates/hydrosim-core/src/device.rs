//! ---
//! hydro_section: "01-core-functionality"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Primary orchestration and lifecycle management."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use hydrosim_common::time::timestamp_ms;
use hydrosim_common::{DeviceConfig, ProtocolConfig, QosLevel, SimulationConfig};
use hydrosim_sim::WaveformGenerator;
use hydrosim_sparkplug::topic::STATE_ONLINE;
use hydrosim_sparkplug::{device_metrics, protocol, NodeTopics, Sequencer};
use hydrosim_transport::Transport;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::runtime::RateLimiter;

/// Immutable identity and addressing for one simulated device.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub name: String,
    /// Fleet index used to de-correlate waveform phase and period.
    pub index: usize,
    pub device_id: Uuid,
    pub client_id: String,
    pub location: String,
    pub protocol: ProtocolConfig,
    pub base_water_level: f64,
    pub send_interval: Duration,
}

impl DeviceProfile {
    pub fn from_config(name: &str, index: usize, config: &DeviceConfig) -> Self {
        Self {
            name: name.to_owned(),
            index,
            device_id: config.device_id,
            client_id: config.client_id.clone(),
            location: config.location_or(name),
            protocol: config.protocol.clone(),
            base_water_level: config.base_water_level,
            send_interval: config.send_interval,
        }
    }
}

/// Drives one device's connect -> announce -> tick -> disconnect lifecycle.
///
/// All simulation state is owned here exclusively; nothing is shared with
/// sibling devices.
pub struct DeviceRunner {
    profile: DeviceProfile,
    generator: WaveformGenerator,
    sequencer: Sequencer,
    transport: Box<dyn Transport>,
    qos: QosLevel,
    run_duration: Option<Duration>,
}

impl DeviceRunner {
    pub fn new(
        profile: DeviceProfile,
        simulation: &SimulationConfig,
        transport: Box<dyn Transport>,
        qos: QosLevel,
        run_duration: Option<Duration>,
    ) -> Self {
        let generator = WaveformGenerator::new(
            profile.device_id,
            profile.index,
            profile.location.clone(),
            profile.base_water_level,
            profile.send_interval,
            simulation,
        );
        Self {
            profile,
            generator,
            sequencer: Sequencer::new(),
            transport,
            qos,
            run_duration,
        }
    }

    /// Run the device until the shutdown signal fires, the optional deadline
    /// elapses, or the initial connect fails. The transport is disconnected on
    /// every exit path past a successful connect.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let device = self.profile.name.clone();

        if let Err(err) = self.transport.connect().await {
            error!(device = %device, error = %err, "transport connect failed; aborting device run");
            return Err(err).with_context(|| format!("device '{}' failed to connect", device));
        }
        info!(
            device = %device,
            transport = self.transport.name(),
            interval_secs = self.profile.send_interval.as_secs(),
            "device connected"
        );

        self.announce().await;

        let deadline = self.run_duration.map(|duration| Instant::now() + duration);
        let mut limiter = RateLimiter::new(self.profile.send_interval);
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!(device = %device, "shutdown signal received");
                    break;
                }
                _ = limiter.tick() => {
                    self.tick().await;
                    // The deadline is checked once per tick, never mid-sleep.
                    if let Some(deadline) = deadline {
                        if Instant::now() >= deadline {
                            info!(device = %device, "run duration elapsed");
                            break;
                        }
                    }
                }
            }
        }

        if let Err(err) = self.transport.disconnect().await {
            warn!(device = %device, error = %err, "transport disconnect failed");
        } else {
            info!(device = %device, "device disconnected");
        }
        Ok(())
    }

    /// Publish the retained presence state and the NBIRTH frame. The simple
    /// telemetry protocol has no session framing and skips this entirely.
    async fn announce(&mut self) {
        let topics = match &self.profile.protocol {
            ProtocolConfig::Sparkplug {
                group_id,
                edge_node_id,
            } => NodeTopics::new(group_id.clone(), edge_node_id.clone()),
            ProtocolConfig::Telemetry { .. } => return,
        };

        if let Err(err) = self
            .transport
            .publish(
                &topics.state(),
                STATE_ONLINE.as_bytes().to_vec(),
                QosLevel::AtLeastOnce,
                true,
            )
            .await
        {
            warn!(device = %self.profile.name, error = %err, "presence publish failed");
        }

        let reading = self.generator.next_reading(Utc::now());
        let metrics = device_metrics(&reading);
        let frame = self
            .sequencer
            .birth(&metrics, timestamp_ms(reading.timestamp));
        let bytes = protocol::encode(&frame);
        // Births are best-effort; a lost one shows up host-side as a session gap.
        match self
            .transport
            .publish(&topics.nbirth(), bytes, QosLevel::AtMostOnce, false)
            .await
        {
            Ok(()) => info!(device = %self.profile.name, metrics = metrics.len(), "birth frame published"),
            Err(err) => warn!(device = %self.profile.name, error = %err, "birth publish failed"),
        }
    }

    /// One generate -> frame -> publish cycle. Failures are logged and
    /// swallowed; only the caller's shutdown/deadline checks end the loop.
    async fn tick(&mut self) {
        let reading = self.generator.next_reading(Utc::now());
        let stamped_at = timestamp_ms(reading.timestamp);

        match &self.profile.protocol {
            ProtocolConfig::Telemetry { topic } => {
                let payload = match serde_json::to_vec(&reading) {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(device = %self.profile.name, error = %err, "telemetry encoding failed; dropping tick");
                        return;
                    }
                };
                match self.transport.publish(topic, payload, self.qos, false).await {
                    Ok(()) => debug!(
                        device = %self.profile.name,
                        water_level_m = reading.water_level,
                        "telemetry published"
                    ),
                    Err(err) => {
                        warn!(device = %self.profile.name, error = %err, "telemetry publish failed; continuing")
                    }
                }
            }
            ProtocolConfig::Sparkplug {
                group_id,
                edge_node_id,
            } => {
                let topics = NodeTopics::new(group_id.clone(), edge_node_id.clone());
                let metrics = device_metrics(&reading);
                let frame = match self.sequencer.data(&metrics, stamped_at) {
                    Ok(frame) => frame,
                    Err(err) => {
                        warn!(device = %self.profile.name, error = %err, "sparkplug framing failed; dropping tick");
                        return;
                    }
                };
                let seq = frame.seq.unwrap_or_default();
                let bytes = protocol::encode(&frame);
                match self
                    .transport
                    .publish(&topics.ndata(), bytes, QosLevel::AtLeastOnce, false)
                    .await
                {
                    Ok(()) => debug!(
                        device = %self.profile.name,
                        seq,
                        water_level_m = reading.water_level,
                        "data frame published"
                    ),
                    Err(err) => {
                        warn!(device = %self.profile.name, error = %err, "data publish failed; continuing")
                    }
                }
            }
        }
    }
}
