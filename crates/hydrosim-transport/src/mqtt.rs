//! ---
//! hydro_section: "02-messaging-ipc-data-model"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Transport implementations for telemetry publishing."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
use std::time::Duration;

use async_trait::async_trait;
use hydrosim_common::QosLevel;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, LastWill, MqttOptions, Packet, QoS,
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{Result, Transport, TransportError, WillMessage};

/// Broker acknowledgement wait before a connect attempt is abandoned.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Outstanding-request capacity of the async client channel.
const CLIENT_CAPACITY: usize = 64;

/// Connection parameters for one device's broker session.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub keepalive: Duration,
    /// Registered at connect time; the broker publishes it on abnormal
    /// disconnect.
    pub will: Option<WillMessage>,
}

/// MQTT transport backed by a rumqttc async client.
///
/// Each device owns its own instance and therefore its own broker
/// connection; nothing here is shared across devices.
pub struct MqttTransport {
    config: MqttConfig,
    client: Option<AsyncClient>,
    eventloop_task: Option<JoinHandle<()>>,
}

impl MqttTransport {
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            client: None,
            eventloop_task: None,
        }
    }
}

fn wire_qos(qos: QosLevel) -> QoS {
    match qos {
        QosLevel::AtMostOnce => QoS::AtMostOnce,
        QosLevel::AtLeastOnce => QoS::AtLeastOnce,
        QosLevel::ExactlyOnce => QoS::ExactlyOnce,
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn connect(&mut self) -> Result<()> {
        let mut options = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.host.clone(),
            self.config.port,
        );
        options.set_credentials(self.config.username.clone(), self.config.password.clone());
        options.set_keep_alive(self.config.keepalive);
        if let Some(will) = &self.config.will {
            options.set_last_will(LastWill::new(
                will.topic.clone(),
                will.payload.clone(),
                wire_qos(will.qos),
                will.retain,
            ));
        }

        let (client, mut eventloop) = AsyncClient::new(options, CLIENT_CAPACITY);

        // Drive the event loop by hand until the broker acknowledges the
        // session, so connect failures surface here instead of in the
        // background task.
        let acknowledged = tokio::time::timeout(CONNECT_TIMEOUT, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        if ack.code == ConnectReturnCode::Success {
                            return Ok(());
                        }
                        return Err(TransportError::Connect(format!(
                            "broker refused connection: {:?}",
                            ack.code
                        )));
                    }
                    Ok(_) => continue,
                    Err(err) => return Err(TransportError::Connect(err.to_string())),
                }
            }
        })
        .await;

        match acknowledged {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                return Err(TransportError::Connect(format!(
                    "no broker acknowledgement within {:?}",
                    CONNECT_TIMEOUT
                )))
            }
        }

        let client_id = self.config.client_id.clone();
        let task = tokio::spawn(async move {
            loop {
                if let Err(err) = eventloop.poll().await {
                    warn!(client = %client_id, error = %err, "mqtt event loop error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        });

        debug!(client = %self.config.client_id, host = %self.config.host, "mqtt session established");
        self.client = Some(client);
        self.eventloop_task = Some(task);
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QosLevel,
        retain: bool,
    ) -> Result<()> {
        let client = self.client.as_ref().ok_or_else(|| TransportError::Publish {
            topic: topic.to_owned(),
            reason: "not connected".to_owned(),
        })?;
        client
            .publish(topic, wire_qos(qos), retain, payload)
            .await
            .map_err(|err| TransportError::Publish {
                topic: topic.to_owned(),
                reason: err.to_string(),
            })
    }

    async fn disconnect(&mut self) -> Result<()> {
        let result = match self.client.take() {
            Some(client) => client
                .disconnect()
                .await
                .map_err(|err| TransportError::Disconnect(err.to_string())),
            None => Ok(()),
        };
        if let Some(task) = self.eventloop_task.take() {
            if result.is_ok() {
                // Let the loop flush the queued DISCONNECT before tearing it down.
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            task.abort();
        }
        result
    }

    fn name(&self) -> &'static str {
        "mqtt"
    }
}
