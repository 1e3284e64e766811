//! ---
//! hydro_section: "02-messaging-ipc-data-model"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Transport implementations for telemetry publishing."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hydrosim_common::QosLevel;

use crate::{Result, Transport, TransportError};

/// One captured publish, in arrival order.
#[derive(Debug, Clone)]
pub struct PublishRecord {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QosLevel,
    pub retain: bool,
}

/// In-memory transport backed by a mutex-protected record log.
///
/// Primarily for tests and single-process integration: clones share the same
/// underlying state, so a test can keep one handle while a device runner owns
/// another.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    connected: AtomicBool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    reject_connects: AtomicBool,
    reject_publishes: AtomicBool,
    published: Mutex<Vec<PublishRecord>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent connect attempts fail.
    pub fn reject_connects(&self, reject: bool) {
        self.inner.reject_connects.store(reject, Ordering::SeqCst);
    }

    /// Make subsequent publish attempts fail.
    pub fn reject_publishes(&self, reject: bool) {
        self.inner.reject_publishes.store(reject, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    pub fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.inner.disconnects.load(Ordering::SeqCst)
    }

    /// Snapshot of everything published so far.
    pub fn published(&self) -> Vec<PublishRecord> {
        self.inner.published.lock().expect("record log poisoned").clone()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.inner.reject_connects.load(Ordering::SeqCst) {
            return Err(TransportError::Connect(
                "injected connect failure".to_owned(),
            ));
        }
        self.inner.connected.store(true, Ordering::SeqCst);
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QosLevel,
        retain: bool,
    ) -> Result<()> {
        if !self.inner.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Publish {
                topic: topic.to_owned(),
                reason: "not connected".to_owned(),
            });
        }
        if self.inner.reject_publishes.load(Ordering::SeqCst) {
            return Err(TransportError::Publish {
                topic: topic.to_owned(),
                reason: "injected publish failure".to_owned(),
            });
        }
        self.inner
            .published
            .lock()
            .expect("record log poisoned")
            .push(PublishRecord {
                topic: topic.to_owned(),
                payload,
                qos,
                retain,
            });
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_publishes_in_order() {
        let mut transport = InMemoryTransport::new();
        transport.connect().await.expect("connect succeeds");
        transport
            .publish("a", vec![1], QosLevel::AtLeastOnce, false)
            .await
            .expect("first publish");
        transport
            .publish("b", vec![2], QosLevel::AtMostOnce, true)
            .await
            .expect("second publish");

        let records = transport.published();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].topic, "a");
        assert_eq!(records[1].topic, "b");
        assert!(records[1].retain);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let mut transport = InMemoryTransport::new();
        let observer = transport.clone();
        transport.connect().await.expect("connect succeeds");
        assert!(observer.is_connected());
        assert_eq!(observer.connect_count(), 1);
        transport.disconnect().await.expect("disconnect succeeds");
        assert!(!observer.is_connected());
        assert_eq!(observer.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_errors() {
        let mut transport = InMemoryTransport::new();
        transport.reject_connects(true);
        assert!(matches!(
            transport.connect().await,
            Err(TransportError::Connect(_))
        ));

        transport.reject_connects(false);
        transport.connect().await.expect("connect succeeds");
        transport.reject_publishes(true);
        assert!(matches!(
            transport
                .publish("a", vec![], QosLevel::AtLeastOnce, false)
                .await,
            Err(TransportError::Publish { .. })
        ));
    }

    #[tokio::test]
    async fn publish_requires_connection() {
        let transport = InMemoryTransport::new();
        assert!(matches!(
            transport
                .publish("a", vec![], QosLevel::AtLeastOnce, false)
                .await,
            Err(TransportError::Publish { .. })
        ));
    }
}
