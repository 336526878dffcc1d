//! In-process broker transport for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use auth_service::messaging::transport::{Transport, TransportError};

const CHANNEL_CAPACITY: usize = 64;

/// Topic bus delivering published payloads to every subscriber, with a log
/// of everything published for test assertions.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    subscribers: Arc<Mutex<HashMap<String, Vec<mpsc::Sender<Vec<u8>>>>>>,
    published: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    closed: Arc<AtomicBool>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages published to a topic so far.
    pub async fn published_to(&self, topic: &str) -> usize {
        self.published
            .lock()
            .await
            .iter()
            .filter(|(t, _)| t == topic)
            .count()
    }

    /// Raw payloads published to a topic, in order.
    pub async fn published_payloads(&self, topic: &str) -> Vec<Vec<u8>> {
        self.published
            .lock()
            .await
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        self.published
            .lock()
            .await
            .push((topic.to_string(), payload.clone()));

        let mut subscribers = self.subscribers.lock().await;
        if let Some(senders) = subscribers.get_mut(topic) {
            // Drop subscribers whose receivers are gone.
            let mut alive = Vec::with_capacity(senders.len());
            for sender in senders.drain(..) {
                if sender.send(payload.clone()).await.is_ok() {
                    alive.push(sender);
                }
            }
            *senders = alive;
        }

        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<Vec<u8>>, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.subscribers
            .lock()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        self.subscribers.lock().await.clear();
        Ok(())
    }
}
