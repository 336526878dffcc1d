//! Redis pub/sub transport.
//!
//! Publishing goes through a shared [`ConnectionManager`]; each subscription
//! gets its own pub/sub connection whose message stream is pumped into an
//! mpsc channel by a background task.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::transport::{Transport, TransportError};

/// Buffer between the pub/sub pump and the consumer.
const SUBSCRIPTION_CHANNEL_CAPACITY: usize = 256;

pub struct RedisTransport {
    client: redis::Client,
    publisher: ConnectionManager,
    pumps: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl RedisTransport {
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let client = redis::Client::open(url)
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let publisher = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        info!(url = %url, "connected to broker");

        Ok(Self {
            client,
            publisher,
            pumps: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Transport for RedisTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let mut conn = self.publisher.clone();
        let receivers: i64 = conn
            .publish(topic, payload)
            .await
            .map_err(|e| TransportError::Publish(e.to_string()))?;

        debug!(topic = %topic, receivers, "published message");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<Vec<u8>>, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| TransportError::Subscribe(e.to_string()))?;

        pubsub
            .subscribe(topic)
            .await
            .map_err(|e| TransportError::Subscribe(e.to_string()))?;

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CHANNEL_CAPACITY);
        let topic_name = topic.to_string();

        let pump = tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: Vec<u8> = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(topic = %topic_name, error = %e, "dropping unreadable message");
                        continue;
                    }
                };

                if tx.send(payload).await.is_err() {
                    debug!(topic = %topic_name, "subscriber dropped, ending pump");
                    break;
                }
            }
        });

        self.pumps.lock().await.push(pump);
        Ok(rx)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);

        let mut pumps = self.pumps.lock().await;
        for pump in pumps.drain(..) {
            pump.abort();
        }

        info!("broker transport closed");
        Ok(())
    }
}
