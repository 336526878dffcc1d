use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transport closed")]
    Closed,

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Subscribe failed: {0}")]
    Subscribe(String),
}

/// Raw topic-based message bus.
///
/// The RPC layer above owns envelopes and correlation; implementations only
/// move opaque byte payloads between topics.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Subscribe to a topic, receiving every payload published to it.
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<Vec<u8>>, TransportError>;

    /// Tear down the connection. Subscriptions end their channels.
    async fn close(&self) -> Result<(), TransportError>;
}
