//! Request/reply client over the broker transport.
//!
//! Each outgoing request carries a fresh correlation id and names the topic
//! replies must arrive on (`<topic>.reply`). A per-reply-topic dispatcher
//! routes incoming envelopes to the oneshot channel of the waiting caller.
//!
//! Lifecycle: declare every request/reply topic with
//! [`RpcClient::subscribe_to_reply_of`], then [`RpcClient::connect`]. Sends
//! before `connect` fail fast instead of waiting on replies that can never
//! be routed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use tracing::{debug, warn};

use super::topics::reply_topic;
use super::transport::Transport;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("client is not connected")]
    NotConnected,

    #[error("request on '{topic}' timed out")]
    Timeout { topic: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("remote error {code}: {message}")]
    Remote { code: String, message: String },

    #[error("codec error: {0}")]
    Codec(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub correlation_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub payload: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub correlation_id: Uuid,
    #[serde(flatten)]
    pub body: ReplyBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum ReplyBody {
    #[serde(rename = "ok")]
    Ok(Value),
    #[serde(rename = "err")]
    Err { code: String, message: String },
}

type PendingMap = Arc<Mutex<HashMap<Uuid, oneshot::Sender<ReplyBody>>>>;

pub struct RpcClient {
    transport: Arc<dyn Transport>,
    pending: PendingMap,
    reply_topics: Mutex<Vec<String>>,
    dispatchers: Mutex<Vec<JoinHandle<()>>>,
    connected: AtomicBool,
    reply_timeout: Duration,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn Transport>, reply_timeout: Duration) -> Self {
        Self {
            transport,
            pending: Arc::new(Mutex::new(HashMap::new())),
            reply_topics: Mutex::new(Vec::new()),
            dispatchers: Mutex::new(Vec::new()),
            connected: AtomicBool::new(false),
            reply_timeout,
        }
    }

    /// Declare a request/reply topic. Must happen before [`Self::connect`].
    pub async fn subscribe_to_reply_of(&self, topic: &str) -> Result<(), RpcError> {
        if self.connected.load(Ordering::SeqCst) {
            return Err(RpcError::Transport(
                "reply topics must be declared before connect".to_string(),
            ));
        }

        let mut topics = self.reply_topics.lock().await;
        let reply = reply_topic(topic);
        if !topics.contains(&reply) {
            topics.push(reply);
        }
        Ok(())
    }

    /// Subscribe to every declared reply topic and start routing replies.
    ///
    /// Connecting twice would spawn duplicate dispatchers per reply topic,
    /// so a second call is rejected.
    pub async fn connect(&self) -> Result<(), RpcError> {
        if self.connected.load(Ordering::SeqCst) {
            return Err(RpcError::Transport(
                "client is already connected".to_string(),
            ));
        }

        let topics = self.reply_topics.lock().await.clone();
        let mut dispatchers = self.dispatchers.lock().await;

        for topic in topics {
            let rx = self
                .transport
                .subscribe(&topic)
                .await
                .map_err(|e| RpcError::Transport(e.to_string()))?;

            dispatchers.push(tokio::spawn(dispatch_replies(
                topic,
                rx,
                Arc::clone(&self.pending),
            )));
        }

        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Send a request and wait for its correlated reply.
    pub async fn send(&self, topic: &str, payload: Value) -> Result<Value, RpcError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(RpcError::NotConnected);
        }

        let correlation_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(correlation_id, tx);

        let envelope = RequestEnvelope {
            correlation_id,
            reply_to: Some(reply_topic(topic)),
            payload,
        };

        if let Err(e) = self.publish_envelope(topic, &envelope).await {
            self.pending.lock().await.remove(&correlation_id);
            return Err(e);
        }

        match tokio::time::timeout(self.reply_timeout, rx).await {
            Ok(Ok(ReplyBody::Ok(value))) => {
                metrics::record_rpc_request(topic, "success");
                Ok(value)
            }
            Ok(Ok(ReplyBody::Err { code, message })) => {
                metrics::record_rpc_request(topic, "remote_error");
                Err(RpcError::Remote { code, message })
            }
            // Sender dropped: the client shut down with this request in
            // flight.
            Ok(Err(_)) => {
                metrics::record_rpc_request(topic, "error");
                Err(RpcError::Transport("client shut down".to_string()))
            }
            Err(_) => {
                self.pending.lock().await.remove(&correlation_id);
                metrics::record_rpc_request(topic, "timeout");
                Err(RpcError::Timeout {
                    topic: topic.to_string(),
                })
            }
        }
    }

    /// Publish a fire-and-forget event. No reply is ever routed back.
    pub async fn emit(&self, topic: &str, payload: Value) -> Result<(), RpcError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(RpcError::NotConnected);
        }

        let envelope = RequestEnvelope {
            correlation_id: Uuid::new_v4(),
            reply_to: None,
            payload,
        };

        self.publish_envelope(topic, &envelope).await?;
        metrics::record_rpc_request(topic, "emitted");
        Ok(())
    }

    /// Close the transport and fail every in-flight request.
    pub async fn shutdown(&self) {
        self.connected.store(false, Ordering::SeqCst);

        if let Err(e) = self.transport.close().await {
            warn!(error = %e, "transport close failed during shutdown");
        }

        let mut dispatchers = self.dispatchers.lock().await;
        for dispatcher in dispatchers.drain(..) {
            dispatcher.abort();
        }

        // Dropping the senders resolves every waiting `send` with a
        // transport error instead of letting it hang until timeout.
        self.pending.lock().await.clear();
    }

    /// Number of requests currently awaiting a reply.
    pub async fn pending_requests(&self) -> usize {
        self.pending.lock().await.len()
    }

    async fn publish_envelope(
        &self,
        topic: &str,
        envelope: &RequestEnvelope,
    ) -> Result<(), RpcError> {
        let bytes = serde_json::to_vec(envelope).map_err(|e| RpcError::Codec(e.to_string()))?;
        self.transport
            .publish(topic, bytes)
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))
    }
}

async fn dispatch_replies(
    topic: String,
    mut rx: mpsc::Receiver<Vec<u8>>,
    pending: PendingMap,
) {
    while let Some(bytes) = rx.recv().await {
        let envelope: ReplyEnvelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(topic = %topic, error = %e, "dropping undecodable reply");
                continue;
            }
        };

        match pending.lock().await.remove(&envelope.correlation_id) {
            Some(tx) => {
                // A dropped receiver means the caller already timed out.
                if tx.send(envelope.body).is_err() {
                    debug!(topic = %topic, correlation_id = %envelope.correlation_id,
                        "caller gone before reply arrived");
                }
            }
            None => {
                debug!(topic = %topic, correlation_id = %envelope.correlation_id,
                    "discarding late or unknown reply");
            }
        }
    }
}
