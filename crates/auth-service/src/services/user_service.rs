//! Typed identity-store calls over the RPC client.
//!
//! The identity store is authoritative for user records and uniqueness;
//! this service only translates between typed models and the wire.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::errors::AuthError;
use crate::messaging::rpc::RpcClient;
use crate::messaging::topics;
use crate::models::{CreateUserRequest, User};

#[derive(Clone)]
pub struct UserService {
    rpc: Arc<RpcClient>,
}

impl UserService {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }

    /// Look up a user by email. A `null` reply means no such user.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        self.find(topics::USER_FIND_BY_EMAIL, json!({ "email": email }))
            .await
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        self.find(topics::USER_FIND_BY_USERNAME, json!({ "username": username }))
            .await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, AuthError> {
        self.find(topics::USER_FIND_BY_ID, json!({ "id": id })).await
    }

    /// Create a user and wait for the stored record.
    ///
    /// The store enforces uniqueness; a duplicate surfaces as
    /// [`AuthError::Conflict`] through the remote error mapping.
    pub async fn create(&self, request: CreateUserRequest) -> Result<User, AuthError> {
        let payload =
            serde_json::to_value(&request).map_err(|e| AuthError::RpcTransport(e.to_string()))?;

        let reply = self.rpc.send(topics::USER_CREATE, payload).await?;
        serde_json::from_value(reply)
            .map_err(|e| AuthError::RpcTransport(format!("malformed user reply: {e}")))
    }

    /// Fire-and-forget variant of `user.create` for callers that do not
    /// need the stored record back.
    pub async fn create_event(&self, request: CreateUserRequest) -> Result<(), AuthError> {
        let payload =
            serde_json::to_value(&request).map_err(|e| AuthError::RpcTransport(e.to_string()))?;

        self.rpc.emit(topics::USER_CREATE, payload).await?;
        Ok(())
    }

    async fn find(&self, topic: &str, payload: Value) -> Result<Option<User>, AuthError> {
        let reply = self.rpc.send(topic, payload).await?;

        if reply.is_null() {
            debug!(topic = %topic, "identity store returned no record");
            return Ok(None);
        }

        let user = serde_json::from_value(reply)
            .map_err(|e| AuthError::RpcTransport(format!("malformed user reply: {e}")))?;
        Ok(Some(user))
    }
}
