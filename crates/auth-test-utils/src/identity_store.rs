//! Mock identity store speaking the `user.*` wire contract.

use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use auth_service::messaging::rpc::{ReplyBody, ReplyEnvelope, RequestEnvelope};
use auth_service::messaging::topics;
use auth_service::messaging::transport::Transport;
use auth_service::models::{User, UserRole};

use crate::memory_transport::MemoryTransport;

/// Low bcrypt cost keeps test logins fast.
const TEST_BCRYPT_COST: u32 = 4;

/// In-memory identity store wired to a [`MemoryTransport`].
///
/// Subscribes to every `user.*` topic and answers request/reply envelopes;
/// fire-and-forget requests (no `reply_to`) are applied without answering.
#[derive(Clone)]
pub struct MockIdentityStore {
    transport: MemoryTransport,
    users: Arc<Mutex<HashMap<i64, User>>>,
    next_id: Arc<AtomicI64>,
}

impl MockIdentityStore {
    pub async fn spawn(transport: MemoryTransport) -> Self {
        let store = Self {
            transport,
            users: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        };

        for topic in [
            topics::USER_FIND_BY_EMAIL,
            topics::USER_FIND_BY_USERNAME,
            topics::USER_FIND_BY_ID,
            topics::USER_CREATE,
            topics::USER_UPDATE,
            topics::USER_DELETE,
        ] {
            let mut rx = store
                .transport
                .subscribe(topic)
                .await
                .expect("mock store subscription failed");
            let handler = store.clone();
            let topic = topic.to_string();

            tokio::spawn(async move {
                while let Some(bytes) = rx.recv().await {
                    let request: RequestEnvelope = match serde_json::from_slice(&bytes) {
                        Ok(request) => request,
                        Err(_) => continue,
                    };

                    let body = handler.handle(&topic, &request.payload).await;

                    if let Some(reply_to) = request.reply_to {
                        let reply = ReplyEnvelope {
                            correlation_id: request.correlation_id,
                            body,
                        };
                        let bytes =
                            serde_json::to_vec(&reply).expect("reply serialization failed");
                        let _ = handler.transport.publish(&reply_to, bytes).await;
                    }
                }
            });
        }

        store
    }

    /// Seed a user directly, returning the stored record.
    pub async fn insert_user(&self, email: &str, username: &str, password: &str) -> User {
        let hash = bcrypt::hash(password, TEST_BCRYPT_COST).expect("bcrypt hash failed");
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let user = User {
            id,
            email: email.to_string(),
            username: username.to_string(),
            password: hash,
            role: UserRole::User,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.users.lock().await.insert(id, user.clone());
        user
    }

    pub async fn user_count(&self) -> usize {
        self.users.lock().await.len()
    }

    async fn handle(&self, topic: &str, payload: &Value) -> ReplyBody {
        match topic {
            topics::USER_FIND_BY_EMAIL => {
                let email = payload["email"].as_str().unwrap_or_default();
                let users = self.users.lock().await;
                let found = users.values().find(|u| u.email == email);
                ReplyBody::Ok(user_or_null(found))
            }
            topics::USER_FIND_BY_USERNAME => {
                let username = payload["username"].as_str().unwrap_or_default();
                let users = self.users.lock().await;
                let found = users.values().find(|u| u.username == username);
                ReplyBody::Ok(user_or_null(found))
            }
            topics::USER_FIND_BY_ID => {
                let id = payload["id"].as_i64().unwrap_or_default();
                let users = self.users.lock().await;
                ReplyBody::Ok(user_or_null(users.get(&id)))
            }
            topics::USER_CREATE => self.create(payload).await,
            topics::USER_UPDATE => self.update(payload).await,
            topics::USER_DELETE => self.delete(payload).await,
            _ => ReplyBody::Err {
                code: "unknown_topic".to_string(),
                message: topic.to_string(),
            },
        }
    }

    async fn create(&self, payload: &Value) -> ReplyBody {
        let email = payload["email"].as_str().unwrap_or_default().to_string();
        let username = payload["username"].as_str().unwrap_or_default().to_string();
        let password = payload["password"].as_str().unwrap_or_default();
        let role = serde_json::from_value::<Option<UserRole>>(payload["role"].clone())
            .ok()
            .flatten()
            .unwrap_or_default();

        let mut users = self.users.lock().await;

        if users.values().any(|u| u.email == email) {
            return ReplyBody::Err {
                code: "conflict".to_string(),
                message: "User with this email already exists".to_string(),
            };
        }
        if users.values().any(|u| u.username == username) {
            return ReplyBody::Err {
                code: "conflict".to_string(),
                message: "User with this username already exists".to_string(),
            };
        }

        let hash = bcrypt::hash(password, TEST_BCRYPT_COST).expect("bcrypt hash failed");
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let user = User {
            id,
            email,
            username,
            password: hash,
            role,
            created_at: Utc::now(),
            updated_at: None,
        };
        users.insert(id, user.clone());

        ReplyBody::Ok(serde_json::to_value(&user).expect("user serialization failed"))
    }

    async fn update(&self, payload: &Value) -> ReplyBody {
        let id = payload["id"].as_i64().unwrap_or_default();
        let mut users = self.users.lock().await;

        let Some(user) = users.get_mut(&id) else {
            return ReplyBody::Err {
                code: "not_found".to_string(),
                message: format!("no user with id {id}"),
            };
        };

        if let Some(email) = payload["email"].as_str() {
            user.email = email.to_string();
        }
        if let Some(username) = payload["username"].as_str() {
            user.username = username.to_string();
        }
        user.updated_at = Some(Utc::now());

        ReplyBody::Ok(serde_json::to_value(&*user).expect("user serialization failed"))
    }

    async fn delete(&self, payload: &Value) -> ReplyBody {
        let id = payload["id"].as_i64().unwrap_or_default();
        match self.users.lock().await.remove(&id) {
            Some(user) => {
                ReplyBody::Ok(serde_json::to_value(&user).expect("user serialization failed"))
            }
            None => ReplyBody::Err {
                code: "not_found".to_string(),
                message: format!("no user with id {id}"),
            },
        }
    }
}

fn user_or_null(user: Option<&User>) -> Value {
    match user {
        Some(user) => serde_json::to_value(user).expect("user serialization failed"),
        None => json!(null),
    }
}
