//! Shared harness: in-memory broker, mock identity store, and a fully wired
//! router.

// Not every test binary uses every helper.
#![allow(dead_code)]

use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use auth_service::config::Config;
use auth_service::handlers::auth_handler::AppState;
use auth_service::messaging::rpc::RpcClient;
use auth_service::messaging::topics;
use auth_service::routes::build_routes;
use auth_service::services::token_service::TokenService;
use auth_service::services::user_service::UserService;
use auth_test_utils::{MemoryTransport, MockIdentityStore, TEST_JWT_SECRET};

pub const TEST_RPC_TIMEOUT: Duration = Duration::from_millis(500);

pub struct TestHarness {
    pub app: Router,
    pub store: MockIdentityStore,
    pub transport: MemoryTransport,
    pub state: Arc<AppState>,
}

pub fn test_config() -> Config {
    let vars = HashMap::from([
        ("BROKER_URL".to_string(), "redis://unused".to_string()),
        ("JWT_SECRET".to_string(), TEST_JWT_SECRET.to_string()),
        ("RPC_TIMEOUT_MS".to_string(), "500".to_string()),
    ]);
    Config::from_vars(&vars).expect("test config should load")
}

pub async fn connected_rpc(transport: &MemoryTransport) -> Arc<RpcClient> {
    let rpc = Arc::new(RpcClient::new(
        Arc::new(transport.clone()),
        TEST_RPC_TIMEOUT,
    ));

    for topic in [
        topics::USER_FIND_BY_EMAIL,
        topics::USER_FIND_BY_USERNAME,
        topics::USER_FIND_BY_ID,
        topics::USER_CREATE,
    ] {
        rpc.subscribe_to_reply_of(topic)
            .await
            .expect("reply topic declaration failed");
    }

    rpc.connect().await.expect("rpc connect failed");
    rpc
}

pub async fn setup() -> TestHarness {
    let transport = MemoryTransport::new();
    let store = MockIdentityStore::spawn(transport.clone()).await;
    let rpc = connected_rpc(&transport).await;

    let config = test_config();
    let tokens = TokenService::new(&config.jwt_secret);
    let users = UserService::new(rpc);

    let state = Arc::new(AppState {
        config,
        tokens,
        users,
    });

    TestHarness {
        app: build_routes(Arc::clone(&state)),
        store,
        transport,
        state,
    }
}
