use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth_service::config::Config;
use auth_service::handlers::auth_handler::AppState;
use auth_service::messaging::redis::RedisTransport;
use auth_service::messaging::rpc::RpcClient;
use auth_service::messaging::topics;
use auth_service::routes;
use auth_service::services::token_service::TokenService;
use auth_service::services::user_service::UserService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Auth Gateway");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Configuration loaded successfully");

    info!("Connecting to broker...");
    let transport = Arc::new(RedisTransport::connect(&config.broker_url).await.map_err(
        |e| {
            error!("Failed to connect to broker: {}", e);
            e
        },
    )?);

    // Declare every request/reply topic before connecting; replies on
    // undeclared topics can never be routed.
    let rpc = Arc::new(RpcClient::new(transport, config.rpc_timeout));
    for topic in [
        topics::USER_FIND_BY_EMAIL,
        topics::USER_FIND_BY_USERNAME,
        topics::USER_FIND_BY_ID,
        topics::USER_CREATE,
    ] {
        rpc.subscribe_to_reply_of(topic).await?;
    }
    rpc.connect().await?;

    info!("RPC client connected");

    let bind_address = config.bind_address.clone();
    let tokens = TokenService::new(&config.jwt_secret);
    let users = UserService::new(Arc::clone(&rpc));

    let state = Arc::new(AppState {
        config,
        tokens,
        users,
    });

    let app = routes::build_routes(state);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Auth Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Fail in-flight identity lookups instead of letting them hang.
    rpc.shutdown().await;

    info!("Auth Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
