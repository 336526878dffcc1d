use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Minimum length for the shared signing secret, in bytes.
const MIN_SECRET_LEN: usize = 32;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_RPC_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub broker_url: String,
    pub jwt_secret: SecretString,
    /// Enables the `Secure` cookie attribute.
    pub production: bool,
    pub rpc_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT secret: {0}")]
    InvalidSecret(String),

    #[error("Invalid RPC timeout: {0}")]
    InvalidTimeout(String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let broker_url = vars
            .get("BROKER_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("BROKER_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let jwt_secret = vars
            .get("JWT_SECRET")
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;

        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidSecret(format!(
                "Expected at least {} bytes, got {}",
                MIN_SECRET_LEN,
                jwt_secret.len()
            )));
        }

        let production = vars
            .get("MODE")
            .map(|m| m == "production")
            .unwrap_or(false);

        let rpc_timeout_ms = match vars.get("RPC_TIMEOUT_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidTimeout(format!("{raw}: {e}")))?,
            None => DEFAULT_RPC_TIMEOUT_MS,
        };

        if rpc_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "RPC_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }

        Ok(Config {
            bind_address,
            broker_url,
            jwt_secret: SecretString::from(jwt_secret.clone()),
            production,
            rpc_timeout: Duration::from_millis(rpc_timeout_ms),
        })
    }
}
