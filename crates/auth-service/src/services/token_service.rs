//! JWT issuance, verification and rotation.
//!
//! Both tokens of a pair carry identical claims and differ only in expiry.
//! Rotation re-signs from the claims already embedded in a verified refresh
//! token; the identity store is never consulted, so a role change only takes
//! effect at the next full login.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AuthError;
use crate::models::{TokenPair, User, UserRole};
use crate::observability::metrics;

pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Claims carried by both access and refresh tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    pub sub: i64,
    pub email: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

impl std::fmt::Debug for TokenPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPayload")
            .field("sub", &"<redacted>")
            .field("email", &"<redacted>")
            .field("role", &self.role)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    /// Build from the shared HMAC secret.
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
        }
    }

    /// Issue a fresh access/refresh pair for a user record.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        let now = Utc::now().timestamp();

        let access_token = self.sign(TokenPayload {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now + ACCESS_TOKEN_TTL_SECS,
        })?;

        let refresh_token = self.sign(TokenPayload {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now + REFRESH_TOKEN_TTL_SECS,
        })?;

        metrics::record_token_issuance("success");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verify signature and expiry.
    ///
    /// Every failure collapses into `InvalidToken`: callers (and clients)
    /// cannot distinguish expired from malformed from wrongly signed.
    pub fn verify(&self, token: &str) -> Result<TokenPayload, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // A token expiring exactly now is already invalid.
        validation.leeway = 0;

        match jsonwebtoken::decode::<TokenPayload>(token, &self.decoding_key, &validation) {
            Ok(data) => {
                metrics::record_token_validation("success");
                Ok(data.claims)
            }
            Err(e) => {
                metrics::record_token_validation("error");
                debug!(error = %e, "token verification failed");
                Err(AuthError::InvalidToken(e.to_string()))
            }
        }
    }

    /// Re-issue a pair from an already-verified payload.
    pub fn rotate(&self, payload: &TokenPayload) -> Result<TokenPair, AuthError> {
        let now = Utc::now().timestamp();

        let access_token = self.sign(TokenPayload {
            sub: payload.sub,
            email: payload.email.clone(),
            role: payload.role,
            iat: now,
            exp: now + ACCESS_TOKEN_TTL_SECS,
        })?;

        let refresh_token = self.sign(TokenPayload {
            sub: payload.sub,
            email: payload.email.clone(),
            role: payload.role,
            iat: now,
            exp: now + REFRESH_TOKEN_TTL_SECS,
        })?;

        metrics::record_token_issuance("rotated");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn sign(&self, payload: TokenPayload) -> Result<String, AuthError> {
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        // An empty or truncated token means the signing setup itself is
        // broken; surface it as a fatal server error, never retry.
        if token.split('.').count() != 3 {
            return Err(AuthError::Signing("malformed signing output".to_string()));
        }

        Ok(token)
    }
}
