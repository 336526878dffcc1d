//! Builder patterns for test data construction.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::json;

use auth_service::models::UserRole;

/// Builder for signed test tokens.
///
/// # Example
/// ```rust,ignore
/// let expired = TestTokenBuilder::new(TEST_JWT_SECRET)
///     .for_subject(42, "alice@example.com")
///     .expires_in(-60)
///     .build();
/// ```
pub struct TestTokenBuilder {
    secret: String,
    sub: i64,
    email: String,
    role: UserRole,
    expires_in: i64,
}

impl TestTokenBuilder {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            sub: 1,
            email: "test@example.com".to_string(),
            role: UserRole::User,
            expires_in: 3600,
        }
    }

    pub fn for_subject(mut self, id: i64, email: &str) -> Self {
        self.sub = id;
        self.email = email.to_string();
        self
    }

    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }

    /// Seconds until expiry; negative values build an already-expired token.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.expires_in = seconds;
        self
    }

    /// Sign the claims into an HS256 token.
    pub fn build(self) -> String {
        let now = Utc::now();
        let claims = json!({
            "sub": self.sub,
            "email": self.email,
            "role": self.role,
            "iat": now.timestamp(),
            "exp": (now + Duration::seconds(self.expires_in)).timestamp(),
        });

        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .expect("test token encoding failed")
    }
}
