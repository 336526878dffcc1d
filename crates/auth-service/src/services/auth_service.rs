//! Credential verification and the login/register/refresh flows.

use tracing::{debug, warn};

use crate::errors::AuthError;
use crate::handlers::auth_handler::AppState;
use crate::models::{CreateUserRequest, TokenPair, User, UserRole};

/// Verify an email/password pair against the identity store.
///
/// Unknown email, missing stored hash and wrong password all collapse into
/// `InvalidCredentials` so callers cannot probe which emails exist.
pub async fn validate_user(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let user = state
        .users
        .find_by_email(email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if user.password.is_empty() {
        debug!("stored record has no password hash");
        return Err(AuthError::InvalidCredentials);
    }

    let matches = bcrypt::verify(password, &user.password).map_err(|e| {
        warn!(error = %e, "bcrypt verification failed");
        AuthError::Internal
    })?;

    if !matches {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(user)
}

pub async fn login(state: &AppState, email: &str, password: &str) -> Result<TokenPair, AuthError> {
    let user = validate_user(state, email, password).await?;
    state.tokens.issue_pair(&user)
}

/// Register a new user and hand back a first token pair.
///
/// The email pre-check keeps the common duplicate case from reaching the
/// store at all; the store's own uniqueness error maps to the same 409.
pub async fn register(
    state: &AppState,
    email: &str,
    username: &str,
    password: &str,
    role: Option<UserRole>,
) -> Result<TokenPair, AuthError> {
    if email.is_empty() || username.is_empty() || password.is_empty() {
        return Err(AuthError::Validation(
            "Email, username and password are required".to_string(),
        ));
    }

    if state.users.find_by_email(email).await?.is_some() {
        return Err(AuthError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let user = state
        .users
        .create(CreateUserRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            role,
        })
        .await?;

    state.tokens.issue_pair(&user)
}

/// Verify a refresh token and rotate it into a fresh pair.
///
/// Every failure maps to the same 401 so clients learn nothing about why a
/// refresh token stopped working.
pub async fn refresh_tokens(state: &AppState, refresh_token: &str) -> Result<TokenPair, AuthError> {
    let pair = state
        .tokens
        .verify(refresh_token)
        .and_then(|payload| state.tokens.rotate(&payload));

    pair.map_err(|e| {
        warn!(error = %e, "refresh token rotation failed");
        AuthError::Unauthenticated("Invalid refresh token".to_string())
    })
}
