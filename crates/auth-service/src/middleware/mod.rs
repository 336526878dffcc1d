pub mod auth;
pub mod retry;
