//! # Auth Gateway Service
//!
//! Cookie-session authentication gateway. Issues and verifies JWT
//! access/refresh token pairs, guards protected routes with silent
//! access-token renewal, retries handlers that fail with 401, and resolves
//! identities through a message-broker RPC client backed by a remote
//! identity store.

pub mod config;
pub mod cookies;
pub mod errors;
pub mod handlers;
pub mod messaging;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
