//! # Auth Test Utilities
//!
//! Shared test utilities for the auth gateway:
//! - `MemoryTransport`: in-process broker with a published-message log
//! - `MockIdentityStore`: identity-store responder speaking the `user.*`
//!   wire contract
//! - `TestTokenBuilder`: fluent builder for signed test tokens
//! - Cookie extraction helpers for response assertions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let transport = MemoryTransport::new();
//!     let store = MockIdentityStore::spawn(transport.clone()).await;
//!     store.insert_user("alice@example.com", "alice", "secret1").await;
//!
//!     let expired = TestTokenBuilder::new(TEST_JWT_SECRET)
//!         .for_subject(1, "alice@example.com")
//!         .expires_in(-60)
//!         .build();
//! }
//! ```

pub mod cookies;
pub mod identity_store;
pub mod memory_transport;
pub mod token_builders;

pub use cookies::*;
pub use identity_store::*;
pub use memory_transport::*;
pub use token_builders::*;

/// Shared signing secret for tests (32+ bytes, matching the config minimum).
pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";
