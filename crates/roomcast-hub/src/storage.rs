//! The persistence boundary.
//!
//! The hub consumes storage through one narrow operation: persist a chat
//! message. Retry/backoff policy, schema, and connection pooling all live
//! behind the trait — a storage failure here aborts only the single
//! in-flight broadcast.

use std::sync::{Mutex, PoisonError};

use roomcast_protocol::StoredMessage;

/// A persistence failure, carrying whatever detail the backend offered.
#[derive(Debug, thiserror::Error)]
#[error("storage failed: {0}")]
pub struct StorageError(String);

impl StorageError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}

/// Persists chat messages. Must be safe to call repeatedly; the hub treats
/// failures as non-retryable.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    async fn create_message(
        &self,
        message: StoredMessage,
    ) -> Result<(), StorageError>;
}

/// In-memory [`Storage`] for demos and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    messages: Mutex<Vec<StoredMessage>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every message persisted so far, in call order.
    pub fn messages(&self) -> Vec<StoredMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn create_message(
        &self,
        message: StoredMessage,
    ) -> Result<(), StorageError> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
        Ok(())
    }
}
