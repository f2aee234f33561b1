//! crates/clinic_core/src/ports.rs
//!
//! Defines the service contracts (traits) the clinic components depend on.
//! These traits keep the core independent of the concrete key/value store and
//! the concrete generative-AI client.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Stored data is corrupted: {0}")]
    CorruptedState(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A lazy, finite, non-restartable sequence of reply-text fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = PortResult<String>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// String-keyed storage with the semantics of browser local storage.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Returns the stored value, or `None` when the key has never been written.
    async fn get_item(&self, key: &str) -> PortResult<Option<String>>;

    /// Replaces the value stored under `key`.
    async fn set_item(&self, key: &str, value: &str) -> PortResult<()>;
}

/// One ongoing conversation with the external chat collaborator.
///
/// The session keeps its own history; callers pass only the raw text of the
/// new user turn.
#[async_trait]
pub trait ChatSession: Send + Sync {
    async fn send_message_stream(&self, message: &str) -> PortResult<FragmentStream>;
}

/// Opens a new conversation bound to the clinic's system prompt. Called once
/// per page, when the page is set up.
pub trait ChatSessionFactory: Send + Sync {
    fn create_session(&self) -> PortResult<Arc<dyn ChatSession>>;
}
