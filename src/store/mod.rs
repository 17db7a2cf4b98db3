//! Persistence for credentials and chat messages.
//!
//! Handlers only see the [`CredentialStore`] and [`MessageStore`] traits, so
//! any backend (or a test double) can be substituted at construction time.
//! Backends must enforce username uniqueness themselves: a violation on
//! [`CredentialStore::insert`] is reported as [`StoreError::Conflict`] and is
//! the source of truth when two registrations race.

pub mod memory;
pub mod sqlite;

use crate::config::{StoreBackend, StoreConfig};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already exists")]
    Conflict,

    #[error("store backend failure: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

/// Lookup and insert of `(username, password-hash)` pairs.
pub trait CredentialStore: Send + Sync {
    fn exists(&self, username: &str) -> Result<bool, StoreError>;

    /// Stored hash for `username`, or `None` if no such user.
    fn get_hash(&self, username: &str) -> Result<Option<String>, StoreError>;

    /// Insert a new credential. Fails with [`StoreError::Conflict`] if the
    /// username is taken.
    fn insert(&self, username: &str, password_hash: &str) -> Result<(), StoreError>;
}

/// A posted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

pub trait MessageStore: Send + Sync {
    /// All messages, oldest first.
    fn list_messages(&self) -> Result<Vec<Message>, StoreError>;

    fn post_message(&self, sender: &str, content: &str) -> Result<Message, StoreError>;
}

/// Both store capabilities, backed by the same backend.
#[derive(Clone)]
pub struct Stores {
    pub credentials: Arc<dyn CredentialStore>,
    pub messages: Arc<dyn MessageStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            credentials: store.clone(),
            messages: store,
        }
    }
}

/// Open the configured backend, bootstrapping its schema.
pub fn create_stores(config: &StoreConfig) -> Result<Stores> {
    match config.backend {
        StoreBackend::Sqlite => {
            let store = Arc::new(SqliteStore::open(&config.path)?);
            tracing::info!(path = %config.path.display(), "SQLite store opened");
            Ok(Stores {
                credentials: store.clone(),
                messages: store,
            })
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Stores::in_memory())
        }
    }
}
