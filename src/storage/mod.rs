//! Persistence layer.
//!
//! The engine talks to storage through the [`Store`] trait: bankrolls
//! keyed by agent, wagers append-mostly (a wager row is written once at
//! placement and updated exactly once at settlement). Two backends are
//! provided: an in-memory store for tests and a SQLite store for
//! production.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Bankroll, Wager};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Storage failure taxonomy. `Unavailable` is the retryable class —
/// the caller owns the retry policy, the store never retries itself.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Abstract persistence contract for bankrolls and wagers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch a bankroll by agent id.
    async fn get_bankroll(&self, agent_id: &str) -> Result<Option<Bankroll>, StoreError>;

    /// Insert or overwrite a bankroll.
    async fn put_bankroll(&self, bankroll: &Bankroll) -> Result<(), StoreError>;

    /// All bankrolls, unordered.
    async fn all_bankrolls(&self) -> Result<Vec<Bankroll>, StoreError>;

    /// Insert a new wager. `Conflict` if the id already exists.
    async fn insert_wager(&self, wager: &Wager) -> Result<(), StoreError>;

    /// Update an existing wager. `NotFound` if the id is unknown.
    async fn update_wager(&self, wager: &Wager) -> Result<(), StoreError>;

    /// Fetch a wager by id.
    async fn get_wager(&self, wager_id: &str) -> Result<Option<Wager>, StoreError>;

    /// All wagers for an agent, oldest first by placement time.
    async fn wagers_for_agent(&self, agent_id: &str) -> Result<Vec<Wager>, StoreError>;

    /// Pending wagers on a game, across all agents.
    async fn pending_for_game(&self, game_id: &str) -> Result<Vec<Wager>, StoreError>;
}
