//! Creature store port
//!
//! The catalog talks to persistence only through [`CreatureStore`]. Two
//! adapters ship with the crate:
//!
//! - [`InMemoryCreatureStore`]: process-local, used by tests and database-less runs
//! - `PgCreatureStore` (feature `database`): one JSONB-backed table in Postgres
//!
//! Stores compare names exactly; case folding is the caller's job.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Creature, CreaturePatch, NewCreature};

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::InMemoryCreatureStore;
#[cfg(feature = "database")]
pub use postgres::PgCreatureStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key (`no` or `name`) is already taken
    #[error("duplicate key {key}: {value}")]
    Duplicate {
        key: String,
        value: serde_json::Value,
    },

    #[error("store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Single-document lookup filter on one of the unique keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatureFilter {
    No(u32),
    Name(String),
}

/// Document-oriented persistence for creatures.
///
/// Single-document writes are atomic. `insert_many` is all-or-nothing for
/// the batch it receives.
#[async_trait]
pub trait CreatureStore: Send + Sync {
    /// Insert one document, assigning its id.
    async fn insert_one(&self, creature: NewCreature) -> StoreResult<Creature>;

    /// Page through all documents ordered by ascending `no`.
    async fn find(&self, limit: u32, offset: u32) -> StoreResult<Vec<Creature>>;

    async fn find_one(&self, filter: &CreatureFilter) -> StoreResult<Option<Creature>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Creature>>;

    /// Apply a partial update. Updating an id that does not exist is a no-op.
    async fn update_one(&self, id: Uuid, patch: &CreaturePatch) -> StoreResult<()>;

    /// Returns the number of documents removed (0 or 1).
    async fn delete_one(&self, id: Uuid) -> StoreResult<u64>;

    /// Remove every document, returning how many were removed.
    async fn delete_many(&self) -> StoreResult<u64>;

    /// Insert a batch, returning how many were inserted.
    async fn insert_many(&self, creatures: Vec<NewCreature>) -> StoreResult<u64>;

    async fn count(&self) -> StoreResult<u64>;
}

/// True when `term` is an opaque id in the store's native encoding.
///
/// Only the canonical hyphenated UUID form is accepted. The hyphens at fixed
/// positions mean a valid id can never also parse as a number.
pub fn is_valid_id(term: &str) -> bool {
    parse_id(term).is_some()
}

/// Parse a term into an id, returning `None` for anything `is_valid_id` rejects.
pub fn parse_id(term: &str) -> Option<Uuid> {
    if term.len() != 36 {
        return None;
    }
    Uuid::try_parse(term).ok()
}
