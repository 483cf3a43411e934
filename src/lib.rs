//! Creature catalog
//!
//! A catalog of named, numbered creatures on top of a document store:
//!
//! - [`resolver`]: find one creature from a term that may be its `no`, its id or its name
//! - [`service`]: validated, case-folded writes with conflict mapping
//! - [`seed`]: wipe the catalog and reload it from an external feed
//! - [`store`]: the persistence port and its in-memory and Postgres adapters
//! - `api` (feature `server`): axum routes over the above

pub mod config;
pub mod error;
pub mod models;
pub mod resolver;
pub mod seed;
pub mod service;
pub mod store;

#[cfg(feature = "server")]
pub mod api;

pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use models::{Creature, CreaturePatch, ListQuery, NewCreature};
pub use resolver::CreatureResolver;
pub use seed::{CatalogSeeder, HttpCatalogFeed, SeedPhase, SeedReport};
pub use service::CatalogService;
pub use store::{is_valid_id, CreatureStore, InMemoryCreatureStore};
