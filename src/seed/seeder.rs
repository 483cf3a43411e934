//! Catalog seeder
//!
//! Replaces the whole catalog with the contents of the external feed:
//!
//! ```text
//! Idle -> Wiping -> Fetching -> Transforming -> Inserting -> Done
//!            \__________\____________\_____________\______-> Failed
//! ```
//!
//! The wipe happens first and nothing spans the steps, so a failure after
//! `Wiping` leaves the store empty. The failed step is kept in the phase so
//! operators can see what state the store was left in. Two reseeds running
//! at once interleave their steps; callers must serialise them.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use super::feed::{CatalogFeed, FeedEntry, FeedError};
use crate::error::{CatalogError, Result};
use crate::models::NewCreature;
use crate::resolver::fold_name;
use crate::store::CreatureStore;

pub const SEED_SUCCESS_MESSAGE: &str = "Seed executed successfully";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedStep {
    Wiping,
    Fetching,
    Transforming,
    Inserting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SeedPhase {
    Idle,
    Running { step: SeedStep },
    Done { removed: u64, inserted: u64 },
    Failed { during: SeedStep, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub message: String,
    pub removed: u64,
    pub inserted: u64,
}

/// Turn feed entries into store documents. Every document must pass the
/// same validation as a created one.
pub fn to_new_creatures(
    entries: Vec<FeedEntry>,
) -> std::result::Result<Vec<NewCreature>, FeedError> {
    entries
        .into_iter()
        .map(|entry| {
            let no = entry.sequence_number()?;
            let creature = NewCreature::new(no, fold_name(&entry.name));
            creature.validate().map_err(|e| FeedError::InvalidEntry {
                name: entry.name.clone(),
                url: entry.url.clone(),
                reason: e.to_string(),
            })?;
            Ok(creature)
        })
        .collect()
}

pub struct CatalogSeeder {
    store: Arc<dyn CreatureStore>,
    feed: Arc<dyn CatalogFeed>,
    feed_limit: u32,
    phase: watch::Sender<SeedPhase>,
}

impl CatalogSeeder {
    pub fn new(
        store: Arc<dyn CreatureStore>,
        feed: Arc<dyn CatalogFeed>,
        feed_limit: u32,
    ) -> Self {
        let (phase, _) = watch::channel(SeedPhase::Idle);
        Self {
            store,
            feed,
            feed_limit,
            phase,
        }
    }

    /// Phase of the current or most recent reseed.
    pub fn phase(&self) -> SeedPhase {
        self.phase.borrow().clone()
    }

    /// Watch phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<SeedPhase> {
        self.phase.subscribe()
    }

    /// Wipe the store and reload it from the feed.
    pub async fn reseed(&self) -> Result<SeedReport> {
        self.enter(SeedStep::Wiping);
        let removed = self
            .store
            .delete_many()
            .await
            .map_err(|e| self.fail(SeedStep::Wiping, "wipe catalog", e))?;

        self.enter(SeedStep::Fetching);
        let entries = self
            .feed
            .fetch_page(self.feed_limit)
            .await
            .map_err(|e| self.fail(SeedStep::Fetching, "fetch catalog feed", e))?;

        self.enter(SeedStep::Transforming);
        let creatures = to_new_creatures(entries)
            .map_err(|e| self.fail(SeedStep::Transforming, "transform catalog feed", e))?;

        self.enter(SeedStep::Inserting);
        let inserted = self
            .store
            .insert_many(creatures)
            .await
            .map_err(|e| self.fail(SeedStep::Inserting, "insert catalog", e))?;

        self.phase.send_replace(SeedPhase::Done { removed, inserted });
        tracing::info!(removed, inserted, "catalog reseeded");

        Ok(SeedReport {
            message: SEED_SUCCESS_MESSAGE.to_string(),
            removed,
            inserted,
        })
    }

    fn enter(&self, step: SeedStep) {
        tracing::info!(?step, "reseed step");
        self.phase.send_replace(SeedPhase::Running { step });
    }

    fn fail(
        &self,
        during: SeedStep,
        context: &'static str,
        err: impl Into<anyhow::Error>,
    ) -> CatalogError {
        let err = CatalogError::internal(context, err);
        self.phase.send_replace(SeedPhase::Failed {
            during,
            reason: err.to_string(),
        });
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Creature, CreaturePatch};
    use crate::store::{CreatureFilter, InMemoryCreatureStore, StoreError, StoreResult};
    use async_trait::async_trait;
    use uuid::Uuid;

    struct StaticFeed(Vec<FeedEntry>);

    #[async_trait]
    impl CatalogFeed for StaticFeed {
        async fn fetch_page(
            &self,
            limit: u32,
        ) -> std::result::Result<Vec<FeedEntry>, FeedError> {
            Ok(self.0.iter().take(limit as usize).cloned().collect())
        }
    }

    fn entry(no: u32, name: &str) -> FeedEntry {
        FeedEntry::new(name, format!("https://pokeapi.co/api/v2/pokemon/{no}/"))
    }

    /// Store whose bulk insert always fails.
    struct BrokenInsertStore(InMemoryCreatureStore);

    #[async_trait]
    impl CreatureStore for BrokenInsertStore {
        async fn insert_one(&self, c: NewCreature) -> StoreResult<Creature> {
            self.0.insert_one(c).await
        }
        async fn find(&self, limit: u32, offset: u32) -> StoreResult<Vec<Creature>> {
            self.0.find(limit, offset).await
        }
        async fn find_one(&self, f: &CreatureFilter) -> StoreResult<Option<Creature>> {
            self.0.find_one(f).await
        }
        async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Creature>> {
            self.0.find_by_id(id).await
        }
        async fn update_one(&self, id: Uuid, p: &CreaturePatch) -> StoreResult<()> {
            self.0.update_one(id, p).await
        }
        async fn delete_one(&self, id: Uuid) -> StoreResult<u64> {
            self.0.delete_one(id).await
        }
        async fn delete_many(&self) -> StoreResult<u64> {
            self.0.delete_many().await
        }
        async fn insert_many(&self, _: Vec<NewCreature>) -> StoreResult<u64> {
            Err(StoreError::Backend(anyhow::anyhow!("connection reset")))
        }
        async fn count(&self) -> StoreResult<u64> {
            self.0.count().await
        }
    }

    #[test]
    fn transform_extracts_no_and_folds_name() {
        let creatures =
            to_new_creatures(vec![entry(1, "Bulbasaur"), entry(4, "charmander")]).unwrap();
        assert_eq!(
            creatures,
            vec![
                NewCreature::new(1, "bulbasaur"),
                NewCreature::new(4, "charmander")
            ]
        );
    }

    #[tokio::test]
    async fn reseed_replaces_existing_catalog() {
        let store = Arc::new(InMemoryCreatureStore::new());
        store.insert_one(NewCreature::new(900, "old-one")).await.unwrap();
        store.insert_one(NewCreature::new(901, "old-two")).await.unwrap();

        let feed = Arc::new(StaticFeed(vec![
            entry(1, "bulbasaur"),
            entry(2, "ivysaur"),
            entry(3, "venusaur"),
        ]));
        let seeder = CatalogSeeder::new(store.clone(), feed, 1000);
        assert_eq!(seeder.phase(), SeedPhase::Idle);

        let report = seeder.reseed().await.unwrap();
        assert_eq!(report.message, SEED_SUCCESS_MESSAGE);
        assert_eq!(report.removed, 2);
        assert_eq!(report.inserted, 3);
        assert_eq!(store.count().await.unwrap(), 3);
        assert_eq!(
            seeder.phase(),
            SeedPhase::Done {
                removed: 2,
                inserted: 3
            }
        );

        // Running again leaves the same catalog
        seeder.reseed().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn feed_limit_caps_the_page() {
        let store = Arc::new(InMemoryCreatureStore::new());
        let feed = Arc::new(StaticFeed(
            (1..=5).map(|n| entry(n, &format!("c{n}"))).collect(),
        ));
        let seeder = CatalogSeeder::new(store.clone(), feed, 2);

        let report = seeder.reseed().await.unwrap();
        assert_eq!(report.inserted, 2);
    }

    #[tokio::test]
    async fn malformed_url_leaves_store_empty() {
        let store = Arc::new(InMemoryCreatureStore::new());
        store.insert_one(NewCreature::new(1, "bulbasaur")).await.unwrap();

        let feed = Arc::new(StaticFeed(vec![
            entry(1, "bulbasaur"),
            FeedEntry::new("missingno", "https://pokeapi.co/api/v2/pokemon/missingno/"),
        ]));
        let seeder = CatalogSeeder::new(store.clone(), feed, 1000);

        let err = seeder.reseed().await.unwrap_err();
        assert_eq!(err.http_status(), 500);
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(matches!(
            seeder.phase(),
            SeedPhase::Failed {
                during: SeedStep::Transforming,
                ..
            }
        ));
    }

    #[test]
    fn blank_feed_name_is_rejected() {
        let err = to_new_creatures(vec![entry(1, "bulbasaur"), entry(2, "   ")]).unwrap_err();
        assert!(matches!(err, FeedError::InvalidEntry { ref url, .. } if url.ends_with("/2/")));
    }

    #[tokio::test]
    async fn blank_feed_name_fails_while_transforming() {
        let store = Arc::new(InMemoryCreatureStore::new());
        store.insert_one(NewCreature::new(1, "bulbasaur")).await.unwrap();

        let feed = Arc::new(StaticFeed(vec![entry(1, "   ")]));
        let seeder = CatalogSeeder::new(store.clone(), feed, 1000);

        let err = seeder.reseed().await.unwrap_err();
        assert!(matches!(err, CatalogError::Internal { .. }));
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(matches!(
            seeder.phase(),
            SeedPhase::Failed {
                during: SeedStep::Transforming,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn insert_failure_is_recorded() {
        let store = Arc::new(BrokenInsertStore(InMemoryCreatureStore::new()));
        let feed = Arc::new(StaticFeed(vec![entry(1, "bulbasaur")]));
        let seeder = CatalogSeeder::new(store.clone(), feed, 1000);
        let mut phases = seeder.subscribe();

        let err = seeder.reseed().await.unwrap_err();
        assert!(matches!(err, CatalogError::Internal { .. }));
        assert!(phases.has_changed().unwrap());
        match phases.borrow_and_update().clone() {
            SeedPhase::Failed { during, reason } => {
                assert_eq!(during, SeedStep::Inserting);
                assert!(!reason.contains("connection reset"));
            }
            other => panic!("unexpected phase {other:?}"),
        };
    }
}
