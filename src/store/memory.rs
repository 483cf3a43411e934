//! In-memory creature store
//!
//! Enforces the same unique keys as the Postgres adapter. The lock is held
//! only for the duration of a single call.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CreatureFilter, CreatureStore, StoreError, StoreResult};
use crate::models::{Creature, CreaturePatch, NewCreature};

#[derive(Debug, Default)]
pub struct InMemoryCreatureStore {
    docs: RwLock<HashMap<Uuid, Creature>>,
}

impl InMemoryCreatureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Find the first unique key (`no` or `name`) already used by a document
/// other than `skip`.
fn duplicate_key(
    docs: &HashMap<Uuid, Creature>,
    skip: Option<Uuid>,
    no: Option<u32>,
    name: Option<&str>,
) -> Option<StoreError> {
    for doc in docs.values().filter(|d| Some(d.id) != skip) {
        if no == Some(doc.no) {
            return Some(StoreError::Duplicate {
                key: "no".to_string(),
                value: serde_json::json!(doc.no),
            });
        }
        if name == Some(doc.name.as_str()) {
            return Some(StoreError::Duplicate {
                key: "name".to_string(),
                value: serde_json::json!(doc.name),
            });
        }
    }
    None
}

#[async_trait]
impl CreatureStore for InMemoryCreatureStore {
    async fn insert_one(&self, creature: NewCreature) -> StoreResult<Creature> {
        let mut docs = self.docs.write().await;
        if let Some(err) = duplicate_key(&docs, None, Some(creature.no), Some(&creature.name)) {
            return Err(err);
        }
        let doc = creature.into_creature(Uuid::new_v4());
        docs.insert(doc.id, doc.clone());
        Ok(doc)
    }

    async fn find(&self, limit: u32, offset: u32) -> StoreResult<Vec<Creature>> {
        let docs = self.docs.read().await;
        let mut all: Vec<&Creature> = docs.values().collect();
        all.sort_by_key(|d| d.no);
        Ok(all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn find_one(&self, filter: &CreatureFilter) -> StoreResult<Option<Creature>> {
        let docs = self.docs.read().await;
        let found = docs.values().find(|d| match filter {
            CreatureFilter::No(no) => d.no == *no,
            CreatureFilter::Name(name) => d.name == *name,
        });
        Ok(found.cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Creature>> {
        Ok(self.docs.read().await.get(&id).cloned())
    }

    async fn update_one(&self, id: Uuid, patch: &CreaturePatch) -> StoreResult<()> {
        let mut docs = self.docs.write().await;
        if !docs.contains_key(&id) {
            return Ok(());
        }
        if let Some(err) = duplicate_key(&docs, Some(id), patch.no, patch.name.as_deref()) {
            return Err(err);
        }
        if let Some(doc) = docs.remove(&id) {
            docs.insert(id, doc.merged_with(patch));
        }
        Ok(())
    }

    async fn delete_one(&self, id: Uuid) -> StoreResult<u64> {
        Ok(self.docs.write().await.remove(&id).map_or(0, |_| 1))
    }

    async fn delete_many(&self) -> StoreResult<u64> {
        let mut docs = self.docs.write().await;
        let removed = docs.len() as u64;
        docs.clear();
        Ok(removed)
    }

    async fn insert_many(&self, creatures: Vec<NewCreature>) -> StoreResult<u64> {
        let mut docs = self.docs.write().await;

        // Check the whole batch, against the store and against itself, before writing
        let mut staged: HashMap<Uuid, Creature> = HashMap::with_capacity(creatures.len());
        for creature in creatures {
            if let Some(err) = duplicate_key(&docs, None, Some(creature.no), Some(&creature.name))
                .or_else(|| duplicate_key(&staged, None, Some(creature.no), Some(&creature.name)))
            {
                return Err(err);
            }
            let doc = creature.into_creature(Uuid::new_v4());
            staged.insert(doc.id, doc);
        }

        let inserted = staged.len() as u64;
        docs.extend(staged);
        Ok(inserted)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.docs.read().await.len() as u64)
    }
}
