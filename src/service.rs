//! CatalogService: guarded reads and writes over a creature store
//!
//! Every write goes through here. Names are folded (trimmed, lower-cased)
//! before they reach the store, payloads are validated, and store errors
//! are translated:
//!
//! - unique key violation -> `CatalogError::Conflict`
//! - anything else        -> `CatalogError::Internal` (logged)

use std::sync::Arc;

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::models::{Creature, CreaturePatch, ListQuery, NewCreature};
use crate::resolver::{fold_name, CreatureResolver};
use crate::store::{parse_id, CreatureStore, StoreError};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CreatureStore>,
    resolver: CreatureResolver,
    config: CatalogConfig,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CreatureStore>, config: CatalogConfig) -> Self {
        Self {
            resolver: CreatureResolver::new(Arc::clone(&store)),
            store,
            config,
        }
    }

    pub async fn create(&self, mut creature: NewCreature) -> Result<Creature> {
        creature.validate()?;
        creature.name = fold_name(&creature.name);

        let created = self
            .store
            .insert_one(creature)
            .await
            .map_err(|e| map_store_error(e, "create creature"))?;
        tracing::info!(id = %created.id, no = created.no, name = %created.name, "creature created");
        Ok(created)
    }

    /// Page through the catalog ordered by ascending `no`.
    pub async fn list(&self, query: ListQuery) -> Result<Vec<Creature>> {
        let limit = query.limit.unwrap_or(self.config.default_limit);
        if limit == 0 {
            return Err(CatalogError::BadRequest(
                "limit must be at least 1".to_string(),
            ));
        }
        let offset = query.offset.unwrap_or(0);

        self.store
            .find(limit, offset)
            .await
            .map_err(|e| CatalogError::internal("list creatures", e))
    }

    pub async fn find_one(&self, term: &str) -> Result<Creature> {
        self.resolver.resolve(term).await
    }

    /// Apply `patch` to the creature `term` resolves to and return the merged
    /// view. The store is not re-read after the write.
    pub async fn update(&self, term: &str, mut patch: CreaturePatch) -> Result<Creature> {
        let creature = self.resolver.resolve(term).await?;

        patch.validate()?;
        if let Some(name) = patch.name.as_mut() {
            *name = fold_name(name);
        }

        self.store
            .update_one(creature.id, &patch)
            .await
            .map_err(|e| map_store_error(e, "update creature"))?;
        tracing::info!(id = %creature.id, "creature updated");
        Ok(creature.merged_with(&patch))
    }

    /// Delete strictly by opaque id. Removing nothing is an error.
    pub async fn remove(&self, id: &str) -> Result<String> {
        let uuid = parse_id(id)
            .ok_or_else(|| CatalogError::BadRequest(format!("{id} is not a valid id")))?;

        let deleted = self
            .store
            .delete_one(uuid)
            .await
            .map_err(|e| CatalogError::internal("delete creature", e))?;
        if deleted == 0 {
            return Err(CatalogError::BadRequest(format!("Id {id} not found")));
        }
        tracing::info!(id = %uuid, "creature deleted");
        Ok(format!("Creature with id {id} has been deleted"))
    }
}

fn map_store_error(err: StoreError, context: &'static str) -> CatalogError {
    match err {
        StoreError::Duplicate { key, value } => {
            tracing::warn!(%key, %value, "rejected duplicate creature");
            CatalogError::Conflict { key, value }
        }
        StoreError::Backend(source) => CatalogError::internal(context, source),
    }
}
