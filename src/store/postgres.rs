//! Postgres creature store
//!
//! One table, one row per creature document. Descriptive fields live in a
//! JSONB column. All SQL is runtime-checked (sqlx::query, not sqlx::query!)
//! to avoid a compile-time database requirement.

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CreatureFilter, CreatureStore, StoreError, StoreResult};
use crate::models::{Creature, CreaturePatch, NewCreature};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS creatures (
    id          UUID PRIMARY KEY,
    no          BIGINT NOT NULL CONSTRAINT creatures_no_key UNIQUE CHECK (no > 0),
    name        TEXT NOT NULL CONSTRAINT creatures_name_key UNIQUE CHECK (name <> ''),
    attributes  JSONB NOT NULL DEFAULT '{}'::jsonb
)
"#;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, sqlx::FromRow)]
struct PgCreatureRow {
    id: Uuid,
    no: i64,
    name: String,
    attributes: Json<Map<String, Value>>,
}

impl TryFrom<PgCreatureRow> for Creature {
    type Error = StoreError;

    fn try_from(row: PgCreatureRow) -> Result<Self, Self::Error> {
        let no = u32::try_from(row.no).map_err(|_| {
            StoreError::Backend(anyhow!("creature {} has out-of-range no {}", row.id, row.no))
        })?;
        Ok(Creature {
            id: row.id,
            no,
            name: row.name,
            attributes: row.attributes.0,
        })
    }
}

/// Postgres-backed creature store.
#[derive(Clone)]
pub struct PgCreatureStore {
    pool: PgPool,
}

impl PgCreatureStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `creatures` table if it is missing.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(anyhow!(e)))?;
        Ok(())
    }
}

/// Translate a write failure, naming the offending key when it is a
/// unique violation.
fn map_write_error(err: sqlx::Error, no: Option<u32>, name: Option<&str>) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            match db_err.constraint() {
                Some("creatures_no_key") => {
                    return StoreError::Duplicate {
                        key: "no".to_string(),
                        value: serde_json::json!(no),
                    }
                }
                Some("creatures_name_key") => {
                    return StoreError::Duplicate {
                        key: "name".to_string(),
                        value: serde_json::json!(name),
                    }
                }
                _ => {}
            }
        }
    }
    StoreError::Backend(anyhow!(err))
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(anyhow!(err))
}

#[async_trait]
impl CreatureStore for PgCreatureStore {
    async fn insert_one(&self, creature: NewCreature) -> StoreResult<Creature> {
        let row = sqlx::query_as::<_, PgCreatureRow>(
            r#"INSERT INTO creatures (id, no, name, attributes)
               VALUES ($1, $2, $3, $4)
               RETURNING id, no, name, attributes"#,
        )
        .bind(Uuid::new_v4())
        .bind(i64::from(creature.no))
        .bind(&creature.name)
        .bind(Json(&creature.attributes))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, Some(creature.no), Some(&creature.name)))?;
        row.try_into()
    }

    async fn find(&self, limit: u32, offset: u32) -> StoreResult<Vec<Creature>> {
        let rows = sqlx::query_as::<_, PgCreatureRow>(
            r#"SELECT id, no, name, attributes
               FROM creatures
               ORDER BY no ASC
               LIMIT $1 OFFSET $2"#,
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.into_iter().map(Creature::try_from).collect()
    }

    async fn find_one(&self, filter: &CreatureFilter) -> StoreResult<Option<Creature>> {
        let query = match filter {
            CreatureFilter::No(no) => sqlx::query_as::<_, PgCreatureRow>(
                "SELECT id, no, name, attributes FROM creatures WHERE no = $1",
            )
            .bind(i64::from(*no)),
            CreatureFilter::Name(name) => sqlx::query_as::<_, PgCreatureRow>(
                "SELECT id, no, name, attributes FROM creatures WHERE name = $1",
            )
            .bind(name.clone()),
        };
        let row = query.fetch_optional(&self.pool).await.map_err(backend)?;
        row.map(Creature::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Creature>> {
        let row = sqlx::query_as::<_, PgCreatureRow>(
            "SELECT id, no, name, attributes FROM creatures WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.map(Creature::try_from).transpose()
    }

    async fn update_one(&self, id: Uuid, patch: &CreaturePatch) -> StoreResult<()> {
        sqlx::query(
            r#"UPDATE creatures
               SET no = COALESCE($2, no),
                   name = COALESCE($3, name),
                   attributes = attributes || $4
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(patch.no.map(i64::from))
        .bind(patch.name.as_deref())
        .bind(Json(&patch.attributes))
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, patch.no, patch.name.as_deref()))?;
        Ok(())
    }

    async fn delete_one(&self, id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM creatures WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }

    async fn delete_many(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM creatures")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }

    async fn insert_many(&self, creatures: Vec<NewCreature>) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        for creature in &creatures {
            sqlx::query(
                r#"INSERT INTO creatures (id, no, name, attributes)
                   VALUES ($1, $2, $3, $4)"#,
            )
            .bind(Uuid::new_v4())
            .bind(i64::from(creature.no))
            .bind(&creature.name)
            .bind(Json(&creature.attributes))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, Some(creature.no), Some(&creature.name)))?;
        }
        tx.commit().await.map_err(backend)?;
        Ok(creatures.len() as u64)
    }

    async fn count(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM creatures")
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        Ok(count as u64)
    }
}
