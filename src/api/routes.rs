//! Catalog routes
//!
//! ## Endpoints
//!
//! - `POST   /api/v2/creatures`        - create a creature
//! - `GET    /api/v2/creatures`        - list, `?limit=&offset=`, ordered by `no`
//! - `GET    /api/v2/creatures/:term`  - resolve by `no`, id or name
//! - `PATCH  /api/v2/creatures/:term`  - partial update, returns the merged creature
//! - `DELETE /api/v2/creatures/:id`    - delete by id
//! - `GET    /api/v2/seed`             - wipe and reload the catalog from the feed
//! - `GET    /api/v2/seed/status`      - phase of the last reseed
//! - `GET    /api/v2/health`           - liveness

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};

use super::error::AppError;
use crate::models::{Creature, CreaturePatch, ListQuery, NewCreature};
use crate::seed::{CatalogSeeder, SeedPhase, SeedReport};
use crate::service::CatalogService;

pub const API_PREFIX: &str = "/api/v2";

/// Build the catalog router with its shared state attached.
pub fn build_router(catalog: Arc<CatalogService>, seeder: Arc<CatalogSeeder>) -> Router {
    let api = Router::new()
        .route("/creatures", get(list_creatures).post(create_creature))
        // one parameter name per segment: the delete handler reads it as an id
        .route(
            "/creatures/:term",
            get(find_creature)
                .patch(update_creature)
                .delete(remove_creature),
        )
        .route("/seed", get(reseed))
        .route("/seed/status", get(seed_status))
        .route("/health", get(health));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(Extension(catalog))
        .layer(Extension(seeder))
}

// ============================================================================
// Handlers
// ============================================================================

async fn create_creature(
    Extension(catalog): Extension<Arc<CatalogService>>,
    payload: Result<Json<NewCreature>, JsonRejection>,
) -> Result<(StatusCode, Json<Creature>), AppError> {
    let Json(payload) = payload?;
    let created = catalog.create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_creatures(
    Extension(catalog): Extension<Arc<CatalogService>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Creature>>, AppError> {
    let Query(query) = query?;
    Ok(Json(catalog.list(query).await?))
}

async fn find_creature(
    Extension(catalog): Extension<Arc<CatalogService>>,
    Path(term): Path<String>,
) -> Result<Json<Creature>, AppError> {
    Ok(Json(catalog.find_one(&term).await?))
}

async fn update_creature(
    Extension(catalog): Extension<Arc<CatalogService>>,
    Path(term): Path<String>,
    patch: Result<Json<CreaturePatch>, JsonRejection>,
) -> Result<Json<Creature>, AppError> {
    let Json(patch) = patch?;
    Ok(Json(catalog.update(&term, patch).await?))
}

async fn remove_creature(
    Extension(catalog): Extension<Arc<CatalogService>>,
    Path(id): Path<String>,
) -> Result<String, AppError> {
    Ok(catalog.remove(&id).await?)
}

async fn reseed(
    Extension(seeder): Extension<Arc<CatalogSeeder>>,
) -> Result<Json<SeedReport>, AppError> {
    Ok(Json(seeder.reseed().await?))
}

async fn seed_status(Extension(seeder): Extension<Arc<CatalogSeeder>>) -> Json<SeedPhase> {
    Json(seeder.phase())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
