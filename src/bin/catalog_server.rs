//! Creature Catalog REST API Server
//!
//! ## Usage
//!
//! ```bash
//! # Postgres-backed
//! CATALOG_DATABASE_URL=postgresql://localhost/catalog cargo run --bin catalog_server
//!
//! # In-memory (no database URL)
//! cargo run --bin catalog_server -- --bind 127.0.0.1:3000
//!
//! curl http://localhost:3000/api/v2/seed
//! curl http://localhost:3000/api/v2/creatures?limit=5
//! curl http://localhost:3000/api/v2/creatures/pikachu
//! ```
//!
//! Settings are read from flags, then environment variables, then a `.env` file.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use url::Url;

use creature_catalog::api::build_router;
use creature_catalog::config::{
    DEFAULT_FEED_LIMIT, DEFAULT_FEED_TIMEOUT_SECS, DEFAULT_FEED_URL, DEFAULT_PAGE_LIMIT,
};
use creature_catalog::seed::{CatalogSeeder, HttpCatalogFeed};
use creature_catalog::store::{CreatureStore, InMemoryCreatureStore, PgCreatureStore};
use creature_catalog::{CatalogConfig, CatalogService};

#[derive(Debug, Parser)]
#[command(name = "catalog_server", about = "Creature catalog REST API server")]
struct Args {
    /// Address to listen on
    #[arg(long = "bind", env = "CATALOG_BIND_ADDR", default_value = "0.0.0.0:3000")]
    bind_addr: String,

    /// Postgres connection string; the in-memory store is used when absent
    #[arg(long, env = "CATALOG_DATABASE_URL")]
    database_url: Option<String>,

    /// Page size for listings without an explicit limit
    #[arg(long, env = "CATALOG_DEFAULT_LIMIT", default_value_t = DEFAULT_PAGE_LIMIT)]
    default_limit: u32,

    /// Listing endpoint of the external catalog feed
    #[arg(long, env = "CATALOG_FEED_URL", default_value = DEFAULT_FEED_URL)]
    feed_url: Url,

    /// Entries requested from the feed
    #[arg(long, env = "CATALOG_FEED_LIMIT", default_value_t = DEFAULT_FEED_LIMIT)]
    feed_limit: u32,

    /// Feed request timeout in seconds
    #[arg(long, env = "CATALOG_FEED_TIMEOUT_SECS", default_value_t = DEFAULT_FEED_TIMEOUT_SECS)]
    feed_timeout_secs: u64,
}

impl Args {
    fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig::default()
            .with_default_limit(self.default_limit)
            .with_feed_url(self.feed_url.clone())
            .with_feed_limit(self.feed_limit)
            .with_feed_timeout(Duration::from_secs(self.feed_timeout_secs))
    }
}

async fn open_store(database_url: Option<&str>) -> anyhow::Result<Arc<dyn CreatureStore>> {
    let Some(database_url) = database_url else {
        tracing::warn!("CATALOG_DATABASE_URL not set, using the in-memory store");
        return Ok(Arc::new(InMemoryCreatureStore::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("failed to connect to database")?;
    tracing::info!("Connected to database");

    let store = PgCreatureStore::new(pool);
    store
        .ensure_schema()
        .await
        .context("failed to prepare creatures table")?;
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,creature_catalog=debug".into()),
        )
        .init();

    let args = Args::parse();
    let config = args.catalog_config();
    config.validate()?;

    let store = open_store(args.database_url.as_deref()).await?;
    let feed = Arc::new(HttpCatalogFeed::new(&config)?);

    let seeder = Arc::new(CatalogSeeder::new(
        Arc::clone(&store),
        feed,
        config.feed_limit,
    ));
    let catalog = Arc::new(CatalogService::new(store, config));

    let app = build_router(catalog, seeder)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&args.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", args.bind_addr))?;
    tracing::info!("catalog_server listening on {}", args.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
