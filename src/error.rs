//! Error types for the creature catalog
//!
//! `CatalogError` is what every core operation returns. Lower layers have
//! their own error enums (`StoreError`, `FeedError`) which the service and
//! the seeder translate at the boundary.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    NotFound(String),

    #[error("Duplicate creature: {key} = {value}")]
    Conflict {
        key: String,
        value: serde_json::Value,
    },

    #[error("{0}")]
    BadRequest(String),

    /// Unexpected store or network failure. `source` is for operators only
    /// and never rendered to callers.
    #[error("could not {context}: check server logs")]
    Internal {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl CatalogError {
    /// Build an `Internal` error and log it. This is the only constructor
    /// used by the crate, so every server-side failure reaches the logs.
    pub fn internal(context: &'static str, source: impl Into<anyhow::Error>) -> Self {
        let source = source.into();
        tracing::error!(context, error = ?source, "catalog operation failed");
        Self::Internal { context, source }
    }

    pub fn not_found() -> Self {
        Self::NotFound("Creature not found".to_string())
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Conflict { .. } => 409,
            Self::BadRequest(_) => 400,
            Self::Internal { .. } => 500,
        }
    }

    /// Short reason phrase used in API error bodies.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Not Found",
            Self::Conflict { .. } => "Conflict",
            Self::BadRequest(_) => "Bad Request",
            Self::Internal { .. } => "Internal Server Error",
        }
    }
}
