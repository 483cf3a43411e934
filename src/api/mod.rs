//! REST API for the creature catalog
//!
//! All routes live under `/api/v2`. Handlers are thin: they extract the
//! request, call [`CatalogService`](crate::service::CatalogService) or
//! [`CatalogSeeder`](crate::seed::CatalogSeeder), and map `CatalogError`
//! to a status code through [`AppError`].

pub mod error;
pub mod routes;

pub use error::AppError;
pub use routes::{build_router, API_PREFIX};
