//! Bulk seeding of the catalog from an external feed

pub mod feed;
pub mod seeder;

pub use feed::{CatalogFeed, FeedEntry, FeedError, FeedPage, HttpCatalogFeed};
pub use seeder::{
    to_new_creatures, CatalogSeeder, SeedPhase, SeedReport, SeedStep, SEED_SUCCESS_MESSAGE,
};
