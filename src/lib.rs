//! Harbor - browser session archive ingestion and evidence browsing platform.
//!
//! Ingests HAR capture archives of social-media sessions into a normalized,
//! deduplicated entity store (accounts, posts, media) with locally
//! materialized assets, and serves the result through an access-controlled
//! query and search API with signed file references.

pub mod assets;
pub mod cli;
pub mod config;
pub mod entities;
pub mod har;
pub mod models;
pub mod pipeline;
pub mod repository;
pub mod schema;
pub mod server;
pub mod structures;
