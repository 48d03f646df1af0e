//! pv-db: metadata persistence layer.
//!
//! This crate provides SQLite-backed storage for picture metadata with
//! connection pooling, embedded migrations, row mapping, and the
//! `pictures` query module.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
