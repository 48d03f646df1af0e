//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, a temporary blob
//! directory, and a full [`AppContext`]. The [`TestHarness::with_server`]
//! constructor starts Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use pv_core::config::Config;
use pv_core::{BlobBackend, StoreMode};
use pv_db::pool::{init_memory_pool, DbPool};
use pv_server::context::{build_store, AppContext};
use pv_store::RandomSessions;

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database and a temporary blob directory.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub dir: tempfile::TempDir,
}

impl TestHarness {
    /// Sequential mode over the filesystem backend.
    pub fn new() -> Self {
        Self::with_mode(StoreMode::Sequential, BlobBackend::Filesystem)
    }

    pub fn with_mode(mode: StoreMode, backend: BlobBackend) -> Self {
        let mut config = Config::default();
        config.store.mode = mode;
        config.store.backend = backend;
        Self::with_config(config)
    }

    /// Build a harness from `config`, redirecting the blob directory into a
    /// fresh temp dir.
    pub fn with_config(mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        config.store.blob_dir = dir.path().join("blobs");

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let store = build_store(&config.store, db.clone()).expect("failed to build store");
        let ctx = AppContext::new(store, Arc::new(RandomSessions), config);

        Self { ctx, db, dir }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    pub async fn with_server_mode(mode: StoreMode, backend: BlobBackend) -> (Self, SocketAddr) {
        Self::with_mode(mode, backend).serve().await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        Self::with_config(config).serve().await
    }

    async fn serve(self) -> (Self, SocketAddr) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            pv_server::serve(listener, ctx, std::future::pending()).await.ok();
        });

        (self, addr)
    }

    /// Number of blob files currently on disk.
    pub fn blob_count(&self) -> usize {
        match std::fs::read_dir(self.dir.path().join("blobs")) {
            Ok(entries) => entries.filter_map(|e| e.ok()).count(),
            Err(_) => 0,
        }
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> pv_db::pool::PooledConnection {
        pv_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }
}

/// Multipart form carrying `bytes` as the `picture` field.
pub fn picture_form(filename: &str, bytes: &[u8]) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(filename.to_string());
    reqwest::multipart::Form::new().part("picture", part)
}
