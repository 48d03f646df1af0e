//! Application context shared across route handlers.
//!
//! [`AppContext`] is handed to every handler via Axum state. It wraps the
//! picture store, the session scope, and the loaded configuration, all of
//! which are cheap to clone.

use std::sync::Arc;

use pv_core::config::{Config, StoreConfig};
use pv_core::{BlobBackend, Error, Result};
use pv_db::pool::DbPool;
use pv_store::blob::{FilesystemBlobStore, InlineBlobStore};
use pv_store::{BlobStore, PictureStore, RandomSessions, SessionScope, SqliteIndex};

/// Shared state for the HTTP layer.
#[derive(Clone)]
pub struct AppContext {
    pub store: PictureStore,
    pub sessions: Arc<dyn SessionScope>,
    pub config: Arc<Config>,
}

impl AppContext {
    pub fn new(store: PictureStore, sessions: Arc<dyn SessionScope>, config: Config) -> Self {
        Self {
            store,
            sessions,
            config: Arc::new(config),
        }
    }

    /// Open the database named in `config` and assemble the store it
    /// describes, with random session tokens.
    pub fn from_config(config: Config) -> Result<Self> {
        let db_path = &config.server.db_path;
        let existed = db_path.exists();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                tracing::info!("Created database directory {}", parent.display());
            }
        }

        let db_str = db_path.to_string_lossy();
        let pool = pv_db::pool::init_pool(&db_str)?;
        if existed {
            tracing::info!("Database opened (existing) at {db_str}");
        } else {
            tracing::info!("Database created (new) at {db_str}");
        }

        let store = build_store(&config.store, pool)?;
        Ok(Self::new(store, Arc::new(RandomSessions), config))
    }
}

/// Assemble a [`PictureStore`] from the store section of the config.
pub fn build_store(config: &StoreConfig, pool: DbPool) -> Result<PictureStore> {
    let blobs: Arc<dyn BlobStore> = match config.backend {
        BlobBackend::Filesystem => {
            if config.blob_dir.as_os_str().is_empty() {
                return Err(Error::invalid("store.blob_dir must be set for the filesystem backend"));
            }
            Arc::new(FilesystemBlobStore::new(config.blob_dir.clone()))
        }
        BlobBackend::Inline => Arc::new(InlineBlobStore::new()),
    };

    tracing::info!(
        mode = %config.mode,
        backend = %config.backend,
        "Picture store configured"
    );

    Ok(PictureStore::new(
        config.mode,
        blobs,
        Arc::new(SqliteIndex::new(pool)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pv_core::StoreMode;
    use pv_db::pool::init_memory_pool;

    #[test]
    fn build_store_honours_mode_and_backend() {
        let cfg = StoreConfig {
            mode: StoreMode::Singleton,
            backend: BlobBackend::Inline,
            ..StoreConfig::default()
        };
        let store = build_store(&cfg, init_memory_pool().unwrap()).unwrap();
        assert_eq!(store.mode(), StoreMode::Singleton);
        assert_eq!(store.blob_backend(), "inline");
    }

    #[test]
    fn filesystem_backend_needs_a_directory() {
        let cfg = StoreConfig {
            blob_dir: std::path::PathBuf::new(),
            ..StoreConfig::default()
        };
        assert!(build_store(&cfg, init_memory_pool().unwrap()).is_err());
    }

    #[test]
    fn from_config_creates_database_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.server.db_path = dir.path().join("db").join("picvault.db");
        cfg.store.blob_dir = dir.path().join("blobs");

        let ctx = AppContext::from_config(cfg).unwrap();
        assert!(dir.path().join("db").join("picvault.db").exists());
        assert_eq!(ctx.store.blob_backend(), "filesystem");
    }
}
