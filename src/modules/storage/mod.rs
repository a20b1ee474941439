//! Lifecycle of the shared document store.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use shelf_db::{DocumentStore, MemoryStore};
use shelf_kernel::{InitCtx, Module};

/// Core module owning the store: restores the snapshot before traffic, writes it after.
pub struct StorageModule {
    store: Arc<MemoryStore>,
    snapshot_path: Option<PathBuf>,
}

impl StorageModule {
    pub fn new(store: Arc<MemoryStore>, snapshot_path: Option<PathBuf>) -> Self {
        Self {
            store,
            snapshot_path,
        }
    }
}

#[async_trait]
impl Module for StorageModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let Some(path) = self.snapshot_path.clone() else {
            tracing::info!(
                module = self.name(),
                database = self.store.name(),
                "no snapshot configured, data lives in memory only"
            );
            return Ok(());
        };

        let store = Arc::clone(&self.store);
        let display = path.display().to_string();
        let loaded = tokio::task::spawn_blocking(move || store.load_snapshot(&path))
            .await
            .context("snapshot loader panicked")?
            .with_context(|| format!("failed to load snapshot from {}", display))?;

        tracing::info!(
            module = self.name(),
            database = self.store.name(),
            documents = loaded,
            "store ready"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let Some(path) = self.snapshot_path.clone() else {
            return Ok(());
        };

        let store = Arc::clone(&self.store);
        let display = path.display().to_string();
        tokio::task::spawn_blocking(move || store.save_snapshot(&path))
            .await
            .context("snapshot writer panicked")?
            .with_context(|| format!("failed to write snapshot to {}", display))?;

        Ok(())
    }
}

/// Create the storage module for `store`
pub fn create_module(store: Arc<MemoryStore>, snapshot_path: Option<PathBuf>) -> Arc<dyn Module> {
    Arc::new(StorageModule::new(store, snapshot_path))
}
