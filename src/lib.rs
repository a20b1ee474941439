//! Shelf application library
//!
//! A book-rental record keeper: book inventory counts and active rental records,
//! served over HTTP. The rental ledger lives in [`modules::books`].

pub mod modules;

use std::sync::Arc;

use anyhow::Context;
use shelf_db::MemoryStore;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Build the module registry around a fresh, empty store.
pub fn assemble(settings: &Settings) -> ModuleRegistry {
    let store = Arc::new(MemoryStore::new(settings.database.name.clone()));
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, store, settings);
    registry
}

/// Boot every module, serve until shutdown, then stop every module.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let registry = assemble(&settings);
    let ctx = InitCtx {
        settings: &settings,
    };

    registry
        .boot(&ctx)
        .await
        .context("failed to boot shelf modules")?;
    tracing::info!(
        modules = registry.core_module_count() + registry.custom_module_count(),
        "shelf bootstrap complete"
    );

    let served = shelf_http::start_server(&registry, &settings).await;

    // Stop modules even when serving failed so the snapshot still gets written
    registry
        .shutdown()
        .await
        .context("failed to stop shelf modules")?;

    served
}
