pub mod books;
pub mod rentals;
pub mod storage;

use std::sync::Arc;

use shelf_db::MemoryStore;
use shelf_kernel::{settings::Settings, ModuleRegistry};

use books::ledger::RentalLedger;

/// Register all shelf modules around a single shared store
pub fn register_all(registry: &mut ModuleRegistry, store: Arc<MemoryStore>, settings: &Settings) {
    let ledger = Arc::new(RentalLedger::new(store.clone()));

    registry.register_core(storage::create_module(
        store,
        settings.database.snapshot_path.clone(),
    ));
    registry.register_custom(books::create_module(ledger.clone()));
    registry.register_custom(rentals::create_module(ledger));
}
