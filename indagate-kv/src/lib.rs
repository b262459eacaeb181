//! Indagate KV - transactional bucket storage
//!
//! Entity stores talk to storage only through [`Store`], [`Transaction`],
//! [`Bucket`] and [`Cursor`]. Two engines implement them: [`MemoryStore`] for
//! tests and ephemeral deployments, and [`RedbStore`] for a single-file
//! embedded database.

pub mod error;
pub mod memory;
pub mod redb_store;
pub mod store;

pub use error::{KvError, KvResult};
pub use memory::MemoryStore;
pub use redb_store::RedbStore;
pub use store::{Bucket, Cursor, Entry, Store, StoreExt, Transaction, TxFn};

use indagate_core::{Result, StorageConfig, StorageEngine};
use std::sync::Arc;
use tracing::info;

/// Build the engine named by `config`
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn Store>> {
    match config.engine {
        StorageEngine::Memory => {
            info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageEngine::Redb => Ok(Arc::new(RedbStore::open(config.resolved_path())?)),
    }
}
