use std::sync::Arc;

use lazy_static::lazy_static;

use crate::buffer_pool::{BufferPool, BufferPoolConfig};
use crate::catalog::Catalog;
use crate::lock_manager::LockManager;

lazy_static! {
    static ref GLOBAL_DB: Arc<Database> = Arc::new(Database::new(BufferPoolConfig::default()));
}

// Returns the process-wide database instance, creating it on first use.
// The buffer pool, lock manager and catalog are global, shared
// collaborators reached from every layer above them.
pub fn get_global_db() -> Arc<Database> {
    Arc::clone(&GLOBAL_DB)
}

// Ties together the three shared collaborators every transaction touches:
// the buffer pool, the lock manager it delegates to, and the catalog that
// maps table ids/names to `HeapFile`s.
pub struct Database {
    buffer_pool: Arc<BufferPool>,
    lock_manager: LockManager,
    catalog: Catalog,
}

impl Database {
    pub fn new(config: BufferPoolConfig) -> Self {
        Database {
            buffer_pool: Arc::new(BufferPool::new(config)),
            lock_manager: LockManager::new(),
            catalog: Catalog::new(),
        }
    }

    // Cheap: the pool lives behind the `Arc` already, so every caller that
    // needs to hold onto it (an operator tree, a worker thread) shares the
    // same resident-page cache rather than cloning it.
    pub fn buffer_pool(&self) -> Arc<BufferPool> {
        Arc::clone(&self.buffer_pool)
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}
