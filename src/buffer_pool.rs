use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::{debug, warn};
use rand::seq::SliceRandom;

use crate::common::{PageId, TableId};
use crate::database;
use crate::error::{DbError, Result};
use crate::heap_file::HeapFile;
use crate::heap_page::{HeapPage, Permission};
use crate::lock_manager::LockMode;
use crate::transaction::TransactionId;
use crate::tuple::Tuple;

pub struct BufferPoolConfig {
    pub capacity: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        BufferPoolConfig { capacity: 50 }
    }
}

// The single entry point for all page I/O: a bounded cache of resident
// pages, each guarded by a page-level lock acquired through the lock
// manager, with NO-STEAL/FORCE commit discipline.
pub struct BufferPool {
    pages: RwLock<HashMap<PageId, Arc<RwLock<HeapPage>>>>,
    files: RwLock<HashMap<TableId, Arc<HeapFile>>>,
    capacity: usize,
}

impl BufferPool {
    pub fn new(config: BufferPoolConfig) -> Self {
        BufferPool {
            pages: RwLock::new(HashMap::new()),
            files: RwLock::new(HashMap::new()),
            capacity: config.capacity,
        }
    }

    // Registers `file` so this pool can resolve its pages without going
    // through the global catalog. Every `HeapFile` constructed directly
    // (bypassing `Catalog::add_table`) must be registered here before its
    // pages are fetched; `insert_tuple`/`delete_tuple`/`get_page` all read
    // from this map first and only fall back to the global catalog.
    pub fn register_file(&self, file: &Arc<HeapFile>) {
        self.files.write().unwrap().insert(file.id(), Arc::clone(file));
    }

    fn resolve_file(&self, table_id: TableId) -> Result<Arc<HeapFile>> {
        if let Some(file) = self.files.read().unwrap().get(&table_id) {
            return Ok(Arc::clone(file));
        }
        database::get_global_db().catalog().file(table_id)
    }

    // Returns the resident page, acquiring the lock `perm` requires first.
    // A transaction caught in a deadlock is aborted on the spot: its dirty
    // pages are discarded and its locks released before the error is
    // returned, so the caller only ever sees `TransactionAborted`.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permission,
    ) -> Result<Arc<RwLock<HeapPage>>> {
        let mode = match perm {
            Permission::Read => LockMode::Shared,
            Permission::Write => LockMode::Exclusive,
        };
        let db = database::get_global_db();
        if let Err(DbError::Deadlock(_)) = db.lock_manager().acquire(tid, pid, mode) {
            self.transaction_complete(tid, false);
            return Err(DbError::TransactionAborted);
        }

        if let Some(page) = self.pages.read().unwrap().get(&pid) {
            return Ok(Arc::clone(page));
        }

        let file = self.resolve_file(pid.0)?;
        let page = file.read_page(pid.1)?;
        self.install(pid, page)
    }

    // Inserts a freshly read or allocated page into the pool, evicting a
    // clean resident page at random if at capacity.
    fn install(&self, pid: PageId, page: HeapPage) -> Result<Arc<RwLock<HeapPage>>> {
        let mut pages = self.pages.write().unwrap();
        if let Some(existing) = pages.get(&pid) {
            return Ok(Arc::clone(existing));
        }
        if pages.len() >= self.capacity {
            self.evict_one(&mut pages)?;
        }
        let entry = Arc::new(RwLock::new(page));
        pages.insert(pid, Arc::clone(&entry));
        Ok(entry)
    }

    // Evicts a random clean page. Dirty pages are never eviction
    // candidates (NO-STEAL); if every resident page is dirty the pool is
    // genuinely full and insertion fails.
    fn evict_one(&self, pages: &mut HashMap<PageId, Arc<RwLock<HeapPage>>>) -> Result<()> {
        let clean: Vec<PageId> = pages
            .iter()
            .filter(|(_, p)| !p.read().unwrap().is_dirty())
            .map(|(pid, _)| *pid)
            .collect();
        let victim = clean
            .choose(&mut rand::thread_rng())
            .copied()
            .ok_or_else(|| {
                DbError::DbLogicError(
                    "buffer pool is full and every resident page is dirty".to_string(),
                )
            })?;
        debug!("evicting {:?}", victim);
        pages.remove(&victim);
        Ok(())
    }

    // Releases a lock early without ending the transaction. Hazardous:
    // only `HeapFile`'s free-slot probe should call this.
    pub(crate) fn release_probe_lock(&self, tid: TransactionId, pid: PageId) {
        database::get_global_db().lock_manager().release(tid, pid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        database::get_global_db().lock_manager().holds_lock(tid, pid)
    }

    pub fn insert_tuple(&self, tid: TransactionId, table_id: i32, tuple: Tuple) -> Result<()> {
        let file = self.resolve_file(table_id)?;
        file.insert_tuple(self, tid, tuple)
    }

    pub fn delete_tuple(&self, tid: TransactionId, table_id: i32, tuple: &Tuple) -> Result<()> {
        let file = self.resolve_file(table_id)?;
        file.delete_tuple(self, tid, tuple)
    }

    // Ends `tid`. On commit, every page it dirtied is flushed before locks
    // are released (FORCE). On abort, its dirty pages are dropped from the
    // pool outright, so the next reader re-reads a clean image from disk
    // (NO-STEAL means disk never held anything else).
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) {
        let dirtied: Vec<PageId> = {
            let pages = self.pages.read().unwrap();
            pages
                .iter()
                .filter(|(_, p)| p.read().unwrap().dirtying_tid() == Some(tid))
                .map(|(pid, _)| *pid)
                .collect()
        };

        for pid in dirtied {
            if commit {
                let pages = self.pages.read().unwrap();
                if let Some(page) = pages.get(&pid) {
                    let mut guard = page.write().unwrap();
                    if let Ok(file) = self.resolve_file(pid.0) {
                        if let Err(e) = file.write_page(&guard) {
                            warn!("failed to flush {:?} on commit: {:?}", pid, e);
                        } else {
                            guard.mark_dirty(None);
                        }
                    }
                }
            } else {
                self.pages.write().unwrap().remove(&pid);
            }
        }

        database::get_global_db().lock_manager().release_all(tid);
    }

    // Flushes every dirty resident page regardless of owning transaction.
    // An administrative operation, not part of transaction commit/abort.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages = self.pages.read().unwrap();
        for (pid, page) in pages.iter() {
            let mut guard = page.write().unwrap();
            if guard.is_dirty() {
                let file = self.resolve_file(pid.0)?;
                file.write_page(&guard)?;
                guard.mark_dirty(None);
            }
        }
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn resident_count(&self) -> usize {
        self.pages.read().unwrap().len()
    }
}
