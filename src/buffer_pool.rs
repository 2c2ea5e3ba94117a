use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use log::debug;
use once_cell::sync::OnceCell;

use crate::catalog::Catalog;
use crate::error::{buffer_full, DbResult};
use crate::lock_manager::LockManager;
use crate::page::HeapPage;
use crate::page_id::PageId;
use crate::permissions::Permission;
use crate::transaction::TransactionId;
use crate::tuple::Tuple;
use crate::util::HandyRwLock;

pub const DEFAULT_PAGE_SIZE: usize = 4096;
pub const DEFAULT_NUM_PAGES: usize = 50;

static PAGE_SIZE: OnceCell<usize> = OnceCell::new();

/// The process-wide page size (spec.md §6). Defaults to
/// [`DEFAULT_PAGE_SIZE`] until `set_page_size` is called.
pub fn get_page_size() -> usize {
    *PAGE_SIZE.get_or_init(|| DEFAULT_PAGE_SIZE)
}

/// Test-only: override the process-wide page size. Only takes effect if
/// called before the first `get_page_size()`/heap-file creation.
pub fn set_page_size(size: usize) {
    let _ = PAGE_SIZE.set(size);
}

/// A bounded cache of up to `capacity` pages keyed by [`PageId`], with a
/// NO-STEAL/FORCE policy at commit (spec.md §4.4).
pub struct BufferPool {
    capacity: usize,
    cache: Mutex<HashMap<PageId, Arc<RwLock<HeapPage>>>>,
    lock_manager: LockManager,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            cache: Mutex::new(HashMap::new()),
            lock_manager: LockManager::new(),
        }
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn size(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    /// Acquires the requested lock (may block or fail with `Aborted`),
    /// then returns the cached page, loading it through its heap file on
    /// a miss and evicting a clean page first if the cache is full.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permission,
        catalog: &Catalog,
    ) -> DbResult<Arc<RwLock<HeapPage>>> {
        self.lock_manager.acquire(tid, pid, perm.to_lock_mode())?;

        if let Some(page) = self.cache.lock().unwrap().get(&pid) {
            return Ok(page.clone());
        }

        if self.size() >= self.capacity {
            self.evict_one()?;
        }

        let heap_file = catalog.get_file(pid.table_id)?;
        let page = heap_file.read_page(pid.page_number)?;
        let page = Arc::new(RwLock::new(page));

        let mut cache = self.cache.lock().unwrap();
        // Another thread may have loaded the same page while we read it
        // from disk; prefer whatever is already cached.
        let page = cache.entry(pid).or_insert(page).clone();
        Ok(page)
    }

    /// Releases `tid`'s lock on `pid` outright, bypassing the normal
    /// release-only-at-`transaction_complete` discipline. Used only by
    /// `HeapFile::insert_tuple`'s probe step (spec.md §4.2/§4.4).
    pub fn unsafe_release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release(tid, pid);
    }

    /// Evict one clean page. Fails with `BufferFull` if every cached
    /// page is dirty — under NO-STEAL, a dirty page can never be
    /// written out early, so there is nothing safe to evict.
    fn evict_one(&self) -> DbResult<()> {
        let victim = {
            let cache = self.cache.lock().unwrap();
            cache
                .iter()
                .find(|(_, page)| page.rl().is_dirty().is_none())
                .map(|(pid, _)| *pid)
        };

        match victim {
            Some(pid) => {
                debug!("evicting clean page {:?}", pid);
                self.cache.lock().unwrap().remove(&pid);
                // Safe: a clean page under NO-STEAL has no uncommitted
                // writer, so dropping its locks can't strand a writer.
                self.lock_manager.release_all_on_page(pid);
                Ok(())
            }
            None => Err(buffer_full("every cached page is dirty")),
        }
    }

    pub fn insert_tuple(&self, tid: TransactionId, table_id: u64, t: Tuple, catalog: &Catalog) -> DbResult<()> {
        let heap_file = catalog.get_file(table_id)?;
        heap_file.insert_tuple(self, catalog, tid, t)?;
        Ok(())
    }

    pub fn delete_tuple(&self, tid: TransactionId, t: &Tuple, catalog: &Catalog) -> DbResult<()> {
        let rid = t.record_id().ok_or_else(|| crate::error::not_found("tuple has no record id"))?;
        let heap_file = catalog.get_file(rid.page_id.table_id)?;
        heap_file.delete_tuple(self, catalog, tid, t)?;
        Ok(())
    }

    /// On commit, flushes every page dirtied by `tid` (FORCE) and clears
    /// its dirty flag. On abort, re-reads every such page from disk,
    /// reverting the cached copy in place. Either way, releases all of
    /// `tid`'s locks afterward (spec.md §4.4, §9).
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool, catalog: &Catalog) -> DbResult<()> {
        let dirty_pids: Vec<PageId> = {
            let cache = self.cache.lock().unwrap();
            cache
                .iter()
                .filter(|(_, page)| page.rl().is_dirty() == Some(tid))
                .map(|(pid, _)| *pid)
                .collect()
        };

        for pid in dirty_pids {
            let page = {
                let cache = self.cache.lock().unwrap();
                cache.get(&pid).cloned()
            };
            let Some(page) = page else { continue };

            if commit {
                let mut guard = page.wl();
                let heap_file = catalog.get_file(pid.table_id)?;
                heap_file.write_page(&guard)?;
                guard.mark_dirty(false, tid);
            } else {
                let heap_file = catalog.get_file(pid.table_id)?;
                let reverted = heap_file.read_page(pid.page_number)?;
                *page.wl() = reverted;
            }
        }

        self.lock_manager.release_all(tid);
        Ok(())
    }

    /// Flushes every dirty page regardless of owner. Test/administrative
    /// use only — calling this mid-transaction breaks the NO-STEAL
    /// invariant (spec.md §4.4).
    pub fn flush_all_pages(&self, catalog: &Catalog) -> DbResult<()> {
        let entries: Vec<(PageId, Arc<RwLock<HeapPage>>)> =
            self.cache.lock().unwrap().iter().map(|(pid, page)| (*pid, page.clone())).collect();

        for (pid, page) in entries {
            let mut guard = page.wl();
            if let Some(tid) = guard.is_dirty() {
                let heap_file = catalog.get_file(pid.table_id)?;
                heap_file.write_page(&guard)?;
                guard.mark_dirty(false, tid);
            }
        }
        Ok(())
    }

    /// Removes a page without flushing it and releases all locks on it.
    /// Used by callers that have already guaranteed durability another
    /// way (e.g. test harnesses resetting state between runs).
    pub fn discard_page(&self, pid: PageId) {
        self.cache.lock().unwrap().remove(&pid);
        self.lock_manager.release_all_on_page(pid);
    }

    /// Test-only: drop every cached page without flushing.
    pub fn clear(&self) {
        self.cache.lock().unwrap().clear();
    }
}
