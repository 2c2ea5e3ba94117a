use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use log::debug;

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::error::{not_found, page_out_of_range, DbResult};
use crate::page::HeapPage;
use crate::page_id::PageId;
use crate::permissions::Permission;
use crate::transaction::TransactionId;
use crate::tuple::Tuple;
use crate::tuple_desc::TupleDesc;
use crate::util::HandyRwLock;

/// A file on disk whose length is always a multiple of the page size;
/// page `k` occupies bytes `[k*P, (k+1)*P)` (spec.md §3/§4.2).
pub struct HeapFile {
    id: u64,
    path: PathBuf,
    desc: Arc<TupleDesc>,
    page_size: usize,
    file: Mutex<File>,
    /// Serializes "no free slot found, extend the file by one page" so
    /// two concurrent inserts never both append (spec.md §4.2,
    /// "Concurrency").
    extend_lock: Mutex<()>,
}

impl HeapFile {
    pub fn new<P: AsRef<Path>>(path: P, desc: Arc<TupleDesc>, page_size: usize) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).create(true).open(&path)?;

        let canonical = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        let id = fnv1a_64(canonical.to_string_lossy().as_bytes());

        Ok(Self {
            id,
            path,
            desc,
            page_size,
            file: Mutex::new(file),
            extend_lock: Mutex::new(()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `file_length / page_size`, exact integer division. The source
    /// project's truncating division for non-multiple lengths is not
    /// reproduced here: file length is required to always be a multiple
    /// of the page size (spec.md §9, Open Question 1).
    pub fn num_pages(&self) -> DbResult<usize> {
        let len = self.file.lock().unwrap().metadata()?.len() as usize;
        debug_assert_eq!(len % self.page_size, 0, "heap file length must be a multiple of page_size");
        Ok(len / self.page_size)
    }

    pub fn read_page(&self, page_number: usize) -> DbResult<HeapPage> {
        let mut buf = vec![0u8; self.page_size];
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((page_number * self.page_size) as u64))?;
        let read = file.read(&mut buf)?;
        if read < self.page_size {
            return Err(page_out_of_range(format!(
                "page {} of {:?} is out of range",
                page_number, self.path
            )));
        }
        let pid = PageId::new(self.id, page_number);
        HeapPage::new(pid, self.page_size, self.desc.clone(), &buf)
    }

    pub fn write_page(&self, page: &HeapPage) -> DbResult<()> {
        let data = page.page_data();
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((page.page_id().page_number * self.page_size) as u64))?;
        file.write_all(&data)?;
        file.flush()?;
        Ok(())
    }

    fn append_empty_page(&self) -> DbResult<usize> {
        let mut file = self.file.lock().unwrap();
        let page_number = (file.metadata()?.len() as usize) / self.page_size;
        file.seek(SeekFrom::End(0))?;
        file.write_all(&HeapPage::empty_page_data(self.page_size))?;
        file.flush()?;
        Ok(page_number)
    }

    /// Scans existing pages under `READ_ONLY` to probe for a free slot,
    /// releasing the probe lock before re-acquiring `READ_WRITE` to
    /// commit the insert; extends the file by one page if none is found.
    /// Returns the modified pages, dirtied under `tid`.
    pub fn insert_tuple(
        &self,
        bp: &BufferPool,
        catalog: &Catalog,
        tid: TransactionId,
        t: Tuple,
    ) -> DbResult<Vec<PageId>> {
        let num_pages = self.num_pages()?;

        for page_number in 0..num_pages {
            let pid = PageId::new(self.id, page_number);
            let has_room = {
                let page = bp.get_page(tid, pid, Permission::ReadOnly, catalog)?;
                let guard = page.rl();
                guard.num_empty_slots() > 0
            };
            if !has_room {
                continue;
            }

            // Release the probe lock before escalating, as required by
            // spec.md §4.2, then commit the insert under READ_WRITE.
            bp.unsafe_release_page(tid, pid);
            let page = bp.get_page(tid, pid, Permission::ReadWrite, catalog)?;
            let mut guard = page.wl();
            if guard.num_empty_slots() == 0 {
                // Lost the race to another writer; try the next page.
                drop(guard);
                continue;
            }
            guard.insert_tuple(t)?;
            guard.mark_dirty(true, tid);
            return Ok(vec![pid]);
        }

        let _extend_guard = self.extend_lock.lock().unwrap();
        // Re-check under the extension lock: another thread may have
        // appended a page with room while we were scanning.
        let num_pages_now = self.num_pages()?;
        for page_number in num_pages..num_pages_now {
            let pid = PageId::new(self.id, page_number);
            let page = bp.get_page(tid, pid, Permission::ReadWrite, catalog)?;
            let mut guard = page.wl();
            if guard.num_empty_slots() > 0 {
                guard.insert_tuple(t)?;
                guard.mark_dirty(true, tid);
                return Ok(vec![pid]);
            }
        }

        let page_number = self.append_empty_page()?;
        let pid = PageId::new(self.id, page_number);
        debug!("extended {:?} to page {}", self.path, page_number);
        let page = bp.get_page(tid, pid, Permission::ReadWrite, catalog)?;
        let mut guard = page.wl();
        guard.insert_tuple(t)?;
        guard.mark_dirty(true, tid);
        Ok(vec![pid])
    }

    pub fn delete_tuple(&self, bp: &BufferPool, catalog: &Catalog, tid: TransactionId, t: &Tuple) -> DbResult<Vec<PageId>> {
        let rid = t.record_id().ok_or_else(|| not_found("tuple has no record id"))?;
        if rid.page_id.table_id != self.id {
            return Err(not_found("tuple does not belong to this heap file"));
        }

        let page = bp.get_page(tid, rid.page_id, Permission::ReadWrite, catalog)?;
        let mut guard = page.wl();
        guard.delete_tuple(t)?;
        guard.mark_dirty(true, tid);
        Ok(vec![rid.page_id])
    }

    /// A rewindable iterator over every tuple in the file, acquiring
    /// `READ_ONLY` per page through the buffer pool.
    pub fn iter<'a>(&'a self, bp: &'a BufferPool, catalog: &'a Catalog, tid: TransactionId) -> HeapFileIter<'a> {
        HeapFileIter { file: self, bp, catalog, tid, page_number: 0, current: Vec::new().into_iter() }
    }
}

pub struct HeapFileIter<'a> {
    file: &'a HeapFile,
    bp: &'a BufferPool,
    catalog: &'a Catalog,
    tid: TransactionId,
    page_number: usize,
    current: std::vec::IntoIter<Tuple>,
}

impl<'a> HeapFileIter<'a> {
    pub fn rewind(&mut self) {
        self.page_number = 0;
        self.current = Vec::new().into_iter();
    }

    fn advance_page(&mut self) -> DbResult<bool> {
        let num_pages = self.file.num_pages()?;
        while self.page_number < num_pages {
            let pid = PageId::new(self.file.id, self.page_number);
            self.page_number += 1;
            let page = self.bp.get_page(self.tid, pid, Permission::ReadOnly, self.catalog)?;
            let guard = page.rl();
            let tuples: Vec<Tuple> = guard.iter().cloned().collect();
            if !tuples.is_empty() {
                self.current = tuples.into_iter();
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<'a> Iterator for HeapFileIter<'a> {
    type Item = DbResult<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(t) = self.current.next() {
                return Some(Ok(t));
            }
            match self.advance_page() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Deterministic 64-bit FNV-1a hash, used to derive a stable table id
/// from a file's canonical path so that restarts see the same id
/// (spec.md §3). `DefaultHasher` is explicitly not used here since its
/// seed is randomized per process.
fn fnv1a_64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
