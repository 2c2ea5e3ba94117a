//! Minimal pull-iterator operators. These are deliberately thin: the
//! operator tree, catalog-driven planning, and parsing are out of scope
//! and treated as external collaborators calling into the buffer pool
//! and heap files through the public interfaces in [`crate::buffer_pool`]
//! and [`crate::heap_file`]. They exist so those interfaces have at
//! least one real caller exercised end to end.

use std::sync::Arc;

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::error::DbResult;
use crate::field::Op;
use crate::heap_file::HeapFile;
use crate::permissions::Permission;
use crate::transaction::TransactionId;
use crate::tuple::Tuple;
use crate::tuple_desc::TupleDesc;
use crate::util::HandyRwLock;

/// A predicate over one field of a tuple: `tuple.field(field_index) op
/// value`.
pub struct Predicate {
    pub field_index: usize,
    pub op: Op,
    pub value: crate::field::Field,
}

impl Predicate {
    pub fn new(field_index: usize, op: Op, value: crate::field::Field) -> Self {
        Self { field_index, op, value }
    }

    pub fn matches(&self, t: &Tuple) -> DbResult<bool> {
        t.field(self.field_index).compare(self.op, &self.value)
    }
}

/// A full scan of one table's heap file under a transaction, reading
/// each page through the buffer pool (spec.md §6: `HeapFile.iterator`).
/// Holds its own `Arc<HeapFile>` rather than borrowing `HeapFileIter`'s
/// reference, so it owns everything it needs beyond `bp`/`catalog`.
pub struct SeqScan<'a> {
    bp: &'a BufferPool,
    catalog: &'a Catalog,
    tid: TransactionId,
    file: Arc<HeapFile>,
    page_number: usize,
    current: std::vec::IntoIter<Tuple>,
}

impl<'a> SeqScan<'a> {
    pub fn new(bp: &'a BufferPool, catalog: &'a Catalog, tid: TransactionId, table_id: u64) -> DbResult<Self> {
        let file = catalog.get_file(table_id)?;
        Ok(Self { bp, catalog, tid, file, page_number: 0, current: Vec::new().into_iter() })
    }

    pub fn tuple_desc(&self) -> Arc<TupleDesc> {
        self.file.tuple_desc().clone()
    }

    pub fn rewind(&mut self) {
        self.page_number = 0;
        self.current = Vec::new().into_iter();
    }

    fn advance_page(&mut self) -> DbResult<bool> {
        let num_pages = self.file.num_pages()?;
        while self.page_number < num_pages {
            let pid = crate::page_id::PageId::new(self.file.id(), self.page_number);
            self.page_number += 1;
            let page = self.bp.get_page(self.tid, pid, Permission::ReadOnly, self.catalog)?;
            let tuples: Vec<Tuple> = page.rl().iter().cloned().collect();
            if !tuples.is_empty() {
                self.current = tuples.into_iter();
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<'a> Iterator for SeqScan<'a> {
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

/// Wraps a child iterator, yielding only tuples matching a [`Predicate`].
pub struct Filter<I> {
    child: I,
    predicate: Predicate,
}

impl<I> Filter<I>
where
    I: Iterator<Item = DbResult<Tuple>>,
{
    pub fn new(child: I, predicate: Predicate) -> Self {
        Self { child, predicate }
    }
}

impl<I> Iterator for Filter<I>
where
    I: Iterator<Item = DbResult<Tuple>>,
{
    type Item = DbResult<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.child.next()? {
                Ok(t) => match self.predicate.matches(&t) {
                    Ok(true) => return Some(Ok(t)),
                    Ok(false) => continue,
                    Err(e) => return Some(Err(e)),
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Inserts every tuple from `child` into `table_id`, returning the count
/// inserted.
pub fn insert(
    bp: &BufferPool,
    catalog: &Catalog,
    tid: TransactionId,
    table_id: u64,
    child: impl Iterator<Item = DbResult<Tuple>>,
) -> DbResult<usize> {
    let mut count = 0;
    for t in child {
        bp.insert_tuple(tid, table_id, t?, catalog)?;
        count += 1;
    }
    Ok(count)
}

/// Deletes every tuple yielded by `child`, returning the count deleted.
pub fn delete(
    bp: &BufferPool,
    catalog: &Catalog,
    tid: TransactionId,
    child: impl Iterator<Item = DbResult<Tuple>>,
) -> DbResult<usize> {
    let mut count = 0;
    for t in child {
        bp.delete_tuple(tid, &t?, catalog)?;
        count += 1;
    }
    Ok(count)
}

/// A minimal aggregate: `COUNT(*)` over a child iterator. Other
/// aggregate functions are out of scope (spec.md §1); this exists only
/// so the pull-iterator interface has a representative consumer beyond
/// scan/filter/insert/delete.
pub fn count(child: impl Iterator<Item = DbResult<Tuple>>) -> DbResult<i64> {
    let mut n = 0i64;
    for t in child {
        t?;
        n += 1;
    }
    Ok(n)
}
