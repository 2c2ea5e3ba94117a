use std::sync::Arc;

use bit_vec::BitVec;
use log::debug;

use crate::error::{not_found, page_full, schema_mismatch, DbResult};
use crate::page_id::PageId;
use crate::transaction::TransactionId;
use crate::tuple::{RecordId, Tuple};
use crate::tuple_desc::TupleDesc;

/// A fixed-size slotted page: a header bitmap followed by `N` fixed-width
/// tuple slots. See spec.md §3 and §6 for the exact on-disk layout.
pub struct HeapPage {
    pid: PageId,
    desc: Arc<TupleDesc>,
    page_size: usize,
    num_slots: usize,
    header_bytes: usize,
    /// bit i set ⇔ slot i is occupied. `BitVec::from_bytes`/`to_bytes` are
    /// MSB-first, matching spec.md §6's bit ordering directly.
    header: BitVec<u32>,
    slots: Vec<Tuple>,
    dirtied_by: Option<TransactionId>,
}

impl HeapPage {
    /// `num_slots` for a page of `page_size` bytes holding tuples of
    /// `tuple_size` bytes: `floor((page_size*8) / (tuple_size*8 + 1))`.
    pub fn num_slots_for(page_size: usize, tuple_size: usize) -> usize {
        (page_size * 8) / (tuple_size * 8 + 1)
    }

    fn header_bytes_for(num_slots: usize) -> usize {
        (num_slots + 7) / 8
    }

    /// Parse a page image read from disk.
    pub fn new(pid: PageId, page_size: usize, desc: Arc<TupleDesc>, bytes: &[u8]) -> DbResult<Self> {
        assert_eq!(bytes.len(), page_size, "page image must be exactly page_size bytes");

        let tuple_size = desc.tuple_size();
        let num_slots = Self::num_slots_for(page_size, tuple_size);
        let header_bytes = Self::header_bytes_for(num_slots);

        let header = BitVec::from_bytes(&bytes[0..header_bytes]);

        let mut slots = Vec::with_capacity(num_slots);
        let mut offset = header_bytes;
        for slot in 0..num_slots {
            if header[slot] {
                let mut t = Tuple::decode(desc.clone(), &bytes[offset..offset + tuple_size]);
                t.set_record_id(Some(RecordId::new(pid, slot)));
                slots.push(t);
            } else {
                slots.push(Tuple::new(desc.clone()));
            }
            offset += tuple_size;
        }

        Ok(Self {
            pid,
            desc,
            page_size,
            num_slots,
            header_bytes,
            header,
            slots,
            dirtied_by: None,
        })
    }

    /// An all-zero page image.
    pub fn empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0u8; page_size]
    }

    pub fn page_id(&self) -> PageId {
        self.pid
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    pub fn is_slot_used(&self, i: usize) -> bool {
        self.header[i]
    }

    pub fn mark_slot_used(&mut self, i: usize, used: bool) {
        self.header.set(i, used);
    }

    pub fn num_empty_slots(&self) -> usize {
        (0..self.num_slots).filter(|&i| !self.is_slot_used(i)).count()
    }

    /// Serialize back to exactly `page_size` bytes. Unused slots are
    /// always zero so that `parse(serialize(p)) == p` and
    /// `serialize(parse(bytes)) == bytes` both hold (spec.md §4.1).
    pub fn page_data(&self) -> Vec<u8> {
        let tuple_size = self.desc.tuple_size();
        let mut out = Vec::with_capacity(self.page_size);
        out.extend_from_slice(&self.header.to_bytes());

        for slot in 0..self.num_slots {
            if self.is_slot_used(slot) {
                self.slots[slot].encode(&mut out);
            } else {
                out.resize(out.len() + tuple_size, 0u8);
            }
        }

        out.resize(self.page_size, 0u8);
        out
    }

    /// Finds the lowest free slot, copies `t`'s fields in, and assigns
    /// its record id. Fails with `SchemaMismatch` if `t`'s schema
    /// disagrees with the page's, or `PageFull` if no slot is free.
    pub fn insert_tuple(&mut self, mut t: Tuple) -> DbResult<RecordId> {
        if *t.tuple_desc() != *self.desc {
            return Err(schema_mismatch("tuple schema does not match page schema"));
        }

        let slot = (0..self.num_slots)
            .find(|&i| !self.is_slot_used(i))
            .ok_or_else(|| page_full("no free slot on this page"))?;

        let rid = RecordId::new(self.pid, slot);
        t.set_record_id(Some(rid));
        self.mark_slot_used(slot, true);
        self.slots[slot] = t;

        debug!("inserted tuple into {:?} slot {}", self.pid, slot);
        Ok(rid)
    }

    /// Clears the slot and the tuple's record id. Fails with `NotFound`
    /// if the tuple's record id doesn't name an occupied slot on this
    /// page.
    pub fn delete_tuple(&mut self, t: &Tuple) -> DbResult<()> {
        let rid = t
            .record_id()
            .ok_or_else(|| not_found("tuple has no record id"))?;
        if rid.page_id != self.pid || !self.is_slot_used(rid.slot_index) {
            return Err(not_found("tuple not present on this page"));
        }

        self.mark_slot_used(rid.slot_index, false);
        let mut cleared = Tuple::new(self.desc.clone());
        cleared.set_record_id(None);
        self.slots[rid.slot_index] = cleared;
        Ok(())
    }

    /// Occupied slots in ascending slot order. Finite, not restartable —
    /// callers re-fetch the page for a fresh iterator.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        (0..self.num_slots).filter(move |&i| self.is_slot_used(i)).map(move |i| &self.slots[i])
    }

    pub fn mark_dirty(&mut self, dirty: bool, tid: TransactionId) {
        self.dirtied_by = if dirty { Some(tid) } else { None };
    }

    pub fn is_dirty(&self) -> Option<TransactionId> {
        self.dirtied_by
    }
}
