mod common;

use common::{ab_desc, int_tuple, PAGE_SIZE};
use relstore::page::HeapPage;
use relstore::page_id::PageId;
use relstore::transaction::TransactionId;

fn empty_page() -> HeapPage {
    let pid = PageId::new(1, 0);
    let data = HeapPage::empty_page_data(PAGE_SIZE);
    HeapPage::new(pid, PAGE_SIZE, ab_desc(), &data).unwrap()
}

#[test]
fn round_trips_through_serialization() {
    let desc = ab_desc();
    let mut page = empty_page();
    page.insert_tuple(int_tuple(&desc, 1, 10)).unwrap();
    page.insert_tuple(int_tuple(&desc, 2, 20)).unwrap();

    let bytes = page.page_data();
    let reparsed = HeapPage::new(page.page_id(), PAGE_SIZE, desc, &bytes).unwrap();

    assert_eq!(reparsed.page_data(), bytes);
    let values: Vec<i32> = reparsed
        .iter()
        .map(|t| match t.field(0) {
            relstore::field::Field::Int(v) => *v,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(values, vec![1, 2]);
}

#[test]
fn insert_sets_slot_used_and_record_id() {
    let desc = ab_desc();
    let mut page = empty_page();
    let rid = page.insert_tuple(int_tuple(&desc, 7, 70)).unwrap();

    assert!(page.is_slot_used(rid.slot_index));
    assert!(page.iter().any(|t| t.record_id() == Some(rid)));
}

#[test]
fn delete_clears_slot_and_record_id() {
    let desc = ab_desc();
    let mut page = empty_page();
    let rid = page.insert_tuple(int_tuple(&desc, 7, 70)).unwrap();
    let mut inserted = page.iter().find(|t| t.record_id() == Some(rid)).unwrap().clone();

    page.delete_tuple(&inserted).unwrap();
    assert!(!page.is_slot_used(rid.slot_index));

    inserted.set_record_id(None);
    assert!(page.delete_tuple(&inserted).is_err());
}

#[test]
fn num_empty_slots_plus_occupied_equals_num_slots() {
    let desc = ab_desc();
    let mut page = empty_page();
    let total = page.num_slots();
    for i in 0..3 {
        page.insert_tuple(int_tuple(&desc, i, i * 10)).unwrap();
    }
    assert_eq!(page.num_empty_slots() + 3, total);
}

#[test]
fn insert_fails_once_page_is_full() {
    let desc = ab_desc();
    let mut page = empty_page();
    let total = page.num_slots();
    for i in 0..total {
        page.insert_tuple(int_tuple(&desc, i as i32, 0)).unwrap();
    }
    assert!(page.insert_tuple(int_tuple(&desc, 999, 0)).is_err());
}

#[test]
fn insert_rejects_schema_mismatch() {
    let other = std::sync::Arc::new(relstore::tuple_desc::TupleDesc::unnamed(vec![relstore::field::Type::Int]));
    let mut page = empty_page();
    let stray = relstore::tuple::Tuple::new(other);
    assert!(page.insert_tuple(stray).is_err());
}

#[test]
fn mark_dirty_tracks_owning_transaction() {
    let mut page = empty_page();
    assert!(page.is_dirty().is_none());
    let tid = TransactionId::new();
    page.mark_dirty(true, tid);
    assert_eq!(page.is_dirty(), Some(tid));
    page.mark_dirty(false, tid);
    assert!(page.is_dirty().is_none());
}
