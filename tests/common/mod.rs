use std::sync::Arc;

use relstore::buffer_pool::BufferPool;
use relstore::catalog::Catalog;
use relstore::field::{Field, Type};
use relstore::heap_file::HeapFile;
use relstore::tuple::Tuple;
use relstore::tuple_desc::TupleDesc;

pub const PAGE_SIZE: usize = 4096;

/// A two-int-column schema (`a int, b int`), matching spec.md §8's
/// end-to-end scenarios.
pub fn ab_desc() -> Arc<TupleDesc> {
    Arc::new(TupleDesc::new(
        vec![Type::Int, Type::Int],
        vec![Some("a".to_string()), Some("b".to_string())],
    ))
}

pub fn int_tuple(desc: &Arc<TupleDesc>, a: i32, b: i32) -> Tuple {
    Tuple::from_fields(desc.clone(), vec![Field::Int(a), Field::Int(b)]).unwrap()
}

/// A heap file over a fresh temp path, registered in a fresh catalog
/// under `name`, with `id` returned for convenience.
pub fn new_table(catalog: &Catalog, name: &str) -> (u64, tempfile::TempPath) {
    let tmp = tempfile::NamedTempFile::new().unwrap().into_temp_path();
    let file = HeapFile::new(&tmp, ab_desc(), PAGE_SIZE).unwrap();
    let id = file.id();
    catalog.add_table(Arc::new(file), name, "a");
    (id, tmp)
}

pub fn new_buffer_pool(capacity: usize) -> BufferPool {
    BufferPool::new(capacity)
}
