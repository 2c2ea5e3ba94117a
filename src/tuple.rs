use std::fmt;
use std::sync::Arc;

use crate::error::{schema_mismatch, DbResult};
use crate::field::Field;
use crate::page_id::PageId;
use crate::tuple_desc::TupleDesc;

/// `(PageId, slotIndex)`. Equality is structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot_index: usize,
}

impl RecordId {
    pub fn new(page_id: PageId, slot_index: usize) -> Self {
        Self { page_id, slot_index }
    }
}

/// A fixed-size row: a schema plus one field per column, plus an optional
/// [`RecordId`] set once the tuple is placed on a page.
#[derive(Debug, Clone)]
pub struct Tuple {
    desc: Arc<TupleDesc>,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// An empty tuple (every field defaulted to `Int(0)`/`Str("")`) ready
    /// to have its fields assigned by index.
    pub fn new(desc: Arc<TupleDesc>) -> Self {
        let fields = (0..desc.num_fields())
            .map(|i| match desc.field_type(i) {
                crate::field::Type::Int => Field::Int(0),
                crate::field::Type::Str(_) => Field::Str(String::new()),
            })
            .collect();
        Self { desc, fields, record_id: None }
    }

    pub fn from_fields(desc: Arc<TupleDesc>, fields: Vec<Field>) -> DbResult<Self> {
        if fields.len() != desc.num_fields() {
            return Err(schema_mismatch("field count does not match schema"));
        }
        for (i, field) in fields.iter().enumerate() {
            if !field.matches_type(desc.field_type(i)) {
                return Err(schema_mismatch(format!(
                    "field {} has the wrong type for this schema",
                    i
                )));
            }
        }
        Ok(Self { desc, fields, record_id: None })
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    pub fn set_field(&mut self, i: usize, value: Field) -> DbResult<()> {
        if !value.matches_type(self.desc.field_type(i)) {
            return Err(schema_mismatch(format!("field {} has the wrong type", i)));
        }
        self.fields[i] = value;
        Ok(())
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: Option<RecordId>) {
        self.record_id = rid;
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        for (i, field) in self.fields.iter().enumerate() {
            let fixed_len = match self.desc.field_type(i) {
                crate::field::Type::Int => 0,
                crate::field::Type::Str(len) => len,
            };
            field.encode(fixed_len, out);
        }
    }

    pub(crate) fn decode(desc: Arc<TupleDesc>, bytes: &[u8]) -> Self {
        let mut fields = Vec::with_capacity(desc.num_fields());
        let mut offset = 0;
        for i in 0..desc.num_fields() {
            let t = desc.field_type(i);
            let len = t.byte_length();
            fields.push(Field::decode(t, &bytes[offset..offset + len]));
            offset += len;
        }
        Self { desc, fields, record_id: None }
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self.fields.iter().map(|f| f.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}
