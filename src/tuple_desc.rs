use crate::error::{schema_mismatch, DbResult};
use crate::field::Type;

/// Row schema: an ordered sequence of (type, optional name). See spec.md
/// §3 for invariants.
#[derive(Clone, Debug)]
pub struct TupleDesc {
    types: Vec<Type>,
    names: Vec<Option<String>>,
}

impl TupleDesc {
    /// Builds a descriptor from parallel type/name lists. Panics if the
    /// lists differ in length or the schema is empty — both are
    /// programmer errors, not recoverable runtime conditions.
    pub fn new(types: Vec<Type>, names: Vec<Option<String>>) -> Self {
        assert!(!types.is_empty(), "a TupleDesc must have at least one field");
        assert_eq!(types.len(), names.len());
        Self { types, names }
    }

    pub fn unnamed(types: Vec<Type>) -> Self {
        let names = vec![None; types.len()];
        Self::new(types, names)
    }

    pub fn num_fields(&self) -> usize {
        self.types.len()
    }

    pub fn field_type(&self, i: usize) -> Type {
        self.types[i]
    }

    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.names[i].as_deref()
    }

    /// Index of the first field with the given name.
    pub fn field_index(&self, name: &str) -> DbResult<usize> {
        self.names
            .iter()
            .position(|n| n.as_deref() == Some(name))
            .ok_or_else(|| schema_mismatch(format!("no field named {}", name)))
    }

    /// On-disk size of one tuple under this schema: the sum of each
    /// field type's byte length.
    pub fn tuple_size(&self) -> usize {
        self.types.iter().map(|t| t.byte_length()).sum()
    }
}

impl PartialEq for TupleDesc {
    /// Two descriptors are equal iff their type sequences are equal;
    /// names are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.types == other.types
    }
}
impl Eq for TupleDesc {}
