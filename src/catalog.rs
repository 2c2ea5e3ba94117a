use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use log::info;

use crate::error::{not_found, schema_mismatch, DbResult};
use crate::field::Type;
use crate::heap_file::HeapFile;
use crate::tuple_desc::TupleDesc;
use crate::util::HandyRwLock;

struct Inner {
    files: HashMap<u64, Arc<HeapFile>>,
    names: HashMap<u64, String>,
    name_to_id: HashMap<String, u64>,
    pk_field: HashMap<u64, String>,
}

/// The process-wide registry of `(table id → file, schema, primary-key
/// field name)` (spec.md §4.5). Lookup is read-mostly, so a single
/// `RwLock` around the whole map suffices.
pub struct Catalog {
    inner: RwLock<Inner>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                files: HashMap::new(),
                names: HashMap::new(),
                name_to_id: HashMap::new(),
                pk_field: HashMap::new(),
            }),
        }
    }

    pub fn add_table(&self, file: Arc<HeapFile>, name: &str, pk_field: &str) {
        let id = file.id();
        let mut inner = self.inner.wl();
        inner.names.insert(id, name.to_string());
        inner.name_to_id.insert(name.to_string(), id);
        inner.pk_field.insert(id, pk_field.to_string());
        inner.files.insert(id, file);
        info!("registered table '{}' (id={})", name, id);
    }

    pub fn get_file(&self, table_id: u64) -> DbResult<Arc<HeapFile>> {
        self.inner
            .rl()
            .files
            .get(&table_id)
            .cloned()
            .ok_or_else(|| not_found(format!("no table with id {}", table_id)))
    }

    pub fn get_tuple_desc(&self, table_id: u64) -> DbResult<Arc<TupleDesc>> {
        Ok(self.get_file(table_id)?.tuple_desc().clone())
    }

    pub fn get_table_name(&self, table_id: u64) -> DbResult<String> {
        self.inner
            .rl()
            .names
            .get(&table_id)
            .cloned()
            .ok_or_else(|| not_found(format!("no table with id {}", table_id)))
    }

    pub fn get_table_id(&self, name: &str) -> DbResult<u64> {
        self.inner
            .rl()
            .name_to_id
            .get(name)
            .copied()
            .ok_or_else(|| not_found(format!("no table named '{}'", name)))
    }

    pub fn get_primary_key(&self, table_id: u64) -> DbResult<String> {
        self.inner
            .rl()
            .pk_field
            .get(&table_id)
            .cloned()
            .ok_or_else(|| not_found(format!("no table with id {}", table_id)))
    }

    /// Bootstraps the catalog from a schema file: one table per line,
    /// `name (col:TYPE [pk], …)` with `TYPE` in `{int, string}` (spec.md
    /// §6). Blank lines are ignored; each table's heap file is created
    /// alongside the schema file if it does not already exist.
    pub fn load_schema_file<P: AsRef<Path>>(&self, path: P, page_size: usize) -> DbResult<()> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (name, desc, pk_field) = parse_schema_line(line)?;
            let table_path = dir.join(format!("{}.tbl", name));
            let file = HeapFile::new(table_path, Arc::new(desc), page_size)?;
            self.add_table(Arc::new(file), &name, &pk_field);
        }
        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses one `name (col:TYPE [pk], …)` schema line into a name, a
/// `TupleDesc`, and the primary-key column name (defaulting to the
/// first column if none is marked).
fn parse_schema_line(line: &str) -> DbResult<(String, TupleDesc, String)> {
    let open = line
        .find('(')
        .ok_or_else(|| schema_mismatch(format!("malformed schema line: '{}'", line)))?;
    let close = line
        .rfind(')')
        .ok_or_else(|| schema_mismatch(format!("malformed schema line: '{}'", line)))?;
    if close < open {
        return Err(schema_mismatch(format!("malformed schema line: '{}'", line)));
    }

    let name = line[..open].trim().to_string();
    let body = &line[open + 1..close];

    let mut types = Vec::new();
    let mut names = Vec::new();
    let mut pk_field: Option<String> = None;

    for col in body.split(',') {
        let col = col.trim();
        if col.is_empty() {
            continue;
        }
        let mut parts = col.split_whitespace();
        let col_spec = parts
            .next()
            .ok_or_else(|| schema_mismatch(format!("empty column spec in '{}'", line)))?;
        let is_pk = parts.any(|p| p.eq_ignore_ascii_case("pk"));

        let (col_name, col_type) = col_spec
            .split_once(':')
            .ok_or_else(|| schema_mismatch(format!("column '{}' missing ':TYPE'", col_spec)))?;
        let col_name = col_name.trim().to_string();
        let ty: Type = col_type
            .trim()
            .parse()
            .map_err(|_| schema_mismatch(format!("unknown column type '{}'", col_type.trim())))?;

        if is_pk {
            pk_field = Some(col_name.clone());
        }
        names.push(Some(col_name));
        types.push(ty);
    }

    let desc = TupleDesc::new(types, names.clone());
    let pk_field = pk_field.or_else(|| names.first().cloned().flatten()).unwrap_or_default();
    Ok((name, desc, pk_field))
}
