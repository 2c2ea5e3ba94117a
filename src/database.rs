use std::path::Path;
use std::sync::Arc;

use crate::buffer_pool::{get_page_size, BufferPool, DEFAULT_NUM_PAGES};
use crate::catalog::Catalog;
use crate::error::DbResult;

/// The engine's single entry point: a catalog and a buffer pool, held by
/// `Arc` and passed explicitly to every caller. There is no process-wide
/// singleton — callers construct a `Database` and thread it (or its
/// `Arc<Catalog>`/`Arc<BufferPool>` halves) through their own call graph
/// instead of reaching for a static.
pub struct Database {
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    pub fn new(buffer_pool_capacity: usize) -> Self {
        Self {
            catalog: Arc::new(Catalog::new()),
            buffer_pool: Arc::new(BufferPool::new(buffer_pool_capacity)),
        }
    }

    /// Builds a `Database` and bootstraps its catalog from a schema file,
    /// using the default buffer-pool capacity and page size.
    pub fn open_with_schema<P: AsRef<Path>>(schema_path: P) -> DbResult<Self> {
        let db = Self::new(DEFAULT_NUM_PAGES);
        db.catalog.load_schema_file(schema_path, get_page_size())?;
        Ok(db)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_PAGES)
    }
}
