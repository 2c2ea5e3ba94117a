use std::fmt;

use backtrace::Backtrace;

/// The error kinds surfaced by the storage and transaction core.
///
/// See spec.md §7 for the policy attached to each variant.
#[derive(Debug)]
pub enum ErrorKind {
    /// Read past the end of a heap file.
    PageOutOfRange,
    /// A tuple's [`crate::tuple_desc::TupleDesc`] does not match the
    /// page/table it is being inserted into.
    SchemaMismatch,
    /// No free slot was found on a page during insertion.
    PageFull,
    /// Eviction was attempted but every cached page is dirty.
    BufferFull,
    /// A delete targeted a slot that is not occupied, or a tuple whose
    /// record id belongs to a different table.
    NotFound,
    /// The lock manager detected a waits-for cycle through the requester;
    /// the requester is the chosen victim and must abort.
    Aborted,
    /// The underlying file system operation failed.
    Io,
}

pub struct DbError {
    kind: ErrorKind,
    message: String,
    backtrace: Backtrace,
}

impl DbError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            backtrace: Backtrace::new_unresolved(),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Print the captured backtrace to stderr. Cheap to capture (frames
    /// are resolved lazily), so every error pays only for what it uses.
    pub fn show_backtrace(&self) {
        let mut bt = self.backtrace.clone();
        bt.resolve();
        eprintln!("{}: {:?}", self.message, bt);
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl fmt::Debug for DbError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DbError {{ kind: {:?}, message: {} }}", self.kind, self.message)
    }
}

impl std::error::Error for DbError {}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        DbError::new(ErrorKind::Io, e.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

macro_rules! err_ctor {
    ($name:ident, $kind:ident) => {
        pub fn $name(message: impl Into<String>) -> DbError {
            DbError::new(ErrorKind::$kind, message)
        }
    };
}

err_ctor!(page_out_of_range, PageOutOfRange);
err_ctor!(schema_mismatch, SchemaMismatch);
err_ctor!(page_full, PageFull);
err_ctor!(buffer_full, BufferFull);
err_ctor!(not_found, NotFound);
err_ctor!(aborted, Aborted);
