use std::sync::atomic::{AtomicU64, Ordering};

/// An opaque transaction id: a monotonically increasing counter, created
/// externally and used only as a map key by the lock manager and buffer
/// pool (spec.md §3, "Lifecycle & ownership").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl TransactionId {
    pub fn new() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "tx_{}", self.0)
    }
}
