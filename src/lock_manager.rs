use std::collections::{HashMap, HashSet};
use std::sync::{Condvar, Mutex};

use log::debug;

use crate::error::{aborted, DbResult};
use crate::page_id::PageId;
use crate::transaction::TransactionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Default)]
struct PageLocks {
    shared_holders: HashSet<TransactionId>,
    exclusive_holder: Option<TransactionId>,
}

impl PageLocks {
    fn is_empty(&self) -> bool {
        self.shared_holders.is_empty() && self.exclusive_holder.is_none()
    }

    fn holders(&self) -> HashSet<TransactionId> {
        let mut h = self.shared_holders.clone();
        if let Some(x) = self.exclusive_holder {
            h.insert(x);
        }
        h
    }
}

struct Inner {
    locks: HashMap<PageId, PageLocks>,
    /// waits-for graph: tid -> the set of tids it is currently blocked on.
    dependencies: HashMap<TransactionId, HashSet<TransactionId>>,
}

/// A page-level strict two-phase lock manager: shared/exclusive locks per
/// page, in-place upgrade for a sole shared holder, and deadlock
/// detection over an explicit waits-for graph (spec.md §4.3).
pub struct LockManager {
    inner: Mutex<Inner>,
    condvar: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                locks: HashMap::new(),
                dependencies: HashMap::new(),
            }),
            condvar: Condvar::new(),
        }
    }

    /// Blocks until `tid` holds `mode` on `pid`, or fails with
    /// `Aborted` if granting it would complete a waits-for cycle.
    pub fn acquire(&self, tid: TransactionId, pid: PageId, mode: LockMode) -> DbResult<()> {
        let mut guard = self.inner.lock().unwrap();
        loop {
            let entry = guard.locks.entry(pid).or_default();

            let granted = match mode {
                LockMode::Shared => {
                    if entry.exclusive_holder.is_none() || entry.exclusive_holder == Some(tid) {
                        entry.shared_holders.insert(tid);
                        true
                    } else {
                        false
                    }
                }
                LockMode::Exclusive => {
                    if entry.exclusive_holder == Some(tid) {
                        true
                    } else if entry.exclusive_holder.is_none()
                        && (entry.shared_holders.is_empty()
                            || (entry.shared_holders.len() == 1
                                && entry.shared_holders.contains(&tid)))
                    {
                        entry.shared_holders.remove(&tid);
                        entry.exclusive_holder = Some(tid);
                        true
                    } else {
                        false
                    }
                }
            };

            if granted {
                guard.dependencies.remove(&tid);
                debug!("lock granted: {} {:?} on {:?}", tid, mode, pid);
                return Ok(());
            }

            let waiting_on: HashSet<TransactionId> =
                guard.locks[&pid].holders().into_iter().filter(|h| *h != tid).collect();
            guard.dependencies.insert(tid, waiting_on);

            if has_cycle_through(&guard.dependencies, tid) {
                guard.dependencies.remove(&tid);
                debug!("deadlock detected, aborting {}", tid);
                return Err(aborted(format!("deadlock detected for {}", tid)));
            }

            debug!("{} waiting for {:?} on {:?}", tid, mode, pid);
            guard = self.condvar.wait(guard).unwrap();
        }
    }

    pub fn release(&self, tid: TransactionId, pid: PageId) {
        let mut guard = self.inner.lock().unwrap();
        release_locked(&mut guard, tid, pid);
        guard.dependencies.remove(&tid);
        self.condvar.notify_all();
    }

    pub fn release_all(&self, tid: TransactionId) {
        let mut guard = self.inner.lock().unwrap();
        let pages: Vec<PageId> = guard
            .locks
            .iter()
            .filter(|(_, locks)| locks.shared_holders.contains(&tid) || locks.exclusive_holder == Some(tid))
            .map(|(pid, _)| *pid)
            .collect();
        for pid in pages {
            release_locked(&mut guard, tid, pid);
        }
        guard.dependencies.remove(&tid);
        self.condvar.notify_all();
    }

    /// Drops every holder of `pid` outright. Used when a page is evicted
    /// or discarded; under NO-STEAL this can only happen to a clean page,
    /// which by definition has no uncommitted writer.
    pub fn release_all_on_page(&self, pid: PageId) {
        let mut guard = self.inner.lock().unwrap();
        guard.locks.remove(&pid);
        self.condvar.notify_all();
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        let guard = self.inner.lock().unwrap();
        match guard.locks.get(&pid) {
            Some(locks) => locks.shared_holders.contains(&tid) || locks.exclusive_holder == Some(tid),
            None => false,
        }
    }
}

fn release_locked(guard: &mut Inner, tid: TransactionId, pid: PageId) {
    if let Some(locks) = guard.locks.get_mut(&pid) {
        locks.shared_holders.remove(&tid);
        if locks.exclusive_holder == Some(tid) {
            locks.exclusive_holder = None;
        }
        if locks.is_empty() {
            guard.locks.remove(&pid);
        }
    }
}

/// Iterative DFS: does the waits-for graph contain a path from `start`
/// back to `start`? No recursion is needed beyond the visited set (spec.md
/// §9).
fn has_cycle_through(
    dependencies: &HashMap<TransactionId, HashSet<TransactionId>>,
    start: TransactionId,
) -> bool {
    let mut visited = HashSet::new();
    let mut stack: Vec<TransactionId> = match dependencies.get(&start) {
        Some(neighbors) => neighbors.iter().copied().collect(),
        None => return false,
    };

    while let Some(cur) = stack.pop() {
        if cur == start {
            return true;
        }
        if !visited.insert(cur) {
            continue;
        }
        if let Some(neighbors) = dependencies.get(&cur) {
            for &n in neighbors {
                stack.push(n);
            }
        }
    }
    false
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
