//! Interning store for compiled conditions
//!
//! Structurally equal conditions are merged into one shared entry. Entries
//! live on an append-at-head linked list:
//! - Writers (commit, sweep) serialize on a single policy lock
//! - Readers traverse without the lock under an epoch guard; an entry is
//!   never mutated after insertion and unlinked nodes are only freed once
//!   every reader that could see them has unpinned

use super::compiled::CompiledCondition;
use super::quota::{MemoryQuota, PolicyQuota};
use crate::error::{ConditionError, Result};
use crossbeam::epoch::{self, Atomic, Guard, Owned};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default wait between interrupt checks while acquiring the policy lock
pub const DEFAULT_LOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Interrupt flag for a pending commit
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A stored condition and its user count
struct Interned {
    condition: CompiledCondition,
    users: AtomicUsize,
}

/// Shared handle to an interned condition
///
/// Each live handle accounts for one user of the entry. Cloning adds a user,
/// dropping removes one. An entry with no users is reclaimed by
/// [`ConditionStore::sweep`].
pub struct ConditionRef {
    entry: Arc<Interned>,
}

impl ConditionRef {
    /// Current number of users of the shared entry
    pub fn users(&self) -> usize {
        self.entry.users.load(Ordering::Acquire)
    }

    /// True if both handles point at the same interned entry
    pub fn ptr_eq(a: &ConditionRef, b: &ConditionRef) -> bool {
        Arc::ptr_eq(&a.entry, &b.entry)
    }

    pub fn condition(&self) -> &CompiledCondition {
        &self.entry.condition
    }
}

impl Deref for ConditionRef {
    type Target = CompiledCondition;

    fn deref(&self) -> &CompiledCondition {
        &self.entry.condition
    }
}

impl Clone for ConditionRef {
    fn clone(&self) -> Self {
        self.entry.users.fetch_add(1, Ordering::AcqRel);
        ConditionRef {
            entry: self.entry.clone(),
        }
    }
}

impl Drop for ConditionRef {
    fn drop(&mut self) {
        self.entry.users.fetch_sub(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for ConditionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionRef")
            .field("condition", &self.entry.condition.to_string())
            .field("users", &self.users())
            .finish()
    }
}

struct Node {
    entry: Arc<Interned>,
    next: Atomic<Node>,
}

/// Store statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Interned entries, including ones awaiting sweep
    pub entries: usize,
    /// Sum of users over all entries
    pub users: usize,
    /// Sum of entry sizes in bytes
    pub bytes: usize,
}

/// Deduplicating store of compiled conditions
pub struct ConditionStore {
    head: Atomic<Node>,
    policy_lock: Mutex<()>,
    quota: Arc<dyn PolicyQuota>,
    poll_interval: Duration,
    len: AtomicUsize,
}

impl ConditionStore {
    /// Create a store with no memory limit
    pub fn new() -> Self {
        Self::with_quota(Arc::new(MemoryQuota::unlimited()))
    }

    /// Create a store charging new entries against `quota`
    pub fn with_quota(quota: Arc<dyn PolicyQuota>) -> Self {
        ConditionStore {
            head: Atomic::null(),
            policy_lock: Mutex::new(()),
            quota,
            poll_interval: DEFAULT_LOCK_POLL_INTERVAL,
            len: AtomicUsize::new(0),
        }
    }

    /// Set how long an interruptible commit waits between interrupt checks
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn quota(&self) -> &Arc<dyn PolicyQuota> {
        &self.quota
    }

    /// Intern `candidate`, blocking on the policy lock.
    ///
    /// Returns the existing equal entry (with one more user) if there is
    /// one, otherwise inserts `candidate` with one user. Fails with
    /// [`ConditionError::QuotaExceeded`] if a new entry does not fit.
    pub fn commit(&self, candidate: CompiledCondition) -> Result<ConditionRef> {
        let lock = self.policy_lock.lock();
        self.commit_locked(&lock, candidate)
    }

    /// Like [`commit`](Self::commit), but gives up with
    /// [`ConditionError::Interrupted`] once `interrupt` is raised while
    /// waiting for the policy lock.
    pub fn commit_interruptible(
        &self,
        candidate: CompiledCondition,
        interrupt: &Interrupt,
    ) -> Result<ConditionRef> {
        let lock = loop {
            if interrupt.is_raised() {
                warn!("Interrupted while waiting for policy lock");
                return Err(ConditionError::Interrupted);
            }
            if let Some(lock) = self.policy_lock.try_lock_for(self.poll_interval) {
                break lock;
            }
        };
        self.commit_locked(&lock, candidate)
    }

    fn commit_locked(
        &self,
        _lock: &MutexGuard<'_, ()>,
        candidate: CompiledCondition,
    ) -> Result<ConditionRef> {
        let guard = epoch::pin();

        if let Some(existing) = self.find(&candidate, &guard) {
            existing.users.fetch_add(1, Ordering::AcqRel);
            debug!(
                "Sharing existing condition {:016x} ({} users)",
                candidate.fingerprint(),
                existing.users.load(Ordering::Relaxed)
            );
            return Ok(ConditionRef {
                entry: existing.clone(),
            });
        }

        let size = candidate.size();
        if !self.quota.try_charge(size) {
            warn!(
                "Policy memory quota exceeded: cannot intern {} bytes (limit {})",
                size,
                self.quota.limit()
            );
            return Err(ConditionError::QuotaExceeded {
                requested: size,
                limit: self.quota.limit(),
            });
        }

        let entry = Arc::new(Interned {
            condition: candidate,
            users: AtomicUsize::new(1),
        });
        let node = Owned::new(Node {
            entry: entry.clone(),
            next: Atomic::null(),
        });
        node.next
            .store(self.head.load(Ordering::Acquire, &guard), Ordering::Relaxed);
        self.head.store(node, Ordering::Release);
        self.len.fetch_add(1, Ordering::AcqRel);

        debug!(
            "Interned condition {:016x} ({} bytes)",
            entry.condition.fingerprint(),
            size
        );
        Ok(ConditionRef { entry })
    }

    fn find<'g>(&self, candidate: &CompiledCondition, guard: &'g Guard) -> Option<&'g Arc<Interned>> {
        let mut cur = self.head.load(Ordering::Acquire, guard);
        // SAFETY: nodes reachable from head are only freed through
        // defer_destroy, which waits for `guard` to be released.
        while let Some(node) = unsafe { cur.as_ref() } {
            if node.entry.condition == *candidate {
                return Some(&node.entry);
            }
            cur = node.next.load(Ordering::Acquire, guard);
        }
        None
    }

    /// Visit every interned condition with its user count, without taking
    /// the policy lock. Entries inserted during the walk may or may not be
    /// visited.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&CompiledCondition, usize),
    {
        let guard = epoch::pin();
        let mut cur = self.head.load(Ordering::Acquire, &guard);
        // SAFETY: see `find`.
        while let Some(node) = unsafe { cur.as_ref() } {
            f(&node.entry.condition, node.entry.users.load(Ordering::Acquire));
            cur = node.next.load(Ordering::Acquire, &guard);
        }
    }

    /// True if an equal condition is interned
    pub fn contains(&self, condition: &CompiledCondition) -> bool {
        let guard = epoch::pin();
        self.find(condition, &guard).is_some()
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            entries: 0,
            users: 0,
            bytes: 0,
        };
        self.for_each(|condition, users| {
            stats.entries += 1;
            stats.users += users;
            stats.bytes += condition.size();
        });
        stats
    }

    /// Number of interned entries
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unlink every entry without users and return its memory to the
    /// quota. Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let _lock = self.policy_lock.lock();
        let guard = epoch::pin();

        let mut removed = 0;
        let mut link: &Atomic<Node> = &self.head;
        loop {
            let cur = link.load(Ordering::Acquire, &guard);
            // SAFETY: see `find`; only this (locked) loop unlinks nodes.
            let node = match unsafe { cur.as_ref() } {
                Some(node) => node,
                None => break,
            };
            if node.entry.users.load(Ordering::Acquire) != 0 {
                link = &node.next;
                continue;
            }

            link.store(node.next.load(Ordering::Acquire, &guard), Ordering::Release);
            self.quota.release(node.entry.condition.size());
            // SAFETY: the node is unlinked; readers still holding it are
            // pinned and keep it alive until they unpin.
            unsafe { guard.defer_destroy(cur) };
            removed += 1;
        }

        if removed > 0 {
            self.len.fetch_sub(removed, Ordering::AcqRel);
            info!("Swept {} unused conditions", removed);
        }
        removed
    }
}

impl Default for ConditionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConditionStore {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no reader or writer can reach the list.
        unsafe {
            let guard = epoch::unprotected();
            let mut cur = self.head.load(Ordering::Relaxed, guard);
            while !cur.is_null() {
                let next = cur.deref().next.load(Ordering::Relaxed, guard);
                drop(cur.into_owned());
                cur = next;
            }
        }
    }
}

impl fmt::Debug for ConditionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionStore")
            .field("len", &self.len())
            .field("quota_limit", &self.quota.limit())
            .finish()
    }
}
