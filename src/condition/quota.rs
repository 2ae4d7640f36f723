//! Policy memory quota
//!
//! Every newly interned condition is charged against the policy quota by
//! its byte size. Merged duplicates are never charged.

use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Admission gate consulted before a new condition is interned
pub trait PolicyQuota: Send + Sync {
    /// Charge `bytes`, returning false (and charging nothing) if over quota
    fn try_charge(&self, bytes: usize) -> bool;

    /// Return `bytes` previously charged
    fn release(&self, bytes: usize);

    /// Configured limit, `0` for unlimited
    fn limit(&self) -> usize;
}

/// Atomic byte counter with an optional limit
#[derive(Debug, Default)]
pub struct MemoryQuota {
    used: CachePadded<AtomicUsize>,
    limit: usize,
}

impl MemoryQuota {
    /// Create a quota; `limit == 0` disables the check
    pub fn new(limit: usize) -> Self {
        MemoryQuota {
            used: CachePadded::new(AtomicUsize::new(0)),
            limit,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0)
    }

    /// Bytes currently charged
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }
}

impl PolicyQuota for MemoryQuota {
    fn try_charge(&self, bytes: usize) -> bool {
        let limit = self.limit;
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                let next = used.checked_add(bytes)?;
                (limit == 0 || next <= limit).then_some(next)
            })
            .is_ok()
    }

    fn release(&self, bytes: usize) {
        let _ = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                Some(used.saturating_sub(bytes))
            });
    }

    fn limit(&self) -> usize {
        self.limit
    }
}
