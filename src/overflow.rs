//! # Refusal-Aware Eviction and Overflow
//!
//! Eviction walks the recency queue from the tail and asks every candidate's
//! [`Evictable`] capability for permission before releasing it.
//!
//! ```text
//!   make_space(cost)
//!   ═══════════════════════════════════════════════════════════════════════════
//!
//!     head ──► [E] ◄──► [D] ◄──► [C] ◄──► [B] ◄──► [A] ◄── tail
//!                                          busy     busy
//!
//!     try_release(A) → refused  (skip, keep walking towards head)
//!     try_release(B) → refused  (skip)
//!     try_release(C) → accepted (unlink, refund cost)
//!     ... until current_space + cost <= space_limit or the walk reaches head
//!
//!   Each candidate is asked at most once per pass, so a pass is O(n) even
//!   when every entry refuses.
//!
//!   Pass ended short of room:
//!     current_space + cost <= space_limit + overflow_budget  → store, overflowed
//!     otherwise                                              → not stored
//!   ═══════════════════════════════════════════════════════════════════════════
//! ```
//!
//! A release callback that panics is treated as a refusal; the cache is not
//! mutated while the callback runs, so its state stays consistent.
//!
//! ## Scoped limit raises
//!
//! A resident parent that is about to be joined by many children can raise
//! the limit for as long as it stays resident:
//!
//! ```text
//!   ensure_space_limit(&parent, 500)    limit 100 → 500, raises {parent: 400}
//!   ... children are put, nothing thrashes ...
//!   parent evicted / removed / flushed  limit 500 → 100, raises {}
//! ```
//!
//! Raises are tracked per parent key, so independent parents can hold raises
//! at the same time; each one is undone by exactly the amount it added.

use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};

use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::cache::OverflowLruCache;
use crate::ds::SlotId;
use crate::traits::Evictable;

/// Outstanding limit raises keyed by the parent that requested them, layered
/// on top of the unraised base limit.
///
/// The cache's space limit always equals [`limit`](Self::limit), so releasing
/// one parent lands on `base + remaining raises` no matter how the base moved
/// in the meantime.
#[derive(Debug, Clone)]
pub struct LimitRaises<K> {
    base: usize,
    by_parent: FxHashMap<K, usize>,
}

impl<K> LimitRaises<K>
where
    K: Eq + Hash,
{
    pub fn new(base: usize) -> Self {
        Self {
            base,
            by_parent: FxHashMap::default(),
        }
    }

    /// Limit in force when no parent holds a raise.
    pub fn base(&self) -> usize {
        self.base
    }

    pub fn set_base(&mut self, base: usize) {
        self.base = base;
    }

    /// Base plus every outstanding raise.
    pub fn limit(&self) -> usize {
        self.base.saturating_add(self.total())
    }

    /// Adds `amount` to whatever `parent` already holds.
    pub fn record(&mut self, parent: K, amount: usize) {
        *self.by_parent.entry(parent).or_insert(0) += amount;
    }

    pub fn get(&self, parent: &K) -> Option<usize> {
        self.by_parent.get(parent).copied()
    }

    pub fn take(&mut self, parent: &K) -> Option<usize> {
        self.by_parent.remove(parent)
    }

    /// Removes every raise and returns their sum. The base is kept.
    pub fn drain_total(&mut self) -> usize {
        self.by_parent
            .drain()
            .fold(0usize, |total, (_, amount)| total.saturating_add(amount))
    }

    pub fn total(&self) -> usize {
        self.by_parent
            .values()
            .fold(0usize, |total, amount| total.saturating_add(*amount))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.by_parent.keys()
    }

    pub fn len(&self) -> usize {
        self.by_parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_parent.is_empty()
    }
}

impl<K, V, C, E> OverflowLruCache<K, V, C, E>
where
    K: Eq + Hash + Clone,
    E: Evictable<K, V>,
{
    /// Frees room for `needed` more units.
    ///
    /// Returns `true` when the caller may link an entry of that cost, either
    /// within the limit or within the overflow budget.
    pub(crate) fn make_space(&mut self, needed: usize) -> bool {
        if self.current_space.saturating_add(needed) <= self.space_limit {
            return true;
        }

        let want = needed.max(self.headroom_target());
        self.evict_pass(want);

        if self.current_space.saturating_add(needed) <= self.space_limit {
            return true;
        }

        let ceiling = self.space_limit.saturating_add(self.overflow_budget);
        let tolerated = self.current_space.saturating_add(needed) <= ceiling;
        if tolerated {
            debug!(
                needed,
                current_space = self.current_space,
                space_limit = self.space_limit,
                "storing past the space limit within the overflow budget"
            );
            #[cfg(feature = "metrics")]
            {
                self.metrics.put_overflowed += 1;
            }
        } else {
            debug!(
                needed,
                current_space = self.current_space,
                ceiling,
                "busy entries leave no room within the overflow budget; not cached"
            );
        }
        tolerated
    }

    /// Walks tail → head once, releasing candidates that accept until
    /// `current_space + want` fits the limit. Returns the number of refusals.
    pub(crate) fn evict_pass(&mut self, want: usize) -> usize {
        #[cfg(feature = "metrics")]
        {
            self.metrics.evict_passes += 1;
        }

        let mut cursor = self.queue.back_id();
        let mut refusals = 0usize;
        while self.current_space.saturating_add(want) > self.space_limit {
            let Some(id) = cursor else {
                break;
            };
            cursor = self.queue.prev_id(id);

            if self.ask_release(id) {
                let entry = self.unlink(id);
                trace!(cost = entry.cost, "evicted least recently used entry");
                self.drop_raise(&entry.key);
                #[cfg(feature = "metrics")]
                self.metrics.record_eviction();
            } else {
                refusals += 1;
                #[cfg(feature = "metrics")]
                self.metrics.record_refusal();
            }
        }

        if refusals > 0 {
            debug!(
                refusals,
                current_space = self.current_space,
                space_limit = self.space_limit,
                "eviction pass skipped entries that refused release"
            );
        }
        refusals
    }

    /// Asks the candidate at `id` whether it may go; panics count as refusal.
    fn ask_release(&mut self, id: SlotId) -> bool {
        let Some(entry) = self.queue.get(id) else {
            panic!("eviction candidate {} missing from the recency queue", id.index());
        };
        let evictor = &mut self.evictor;
        match panic::catch_unwind(AssertUnwindSafe(|| {
            evictor.try_release(&entry.key, &*entry.value)
        })) {
            Ok(accepted) => accepted,
            Err(_) => {
                warn!("release callback panicked; keeping the entry resident");
                false
            },
        }
    }

    /// Undoes `key`'s raise without evicting; safe inside an eviction pass.
    pub(crate) fn drop_raise(&mut self, key: &K) -> bool {
        let Some(amount) = self.raises.take(key) else {
            return false;
        };
        self.space_limit = self.raises.limit();
        debug!(
            amount,
            space_limit = self.space_limit,
            "restored space limit after raising parent left"
        );
        true
    }

    /// Undoes `key`'s raise and evicts down to the restored limit.
    pub(crate) fn restore_limit_and_trim(&mut self, key: &K) {
        if self.drop_raise(key) && self.current_space > self.space_limit {
            self.evict_pass(0);
        }
    }

    /// Undoes the raise held by `parent` while it stays resident.
    ///
    /// Returns `false` if `parent` holds no raise.
    pub fn reset_space_limit(&mut self, parent: &K) -> bool {
        if self.raises.get(parent).is_none() {
            return false;
        }
        self.restore_limit_and_trim(parent);

        #[cfg(debug_assertions)]
        self.debug_validate_invariants();

        true
    }

    fn headroom_target(&self) -> usize {
        if self.headroom <= 0.0 {
            return 0;
        }
        (self.headroom * self.space_limit as f64).ceil() as usize
    }

    /// Raises the limit to `required` for as long as `parent` stays resident.
    ///
    /// Does nothing and returns `false` when `parent` is not resident or the
    /// limit already covers `required`. Repeated raises by the same parent
    /// accumulate and are undone together.
    pub fn ensure_space_limit(&mut self, parent: &K, required: usize) -> bool {
        if !self.index.contains(parent) || required <= self.space_limit {
            return false;
        }
        let amount = required - self.space_limit;
        self.raises.record(parent.clone(), amount);
        self.space_limit = self.raises.limit();
        debug!(
            amount,
            space_limit = self.space_limit,
            raises = self.raises.len(),
            "space limit raised for parent"
        );
        #[cfg(feature = "metrics")]
        {
            self.metrics.limit_raises += 1;
        }
        true
    }

    /// Amount `parent` currently adds to the space limit.
    pub fn raised_limit_for(&self, parent: &K) -> Option<usize> {
        self.raises.get(parent)
    }

    /// Sum of all outstanding raises.
    pub fn total_raised(&self) -> usize {
        self.raises.total()
    }
}
