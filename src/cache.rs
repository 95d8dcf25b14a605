//! # Cost-Weighted LRU Cache with Refusable Eviction
//!
//! [`OverflowLruCache`] bounds the total *cost* of its resident entries rather
//! than their count. When room must be made, the least-recently-used entry is
//! asked whether it may be released; a busy entry may refuse, in which case the
//! next-least-recently-used entry is asked instead (see [`crate::overflow`]).
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────────┐
//!   │                     OverflowLruCache<K, V, C, E>                         │
//!   │                                                                          │
//!   │   ┌────────────────────────────┐     ┌────────────────────────────────┐  │
//!   │   │  IndexTable<K>             │     │  RecencyQueue<Entry<K, V>>     │  │
//!   │   │  FxHashMap<K, SlotId>      │────►│                                │  │
//!   │   │                            │     │  head ─► [C] ◄─► [B] ◄─► [A]   │  │
//!   │   │  key set == queue key set  │     │  (MRU)   ts=3    ts=2   ts=1   │  │
//!   │   └────────────────────────────┘     │                      (LRU)     │  │
//!   │                                      └────────────────────────────────┘  │
//!   │                                                                          │
//!   │   current_space = Σ entry.cost        space_limit (+ overflow_budget)    │
//!   │   timestamp_counter: u64              LimitRaises<K> (per-parent raise)  │
//!   │                                                                          │
//!   │   cost_fn: C  (CostFunction<V>)       evictor: E  (Evictable<K, V>)      │
//!   └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//!
//! | Method                  | Complexity | Description                              |
//! |-------------------------|------------|------------------------------------------|
//! | `get(&k)`               | O(1)       | Lookup, restamp, promote to head         |
//! | `peek(&k)`              | O(1)       | Lookup without touching the order        |
//! | `get_key(&k)`           | O(1)       | Stored key equal to `k`, or `k` itself   |
//! | `put(k, v)`             | O(1)*      | Insert or update; may run eviction       |
//! | `remove_key(&k)`        | O(1)       | Unconditional removal                    |
//! | `flush()`               | O(n)       | Drop everything, no release requests     |
//! | `flush_key(&k)`         | O(1)       | Unconditional removal, no return value   |
//! | `set_space_limit(n)`    | O(n)*      | Shrinking evicts down to `n`             |
//! | `filling_ratio()`       | O(1)       | `current_space * 100 / space_limit`      |
//! | `keys()`                | O(n)       | Snapshot of keys, MRU first              |
//! | `keys_and_values()`     | O(n)       | Snapshot of pairs, MRU first             |
//!
//! `*` amortised over the entries an eviction pass visits.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use overflow_lru::OverflowLruCache;
//!
//! let mut cache = OverflowLruCache::new(3);
//! cache.put("a", Arc::new(1));
//! cache.put("b", Arc::new(2));
//! cache.put("c", Arc::new(3));
//!
//! // Reading "a" promotes it, so "b" becomes the eviction victim.
//! assert_eq!(cache.get(&"a").as_deref(), Some(&1));
//! cache.put("d", Arc::new(4));
//!
//! assert!(cache.get(&"b").is_none());
//! assert_eq!(cache.keys(), vec!["d", "a", "c"]);
//! ```
//!
//! ## Thread Safety
//!
//! Not thread-safe. All operations run to completion on the calling thread;
//! callers sharing a cache must serialize access themselves.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use tracing::debug;

use crate::ds::{IndexTable, RecencyQueue, SlotId};
use crate::error::{ConfigError, InvariantError};
#[cfg(feature = "metrics")]
use crate::metrics::{OverflowLruMetrics, OverflowLruMetricsSnapshot};
use crate::overflow::LimitRaises;
use crate::traits::{AlwaysRelease, CostFunction, Evictable, UnitCost};

/// Resident record; links and timestamp live in the queue node.
#[derive(Debug, Clone)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: Arc<V>,
    pub(crate) cost: usize,
}

/// Bounded, cost-weighted LRU cache with a refusable-eviction protocol.
///
/// Values are held as `Arc<V>` so the cache and its consumers can share them;
/// the cost of a value is captured when it is put and never recomputed.
pub struct OverflowLruCache<K, V, C = UnitCost, E = AlwaysRelease> {
    pub(crate) queue: RecencyQueue<Entry<K, V>>,
    pub(crate) index: IndexTable<K>,
    pub(crate) current_space: usize,
    pub(crate) space_limit: usize,
    pub(crate) overflow_budget: usize,
    pub(crate) headroom: f64,
    pub(crate) timestamp_counter: u64,
    pub(crate) raises: LimitRaises<K>,
    pub(crate) cost_fn: C,
    pub(crate) evictor: E,
    #[cfg(feature = "metrics")]
    pub(crate) metrics: OverflowLruMetrics,
}

impl<K, V> OverflowLruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a unit-cost cache whose entries never refuse release.
    ///
    /// A limit of 0 stores nothing but zero-cost values.
    pub fn new(space_limit: usize) -> Self {
        Self::with_capabilities(space_limit, 0, UnitCost, AlwaysRelease)
    }

    /// Creates a unit-cost cache with an overflow budget.
    pub fn with_overflow_budget(space_limit: usize, overflow_budget: usize) -> Self {
        Self::with_capabilities(space_limit, overflow_budget, UnitCost, AlwaysRelease)
    }
}

impl<K, V, C, E> OverflowLruCache<K, V, C, E>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache with caller-supplied cost and release capabilities.
    pub fn with_capabilities(
        space_limit: usize,
        overflow_budget: usize,
        cost_fn: C,
        evictor: E,
    ) -> Self {
        Self {
            queue: RecencyQueue::new(),
            index: IndexTable::new(),
            current_space: 0,
            space_limit,
            overflow_budget,
            headroom: 0.0,
            timestamp_counter: 0,
            raises: LimitRaises::new(space_limit),
            cost_fn,
            evictor,
            #[cfg(feature = "metrics")]
            metrics: OverflowLruMetrics::default(),
        }
    }

    /// Like [`with_capabilities`](Self::with_capabilities), but rejects a
    /// budget that cannot be added to the limit without overflowing.
    pub fn try_with_capabilities(
        space_limit: usize,
        overflow_budget: usize,
        cost_fn: C,
        evictor: E,
    ) -> Result<Self, ConfigError> {
        if space_limit.checked_add(overflow_budget).is_none() {
            return Err(ConfigError::BudgetOverflow {
                space_limit,
                overflow_budget,
            });
        }
        Ok(Self::with_capabilities(
            space_limit,
            overflow_budget,
            cost_fn,
            evictor,
        ))
    }

    /// Returns the value for `key`, restamping it and moving it to the head.
    pub fn get(&mut self, key: &K) -> Option<Arc<V>> {
        let Some(id) = self.index.get(key) else {
            #[cfg(feature = "metrics")]
            self.metrics.record_get(false);
            return None;
        };
        #[cfg(feature = "metrics")]
        self.metrics.record_get(true);

        let timestamp = self.next_timestamp();
        self.queue.promote(id, timestamp);
        let value = Arc::clone(&self.entry(id).value);

        #[cfg(debug_assertions)]
        self.debug_validate_invariants();

        Some(value)
    }

    /// Returns the value for `key` without changing its recency or timestamp.
    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        let value = self
            .index
            .get(key)
            .map(|id| Arc::clone(&self.entry(id).value));
        #[cfg(feature = "metrics")]
        self.metrics.record_peek(value.is_some());
        value
    }

    /// Returns the stored key equal to `key`, or `key` itself when absent.
    ///
    /// Lets callers canonicalise value-equal keys onto the instance the cache
    /// already holds.
    pub fn get_key<'a>(&'a self, key: &'a K) -> &'a K {
        self.index
            .get_key_value(key)
            .map(|(stored, _)| stored)
            .unwrap_or(key)
    }

    /// Returns `true` if `key` is resident. Does not affect recency.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains(key)
    }

    /// Returns the cost captured for `key` when it was last put.
    pub fn cost_of(&self, key: &K) -> Option<usize> {
        self.index.get(key).map(|id| self.entry(id).cost)
    }

    /// Returns the timestamp `key` was last stamped with.
    pub fn timestamp_of(&self, key: &K) -> Option<u64> {
        self.index.get(key).and_then(|id| self.queue.timestamp(id))
    }

    /// Returns the least-recently-used entry without touching it.
    pub fn peek_lru(&self) -> Option<(&K, &Arc<V>)> {
        let id = self.queue.back_id()?;
        let entry = self.entry(id);
        Some((&entry.key, &entry.value))
    }

    /// Timestamp of the tail entry, if any.
    pub fn oldest_timestamp(&self) -> Option<u64> {
        self.queue.back_id().and_then(|id| self.queue.timestamp(id))
    }

    /// Timestamp of the head entry, if any.
    pub fn newest_timestamp(&self) -> Option<u64> {
        self.queue.front_id().and_then(|id| self.queue.timestamp(id))
    }

    /// Last timestamp handed out.
    pub fn timestamp_counter(&self) -> u64 {
        self.timestamp_counter
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn current_space(&self) -> usize {
        self.current_space
    }

    pub fn space_limit(&self) -> usize {
        self.space_limit
    }

    pub fn overflow_budget(&self) -> usize {
        self.overflow_budget
    }

    pub fn set_overflow_budget(&mut self, overflow_budget: usize) {
        self.overflow_budget = overflow_budget;
    }

    /// Amount by which `current_space` currently exceeds `space_limit`.
    pub fn overflow(&self) -> usize {
        self.current_space.saturating_sub(self.space_limit)
    }

    /// `current_space * 100 / space_limit`; above 100 while overflowing.
    pub fn filling_ratio(&self) -> f64 {
        if self.space_limit == 0 {
            return if self.current_space == 0 {
                0.0
            } else {
                f64::INFINITY
            };
        }
        self.current_space as f64 * 100.0 / self.space_limit as f64
    }

    pub fn eviction_headroom(&self) -> f64 {
        self.headroom
    }

    /// Sets the fraction of the limit an eviction pass frees beyond the
    /// request. Must lie in `[0.0, 1.0)`.
    pub fn set_eviction_headroom(&mut self, ratio: f64) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&ratio) {
            return Err(ConfigError::HeadroomOutOfRange(ratio));
        }
        self.headroom = ratio;
        Ok(())
    }

    /// Snapshot of resident keys, most recently used first.
    pub fn keys(&self) -> Vec<K> {
        self.queue
            .iter()
            .map(|(_, entry)| entry.key.clone())
            .collect()
    }

    /// Snapshot of resident `(key, value)` pairs, most recently used first.
    ///
    /// The snapshot is detached from the cache, so later eviction cannot
    /// invalidate it.
    pub fn keys_and_values(&self) -> std::vec::IntoIter<(K, Arc<V>)> {
        self.queue
            .iter()
            .map(|(_, entry)| (entry.key.clone(), Arc::clone(&entry.value)))
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Borrowing walk from MRU to LRU. Does not affect recency.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Arc<V>)> {
        self.queue
            .iter()
            .map(|(_, entry)| (&entry.key, &entry.value))
    }

    /// Resident timestamps from LRU to MRU.
    pub fn timestamps_lru_first(&self) -> impl Iterator<Item = u64> + '_ {
        self.queue
            .iter_rev()
            .filter_map(|(id, _)| self.queue.timestamp(id))
    }

    /// Discards every entry without asking for release and drops all
    /// outstanding limit raises.
    pub fn flush(&mut self) {
        #[cfg(feature = "metrics")]
        {
            self.metrics.flushes += 1;
        }
        let raised = self.raises.drain_total();
        if raised > 0 {
            debug!(raised, "flush restores raised space limit");
        }
        self.space_limit = self.raises.base();
        self.queue.clear();
        self.index.clear();
        self.current_space = 0;
    }

    /// Verifies the bookkeeping invariants.
    ///
    /// Checks that the index and the queue hold the same keys, that the summed
    /// costs equal `current_space`, that timestamps strictly decrease from
    /// head to tail, and that every limit raise belongs to a resident key.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.queue.len() != self.index.len() {
            return Err(InvariantError::new(format!(
                "queue holds {} entries but index holds {}",
                self.queue.len(),
                self.index.len()
            )));
        }

        let mut space = 0usize;
        let mut newer: Option<u64> = None;
        for (id, entry) in self.queue.iter() {
            if self.index.get(&entry.key) != Some(id) {
                return Err(InvariantError::new(format!(
                    "queue slot {} is not indexed under its key",
                    id.index()
                )));
            }
            let Some(timestamp) = self.queue.timestamp(id) else {
                return Err(InvariantError::new("queue node without timestamp"));
            };
            if timestamp > self.timestamp_counter {
                return Err(InvariantError::new(format!(
                    "timestamp {timestamp} ahead of counter {}",
                    self.timestamp_counter
                )));
            }
            if let Some(newer) = newer {
                if timestamp >= newer {
                    return Err(InvariantError::new(format!(
                        "timestamp {timestamp} not older than its predecessor {newer}"
                    )));
                }
            }
            newer = Some(timestamp);
            space += entry.cost;
        }

        if space != self.current_space {
            return Err(InvariantError::new(format!(
                "resident cost {space} != current space {}",
                self.current_space
            )));
        }

        if self.raises.keys().any(|key| !self.index.contains(key)) {
            return Err(InvariantError::new("limit raise held by a non-resident key"));
        }
        if self.space_limit != self.raises.limit() {
            return Err(InvariantError::new(format!(
                "space limit {} != base {} plus raises {}",
                self.space_limit,
                self.raises.base(),
                self.raises.total()
            )));
        }

        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.queue.debug_validate_invariants();
        if let Err(err) = self.check_invariants() {
            panic!("{err}");
        }
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> OverflowLruMetricsSnapshot {
        OverflowLruMetricsSnapshot {
            get_hits: self.metrics.get_hits,
            get_misses: self.metrics.get_misses,
            peek_calls: self.metrics.peek_calls.get(),
            peek_hits: self.metrics.peek_hits.get(),
            put_calls: self.metrics.put_calls,
            put_new: self.metrics.put_new,
            put_updates: self.metrics.put_updates,
            put_rejected: self.metrics.put_rejected,
            put_overflowed: self.metrics.put_overflowed,
            evict_passes: self.metrics.evict_passes,
            evicted_entries: self.metrics.evicted_entries,
            refusals: self.metrics.refusals,
            limit_raises: self.metrics.limit_raises,
            flushes: self.metrics.flushes,
            len: self.len(),
            current_space: self.current_space,
            space_limit: self.space_limit,
            overflow: self.overflow(),
        }
    }

    /// Resolves an indexed handle; a miss means index and queue diverged.
    pub(crate) fn entry(&self, id: SlotId) -> &Entry<K, V> {
        match self.queue.get(id) {
            Some(entry) => entry,
            None => panic!(
                "index references slot {} missing from the recency queue",
                id.index()
            ),
        }
    }

    /// Hands out the next timestamp, renumbering residents on wraparound.
    pub(crate) fn next_timestamp(&mut self) -> u64 {
        match self.timestamp_counter.checked_add(1) {
            Some(next) => self.timestamp_counter = next,
            None => {
                self.renumber_timestamps();
                self.timestamp_counter += 1;
            },
        }
        self.timestamp_counter
    }

    fn renumber_timestamps(&mut self) {
        let ids: Vec<SlotId> = self.queue.iter_rev().map(|(id, _)| id).collect();
        debug!(entries = ids.len(), "timestamp counter wrapped; renumbering");
        for (stamp, id) in (1u64..).zip(ids) {
            self.queue.set_timestamp(id, stamp);
        }
        self.timestamp_counter = self.queue.len() as u64;
    }

    /// Links a new entry at the head and charges its cost.
    pub(crate) fn link_new(&mut self, key: K, value: Arc<V>, cost: usize) {
        let timestamp = self.next_timestamp();
        let id = self.queue.insert_at_head(
            Entry {
                key: key.clone(),
                value,
                cost,
            },
            timestamp,
        );
        let previous = self.index.insert(key, id);
        assert!(previous.is_none(), "key linked twice into the recency queue");
        self.current_space += cost;
    }

    /// Removes `id` from queue and index and refunds its cost.
    pub(crate) fn unlink(&mut self, id: SlotId) -> Entry<K, V> {
        let Some(entry) = self.queue.remove(id) else {
            panic!("unlink of slot {} absent from the recency queue", id.index());
        };
        let indexed = self.index.remove(&entry.key);
        assert_eq!(indexed, Some(id), "index and recency queue out of sync");
        self.current_space -= entry.cost;
        entry
    }
}

impl<K, V, C, E> OverflowLruCache<K, V, C, E>
where
    K: Eq + Hash + Clone,
    C: CostFunction<V>,
    E: Evictable<K, V>,
{
    /// Caches `value` under `key` and returns `value`, stored or not.
    ///
    /// Updating a resident key in place only happens when the new total still
    /// fits the limit; otherwise the old entry is removed and the value goes
    /// through eviction like a fresh insert. A value costing more than the
    /// space limit is never stored.
    pub fn put(&mut self, key: K, value: Arc<V>) -> Arc<V> {
        let cost = self.cost_fn.cost(&*value);
        #[cfg(feature = "metrics")]
        {
            self.metrics.put_calls += 1;
        }

        let mut displaced = false;
        if let Some(id) = self.index.get(&key) {
            let old_cost = self.entry(id).cost;
            let new_total = (self.current_space - old_cost).saturating_add(cost);
            if new_total <= self.space_limit {
                let timestamp = self.next_timestamp();
                match self.queue.get_mut(id) {
                    Some(entry) => {
                        entry.value = Arc::clone(&value);
                        entry.cost = cost;
                    },
                    None => panic!(
                        "index references slot {} missing from the recency queue",
                        id.index()
                    ),
                }
                self.queue.promote(id, timestamp);
                self.current_space = new_total;
                #[cfg(feature = "metrics")]
                {
                    self.metrics.put_updates += 1;
                }

                #[cfg(debug_assertions)]
                self.debug_validate_invariants();

                return value;
            }
            self.unlink(id);
            displaced = true;
        }

        let stored = if cost > self.space_limit {
            debug!(
                cost,
                space_limit = self.space_limit,
                "value costs more than the space limit; not cached"
            );
            false
        } else {
            self.make_space(cost)
        };

        if stored {
            self.link_new(key, Arc::clone(&value), cost);
            #[cfg(feature = "metrics")]
            {
                self.metrics.put_new += 1;
            }
        } else {
            #[cfg(feature = "metrics")]
            {
                self.metrics.put_rejected += 1;
            }
            if displaced {
                self.restore_limit_and_trim(&key);
            }
        }

        #[cfg(debug_assertions)]
        self.debug_validate_invariants();

        value
    }

    /// Removes `key` unconditionally, bypassing the release protocol.
    pub fn remove_key(&mut self, key: &K) -> Option<Arc<V>> {
        let id = self.index.get(key)?;
        let entry = self.unlink(id);
        self.restore_limit_and_trim(&entry.key);

        #[cfg(debug_assertions)]
        self.debug_validate_invariants();

        Some(entry.value)
    }

    /// Removes `key` unconditionally and discards the value.
    pub fn flush_key(&mut self, key: &K) {
        let _ = self.remove_key(key);
    }

    /// Installs a new base space limit.
    ///
    /// Outstanding limit raises stay layered on top, so the limit in force
    /// becomes `space_limit + total_raised()` until their parents leave.
    /// Lowering the limit runs an eviction pass down to the new value right
    /// away; entries that refuse release stay, leaving the cache overflowed.
    /// Raising it takes effect lazily.
    pub fn set_space_limit(&mut self, space_limit: usize) {
        self.raises.set_base(space_limit);
        let effective = self.raises.limit();
        if effective < self.space_limit {
            debug!(
                from = self.space_limit,
                to = effective,
                "shrinking space limit"
            );
            self.space_limit = effective;
            self.evict_pass(0);
        } else {
            self.space_limit = effective;
        }

        #[cfg(debug_assertions)]
        self.debug_validate_invariants();
    }
}

impl<K, V, C, E> Clone for OverflowLruCache<K, V, C, E>
where
    K: Eq + Hash + Clone,
    C: Clone,
    E: Clone,
{
    /// Copies limit, budget, headroom, raises, and every entry with its cost,
    /// relinking oldest first so the recency order matches. The copy shares
    /// values (`Arc`) but nothing else.
    fn clone(&self) -> Self {
        let mut copy = Self::with_capabilities(
            self.space_limit,
            self.overflow_budget,
            self.cost_fn.clone(),
            self.evictor.clone(),
        );
        copy.headroom = self.headroom;
        copy.raises = self.raises.clone();
        for (_, entry) in self.queue.iter_rev() {
            copy.link_new(entry.key.clone(), Arc::clone(&entry.value), entry.cost);
        }
        copy
    }
}

impl<K, V, C, E> fmt::Debug for OverflowLruCache<K, V, C, E>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverflowLruCache")
            .field("len", &self.len())
            .field("current_space", &self.current_space)
            .field("space_limit", &self.space_limit)
            .field("overflow_budget", &self.overflow_budget)
            .field("timestamp_counter", &self.timestamp_counter)
            .finish_non_exhaustive()
    }
}

impl<K, V, C, E> fmt::Display for OverflowLruCache<K, V, C, E>
where
    K: Eq + Hash + Clone + fmt::Display,
    V: fmt::Display,
{
    /// Lists `key=value` pairs most recently used first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "OverflowLruCache {:.2}% full ({}/{})",
            self.filling_ratio(),
            self.current_space,
            self.space_limit
        )?;
        for (key, value) in self.iter() {
            writeln!(f, "\t{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::ptr_arg)]
    fn by_len(value: &String) -> usize {
        value.len()
    }

    fn s(value: &str) -> Arc<String> {
        Arc::new(value.to_string())
    }

    mod basic_behavior {
        use super::*;

        #[test]
        #[should_panic(expected = "missing from the recency queue")]
        fn update_with_desynced_index_fails_fast() {
            let mut cache = OverflowLruCache::new(4);
            cache.put(1u32, Arc::new(1u32));
            let id = cache.index.get(&1).unwrap();
            let _ = cache.queue.remove(id);
            cache.put(1, Arc::new(2));
        }

        #[test]
        fn new_cache_is_empty() {
            let cache: OverflowLruCache<u32, u32> = OverflowLruCache::new(10);
            assert_eq!(cache.len(), 0);
            assert!(cache.is_empty());
            assert_eq!(cache.current_space(), 0);
            assert_eq!(cache.space_limit(), 10);
            assert_eq!(cache.overflow_budget(), 0);
            assert_eq!(cache.filling_ratio(), 0.0);
        }

        #[test]
        fn put_then_get_round_trips() {
            let mut cache = OverflowLruCache::new(5);
            let value = Arc::new(100);
            let returned = cache.put(1, Arc::clone(&value));
            assert!(Arc::ptr_eq(&returned, &value));
            assert_eq!(cache.get(&1), Some(value));
            assert_eq!(cache.current_space(), 1);
        }

        #[test]
        fn absent_lookups_return_none() {
            let mut cache: OverflowLruCache<u32, u32> = OverflowLruCache::new(5);
            assert!(cache.get(&1).is_none());
            assert!(cache.peek(&1).is_none());
            assert!(cache.remove_key(&1).is_none());
            assert_eq!(cache.cost_of(&1), None);
        }

        #[test]
        fn get_key_returns_stored_instance() {
            let mut cache = OverflowLruCache::new(5);
            let stored = Arc::new("key".to_string());
            cache.put(Arc::clone(&stored), Arc::new(1));

            let probe = Arc::new("key".to_string());
            assert!(Arc::ptr_eq(cache.get_key(&probe), &stored));

            let other = Arc::new("other".to_string());
            assert!(Arc::ptr_eq(cache.get_key(&other), &other));
        }

        #[test]
        fn update_in_place_keeps_single_entry() {
            let mut cache = OverflowLruCache::with_capabilities(10, 0, by_len, AlwaysRelease);
            cache.put("k", s("aa"));
            cache.put("k", s("aaaa"));
            assert_eq!(cache.len(), 1);
            assert_eq!(cache.current_space(), 4);
            assert_eq!(cache.cost_of(&"k"), Some(4));
            assert_eq!(cache.peek(&"k").as_deref().map(String::as_str), Some("aaaa"));
        }

        #[test]
        fn remove_key_refunds_cost() {
            let mut cache = OverflowLruCache::with_capabilities(10, 0, by_len, AlwaysRelease);
            cache.put("a", s("aaa"));
            cache.put("b", s("bb"));
            assert_eq!(cache.remove_key(&"a").as_deref().map(String::as_str), Some("aaa"));
            assert_eq!(cache.current_space(), 2);
            assert!(!cache.contains(&"a"));
        }

        #[test]
        fn flush_key_removes_without_return() {
            let mut cache = OverflowLruCache::new(3);
            cache.put(1, Arc::new(1));
            cache.flush_key(&1);
            cache.flush_key(&1);
            assert!(cache.is_empty());
        }

        #[test]
        fn flush_discards_everything_without_asking() {
            let mut cache =
                OverflowLruCache::with_capabilities(3, 0, UnitCost, |_: &u32, _: &u32| false);
            cache.put(1u32, Arc::new(1u32));
            cache.put(2, Arc::new(2));
            cache.flush();
            assert!(cache.is_empty());
            assert_eq!(cache.current_space(), 0);
            cache.put(3, Arc::new(3));
            assert_eq!(cache.keys(), vec![3]);
        }

        #[test]
        fn zero_limit_stores_only_free_values() {
            let mut cache = OverflowLruCache::with_capabilities(0, 0, by_len, AlwaysRelease);
            cache.put("a", s("a"));
            cache.put("empty", s(""));
            assert_eq!(cache.keys(), vec!["empty"]);
            assert_eq!(cache.filling_ratio(), 0.0);
        }
    }

    mod recency {
        use super::*;

        #[test]
        fn concrete_scenario_capacity_three() {
            let mut cache = OverflowLruCache::new(3);
            cache.put('A', Arc::new(1));
            cache.put('B', Arc::new(2));
            cache.put('C', Arc::new(3));
            assert_eq!(cache.keys(), vec!['C', 'B', 'A']);

            cache.get(&'A');
            assert_eq!(cache.keys(), vec!['A', 'C', 'B']);

            cache.put('D', Arc::new(4));
            assert_eq!(cache.keys(), vec!['D', 'A', 'C']);
            assert!(cache.get(&'B').is_none());
        }

        #[test]
        fn first_inserted_is_first_evicted() {
            let mut cache = OverflowLruCache::new(4);
            for i in 0..5 {
                cache.put(i, Arc::new(i));
            }
            assert!(!cache.contains(&0));
            assert_eq!(cache.keys(), vec![4, 3, 2, 1]);
        }

        #[test]
        fn promotion_changes_victim() {
            let mut cache = OverflowLruCache::new(2);
            cache.put("a", Arc::new(1));
            cache.put("b", Arc::new(2));
            cache.get(&"a");
            cache.put("c", Arc::new(3));
            assert!(cache.contains(&"a"));
            assert!(!cache.contains(&"b"));
        }

        #[test]
        fn peek_does_not_reorder_or_restamp() {
            let mut cache = OverflowLruCache::new(3);
            cache.put(1, Arc::new(1));
            cache.put(2, Arc::new(2));
            let before = cache.timestamp_of(&1);
            let counter = cache.timestamp_counter();

            assert_eq!(cache.peek(&1).as_deref(), Some(&1));
            assert_eq!(cache.keys(), vec![2, 1]);
            assert_eq!(cache.timestamp_of(&1), before);
            assert_eq!(cache.timestamp_counter(), counter);
        }

        #[test]
        fn get_restamps_with_newest_timestamp() {
            let mut cache = OverflowLruCache::new(3);
            cache.put(1, Arc::new(1));
            cache.put(2, Arc::new(2));
            cache.get(&1);
            assert_eq!(cache.newest_timestamp(), cache.timestamp_of(&1));
            assert_eq!(cache.oldest_timestamp(), cache.timestamp_of(&2));
            assert_eq!(cache.peek_lru().map(|(k, _)| *k), Some(2));
        }

        #[test]
        fn update_promotes_key() {
            let mut cache = OverflowLruCache::new(3);
            cache.put(1, Arc::new(1));
            cache.put(2, Arc::new(2));
            cache.put(1, Arc::new(10));
            assert_eq!(cache.keys(), vec![1, 2]);
        }

        #[test]
        fn timestamps_stay_unique_after_wraparound() {
            let mut cache = OverflowLruCache::new(3);
            cache.put(1, Arc::new(1));
            cache.put(2, Arc::new(2));
            cache.timestamp_counter = u64::MAX - 1;
            cache.put(3, Arc::new(3));
            assert_eq!(cache.timestamp_counter(), u64::MAX);

            // Renumbering runs tail first: 1, 2, 3, then 1 is restamped.
            cache.get(&1);
            assert_eq!(cache.timestamp_of(&2), Some(2));
            assert_eq!(cache.timestamp_of(&3), Some(3));
            assert_eq!(cache.timestamp_of(&1), Some(4));
            assert_eq!(cache.timestamp_counter(), 4);
            assert_eq!(cache.keys(), vec![1, 3, 2]);
        }
    }

    mod weighted {
        use super::*;

        #[test]
        fn eviction_frees_enough_cost() {
            let mut cache = OverflowLruCache::with_capabilities(6, 0, by_len, AlwaysRelease);
            cache.put("a", s("aa"));
            cache.put("b", s("bb"));
            cache.put("c", s("cc"));
            cache.put("d", s("dddd"));
            assert_eq!(cache.keys(), vec!["d", "c"]);
            assert_eq!(cache.current_space(), 6);
        }

        #[test]
        fn oversized_value_is_never_stored() {
            let mut cache = OverflowLruCache::with_capabilities(4, 100, by_len, AlwaysRelease);
            cache.put("a", s("aa"));
            let big = s("bbbbb");
            let returned = cache.put("big", Arc::clone(&big));
            assert!(Arc::ptr_eq(&returned, &big));
            assert!(cache.get(&"big").is_none());
            assert_eq!(cache.current_space(), 2);
            assert_eq!(cache.keys(), vec!["a"]);
        }

        #[test]
        fn same_key_grow_reruns_eviction() {
            let mut cache = OverflowLruCache::with_capabilities(5, 0, by_len, AlwaysRelease);
            cache.put("a", s("aa"));
            cache.put("b", s("bb"));
            cache.put("a", s("aaaa"));
            assert_eq!(cache.keys(), vec!["a"]);
            assert_eq!(cache.current_space(), 4);
        }

        #[test]
        fn same_key_grow_past_limit_drops_entry() {
            let mut cache = OverflowLruCache::with_capabilities(3, 0, by_len, AlwaysRelease);
            cache.put("a", s("aa"));
            cache.put("a", s("aaaa"));
            assert!(!cache.contains(&"a"));
            assert_eq!(cache.current_space(), 0);
        }

        #[test]
        fn headroom_frees_extra_space() {
            let mut cache = OverflowLruCache::new(10);
            cache.set_eviction_headroom(0.3).unwrap();
            for i in 0..10 {
                cache.put(i, Arc::new(i));
            }
            cache.put(10, Arc::new(10));
            // A pass aims for three free units, then the new entry takes one.
            assert_eq!(cache.len(), 8);
            assert_eq!(cache.current_space(), 8);
            assert!(!cache.contains(&2));
            assert!(cache.contains(&3));
        }

        #[test]
        fn headroom_rejects_out_of_range() {
            let mut cache: OverflowLruCache<u32, u32> = OverflowLruCache::new(10);
            assert_eq!(
                cache.set_eviction_headroom(1.0),
                Err(ConfigError::HeadroomOutOfRange(1.0))
            );
            assert!(cache.set_eviction_headroom(-0.1).is_err());
            assert!(cache.set_eviction_headroom(f64::NAN).is_err());
            assert_eq!(cache.eviction_headroom(), 0.0);
        }
    }

    mod limits {
        use super::*;

        #[test]
        fn shrinking_limit_evicts_synchronously() {
            let mut cache = OverflowLruCache::new(5);
            for i in 0..5 {
                cache.put(i, Arc::new(i));
            }
            cache.set_space_limit(2);
            assert_eq!(cache.space_limit(), 2);
            assert_eq!(cache.keys(), vec![4, 3]);
        }

        #[test]
        fn growing_limit_is_lazy() {
            let mut cache = OverflowLruCache::new(2);
            cache.put(1, Arc::new(1));
            cache.put(2, Arc::new(2));
            cache.set_space_limit(4);
            assert_eq!(cache.len(), 2);
            cache.put(3, Arc::new(3));
            cache.put(4, Arc::new(4));
            assert_eq!(cache.len(), 4);
        }

        #[test]
        fn try_with_capabilities_rejects_overflowing_budget() {
            let result: Result<OverflowLruCache<u32, u32>, _> =
                OverflowLruCache::try_with_capabilities(usize::MAX, 1, UnitCost, AlwaysRelease);
            assert!(matches!(result, Err(ConfigError::BudgetOverflow { .. })));
        }
    }

    mod snapshots {
        use super::*;

        #[test]
        fn keys_and_values_survive_later_eviction() {
            let mut cache = OverflowLruCache::new(2);
            cache.put(1, Arc::new("one"));
            cache.put(2, Arc::new("two"));
            let snapshot: Vec<_> = cache.keys_and_values().collect();
            cache.put(3, Arc::new("three"));
            cache.put(4, Arc::new("four"));
            assert_eq!(snapshot.len(), 2);
            assert_eq!(snapshot[0].0, 2);
            assert_eq!(*snapshot[1].1, "one");
        }

        #[test]
        fn clone_preserves_order_cost_and_independence() {
            let mut cache = OverflowLruCache::with_capabilities(10, 0, by_len, AlwaysRelease);
            cache.put("a", s("a"));
            cache.put("b", s("bbb"));
            cache.put("c", s("cc"));
            cache.get(&"a");

            let mut copy = cache.clone();
            assert_eq!(copy.keys(), cache.keys());
            assert_eq!(copy.current_space(), cache.current_space());
            assert_eq!(copy.space_limit(), cache.space_limit());
            for key in ["a", "b", "c"] {
                assert_eq!(copy.cost_of(&key), cache.cost_of(&key));
            }

            copy.remove_key(&"b");
            copy.put("d", s("dddd"));
            assert!(cache.contains(&"b"));
            assert!(!cache.contains(&"d"));
            copy.debug_validate_invariants();
        }

        #[test]
        fn display_lists_mru_first() {
            let mut cache = OverflowLruCache::new(4);
            cache.put(1, Arc::new("x"));
            cache.put(2, Arc::new("y"));
            let text = cache.to_string();
            assert!(text.starts_with("OverflowLruCache 50.00% full (2/4)"));
            let first = text.find("2=y").unwrap();
            let second = text.find("1=x").unwrap();
            assert!(first < second);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Put(u8, usize),
            Get(u8),
            Peek(u8),
            Remove(u8),
            Limit(usize),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                4 => (0u8..32, 0usize..6).prop_map(|(k, c)| Op::Put(k, c)),
                2 => (0u8..32).prop_map(Op::Get),
                1 => (0u8..32).prop_map(Op::Peek),
                1 => (0u8..32).prop_map(Op::Remove),
                1 => (0usize..24).prop_map(Op::Limit),
            ]
        }

        proptest! {
            /// Accounting and bijection hold after any operation sequence.
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_invariants_hold(
                limit in 0usize..20,
                ops in prop::collection::vec(op_strategy(), 0..150)
            ) {
                let mut cache =
                    OverflowLruCache::with_capabilities(limit, 0, |v: &usize| *v, AlwaysRelease);
                for op in ops {
                    match op {
                        Op::Put(k, c) => { cache.put(k, Arc::new(c)); },
                        Op::Get(k) => { cache.get(&k); },
                        Op::Peek(k) => { cache.peek(&k); },
                        Op::Remove(k) => { cache.remove_key(&k); },
                        Op::Limit(l) => cache.set_space_limit(l),
                    }
                    prop_assert!(cache.check_invariants().is_ok());
                    prop_assert!(cache.current_space() <= cache.space_limit());
                }
            }

            /// A value that fits the limit is readable right after it is put.
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_put_then_get(
                limit in 1usize..20,
                prefill in prop::collection::vec((0u8..32, 0usize..6), 0..40),
                key in 0u8..32,
                cost in 0usize..20
            ) {
                let mut cache =
                    OverflowLruCache::with_capabilities(limit, 0, |v: &usize| *v, AlwaysRelease);
                for (k, c) in prefill {
                    cache.put(k, Arc::new(c));
                }
                cache.put(key, Arc::new(cost));
                if cost <= limit {
                    let got = cache.get(&key);
                    prop_assert_eq!(got.as_deref(), Some(&cost));
                } else {
                    prop_assert!(cache.get(&key).is_none());
                }
            }

            /// Peek never changes the recency order.
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_peek_preserves_order(
                keys in prop::collection::vec(0u8..16, 1..30),
                probe in 0u8..16
            ) {
                let mut cache = OverflowLruCache::new(8);
                for k in keys {
                    cache.put(k, Arc::new(k));
                }
                let before = cache.keys();
                cache.peek(&probe);
                prop_assert_eq!(cache.keys(), before);
            }
        }
    }
}
