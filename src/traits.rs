//! # Capability Traits
//!
//! The cache core is generic over two capabilities supplied at construction
//! time instead of methods on the cached values themselves:
//!
//! ```text
//!   ┌─────────────────────────────┐      ┌──────────────────────────────────┐
//!   │      CostFunction<V>        │      │         Evictable<K, V>          │
//!   │                             │      │                                  │
//!   │  cost(&V) → usize           │      │  try_release(&K, &V) → bool      │
//!   │                             │      │                                  │
//!   │  default: UnitCost (1)      │      │  default: AlwaysRelease (true)   │
//!   └──────────────┬──────────────┘      └────────────────┬─────────────────┘
//!                  │ captured once per put                │ asked per eviction candidate
//!                  ▼                                      ▼
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                    OverflowLruCache<K, V, C, E>                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both traits are implemented for plain closures, so most callers never name
//! a capability type:
//!
//! ```
//! use std::sync::Arc;
//! use overflow_lru::OverflowLruCache;
//!
//! let mut cache = OverflowLruCache::with_capabilities(
//!     10,
//!     0,
//!     |value: &String| value.len(),
//!     |_key: &u32, value: &String| !value.starts_with("busy"),
//! );
//! cache.put(1, Arc::new("hello".to_string()));
//! assert_eq!(cache.current_space(), 5);
//! ```
//!
//! ## Release contract
//!
//! `try_release` runs synchronously on the calling thread in the middle of an
//! eviction pass. It must be fast and must not reach back into the cache that
//! is asking (the borrow checker already rules that out for safe code).
//! Returning `false` keeps the entry resident; a panic inside the callback is
//! caught by the cache and counted as a refusal.

/// Computes the weight a value consumes against the space limit.
pub trait CostFunction<V: ?Sized> {
    fn cost(&self, value: &V) -> usize;
}

impl<V: ?Sized, F> CostFunction<V> for F
where
    F: Fn(&V) -> usize,
{
    #[inline]
    fn cost(&self, value: &V) -> usize {
        self(value)
    }
}

/// Every value costs one unit; the cache behaves like a slot-counted LRU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitCost;

impl<V: ?Sized> CostFunction<V> for UnitCost {
    #[inline]
    fn cost(&self, _value: &V) -> usize {
        1
    }
}

/// Asks an eviction candidate whether it may be released right now.
pub trait Evictable<K, V: ?Sized> {
    /// Returns `true` to accept release, `false` to stay resident.
    fn try_release(&mut self, key: &K, value: &V) -> bool;
}

impl<K, V: ?Sized, F> Evictable<K, V> for F
where
    F: FnMut(&K, &V) -> bool,
{
    #[inline]
    fn try_release(&mut self, key: &K, value: &V) -> bool {
        self(key, value)
    }
}

/// Accepts every release request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlwaysRelease;

impl<K, V: ?Sized> Evictable<K, V> for AlwaysRelease {
    #[inline]
    fn try_release(&mut self, _key: &K, _value: &V) -> bool {
        true
    }
}
