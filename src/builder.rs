//! Fluent construction of [`OverflowLruCache`].
//!
//! The builder carries the space limit, overflow budget and eviction headroom,
//! and swaps in custom capabilities without naming their types.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use overflow_lru::builder::CacheBuilder;
//!
//! let mut cache = CacheBuilder::new(100)
//!     .overflow_budget(20)
//!     .eviction_headroom(0.1)
//!     .cost_fn(|value: &Vec<u8>| value.len())
//!     .build::<u64, Vec<u8>>();
//!
//! cache.put(1, Arc::new(vec![0; 40]));
//! assert_eq!(cache.current_space(), 40);
//! assert_eq!(cache.overflow_budget(), 20);
//! ```

use std::hash::Hash;

use crate::cache::OverflowLruCache;
use crate::error::ConfigError;
use crate::traits::{AlwaysRelease, CostFunction, Evictable, UnitCost};

/// Builder for [`OverflowLruCache`] instances.
#[derive(Debug, Clone)]
pub struct CacheBuilder<C = UnitCost, E = AlwaysRelease> {
    space_limit: usize,
    overflow_budget: usize,
    headroom: f64,
    cost_fn: C,
    evictor: E,
}

impl CacheBuilder {
    /// Starts a unit-cost, always-releasing configuration.
    pub fn new(space_limit: usize) -> Self {
        Self {
            space_limit,
            overflow_budget: 0,
            headroom: 0.0,
            cost_fn: UnitCost,
            evictor: AlwaysRelease,
        }
    }
}

impl<C, E> CacheBuilder<C, E> {
    /// Extra space the cache may hold while every candidate refuses release.
    pub fn overflow_budget(mut self, overflow_budget: usize) -> Self {
        self.overflow_budget = overflow_budget;
        self
    }

    /// Fraction of the limit each eviction pass tries to free, in `[0.0, 1.0)`.
    pub fn eviction_headroom(mut self, ratio: f64) -> Self {
        self.headroom = ratio;
        self
    }

    pub fn cost_fn<C2>(self, cost_fn: C2) -> CacheBuilder<C2, E> {
        CacheBuilder {
            space_limit: self.space_limit,
            overflow_budget: self.overflow_budget,
            headroom: self.headroom,
            cost_fn,
            evictor: self.evictor,
        }
    }

    pub fn evictor<E2>(self, evictor: E2) -> CacheBuilder<C, E2> {
        CacheBuilder {
            space_limit: self.space_limit,
            overflow_budget: self.overflow_budget,
            headroom: self.headroom,
            cost_fn: self.cost_fn,
            evictor,
        }
    }

    /// Builds the cache.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid. For a non-panicking
    /// alternative, use [`try_build`](Self::try_build).
    pub fn build<K, V>(self) -> OverflowLruCache<K, V, C, E>
    where
        K: Eq + Hash + Clone,
        C: CostFunction<V>,
        E: Evictable<K, V>,
    {
        match self.try_build() {
            Ok(cache) => cache,
            Err(e) => panic!("{}", e),
        }
    }

    /// Builds the cache, returning an error on invalid parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the headroom lies outside `[0.0, 1.0)` or
    /// the limit plus budget overflows `usize`.
    pub fn try_build<K, V>(self) -> Result<OverflowLruCache<K, V, C, E>, ConfigError>
    where
        K: Eq + Hash + Clone,
        C: CostFunction<V>,
        E: Evictable<K, V>,
    {
        let mut cache = OverflowLruCache::try_with_capabilities(
            self.space_limit,
            self.overflow_budget,
            self.cost_fn,
            self.evictor,
        )?;
        cache.set_eviction_headroom(self.headroom)?;
        Ok(cache)
    }
}
