//! Error types for the overflow LRU cache.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: returned by fallible constructors and setters when a
//!   configuration parameter is out of range.
//! - [`InvariantError`]: returned by
//!   [`OverflowLruCache::check_invariants`](crate::cache::OverflowLruCache::check_invariants)
//!   when the index and the recency queue disagree or the space accounting
//!   drifted. Seeing one means the cache itself is broken.
//!
//! Absent keys and refused releases are not errors: lookups return `None` and
//! refusals surface as [`overflow`](crate::cache::OverflowLruCache::overflow).
//!
//! ## Example Usage
//!
//! ```
//! use overflow_lru::builder::CacheBuilder;
//! use overflow_lru::error::ConfigError;
//!
//! let err = CacheBuilder::new(100)
//!     .eviction_headroom(1.5)
//!     .try_build::<u32, String>()
//!     .unwrap_err();
//! assert!(matches!(err, ConfigError::HeadroomOutOfRange(_)));
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Invalid cache configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Eviction headroom must lie in `[0.0, 1.0)`.
    HeadroomOutOfRange(f64),
    /// `space_limit + overflow_budget` does not fit in `usize`.
    BudgetOverflow {
        space_limit: usize,
        overflow_budget: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::HeadroomOutOfRange(ratio) => {
                write!(f, "eviction headroom {ratio} is outside [0.0, 1.0)")
            },
            ConfigError::BudgetOverflow {
                space_limit,
                overflow_budget,
            } => write!(
                f,
                "space limit {space_limit} plus overflow budget {overflow_budget} overflows usize"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Internal bookkeeping no longer matches its invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache invariant violated: {}", self.0)
    }
}

impl std::error::Error for InvariantError {}
