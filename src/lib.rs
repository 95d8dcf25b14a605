//! overflow-lru: a cost-weighted LRU cache whose eviction victims may refuse
//! release, with a bounded overflow budget and scoped limit raises.
//!
//! See `DESIGN.md` for internal architecture and invariants.

pub mod builder;
pub mod cache;
pub mod ds;
pub mod error;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod overflow;
pub mod prelude;
pub mod stats;
pub mod traits;

pub use cache::OverflowLruCache;
