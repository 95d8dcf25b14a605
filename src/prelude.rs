pub use crate::builder::CacheBuilder;
pub use crate::cache::OverflowLruCache;
pub use crate::error::{ConfigError, InvariantError};
#[cfg(feature = "metrics")]
pub use crate::metrics::OverflowLruMetricsSnapshot;
pub use crate::overflow::LimitRaises;
pub use crate::stats::{AgeBreakdown, DEFAULT_STATS_GROUPS, StatsRecorder, StatsReport};
pub use crate::traits::{AlwaysRelease, CostFunction, Evictable, UnitCost};
