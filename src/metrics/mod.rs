//! Operation counters, compiled only with the `metrics` feature.
//!
//! Counters are plain `u64`s bumped from `&mut self` paths; read-only paths
//! such as `peek` go through [`MetricsCell`](cell::MetricsCell).

pub mod cell;
pub mod metrics_impl;
pub mod snapshot;

pub use metrics_impl::OverflowLruMetrics;
pub use snapshot::OverflowLruMetricsSnapshot;
