/// Point-in-time copy of the cache counters plus gauges read at snapshot time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OverflowLruMetricsSnapshot {
    pub get_hits: u64,
    pub get_misses: u64,
    pub peek_calls: u64,
    pub peek_hits: u64,

    pub put_calls: u64,
    pub put_new: u64,
    pub put_updates: u64,
    pub put_rejected: u64,   // cost exceeded limit or overflow budget
    pub put_overflowed: u64, // stored while over the space limit

    pub evict_passes: u64,
    pub evicted_entries: u64,
    pub refusals: u64,
    pub limit_raises: u64,
    pub flushes: u64,

    // gauges
    pub len: usize,
    pub current_space: usize,
    pub space_limit: usize,
    pub overflow: usize,
}

impl OverflowLruMetricsSnapshot {
    /// Fraction of `get` calls that hit, or `0.0` before the first call.
    pub fn hit_rate(&self) -> f64 {
        let total = self.get_hits + self.get_misses;
        if total == 0 {
            0.0
        } else {
            self.get_hits as f64 / total as f64
        }
    }
}
