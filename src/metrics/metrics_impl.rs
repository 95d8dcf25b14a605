use crate::metrics::cell::MetricsCell;

/// Live counters owned by an [`OverflowLruCache`](crate::cache::OverflowLruCache).
#[derive(Debug, Default, Clone)]
pub struct OverflowLruMetrics {
    pub get_hits: u64,
    pub get_misses: u64,
    pub peek_calls: MetricsCell,
    pub peek_hits: MetricsCell,
    pub put_calls: u64,
    pub put_new: u64,
    pub put_updates: u64,
    pub put_rejected: u64,
    pub put_overflowed: u64,
    pub evict_passes: u64,
    pub evicted_entries: u64,
    pub refusals: u64,
    pub limit_raises: u64,
    pub flushes: u64,
}

impl OverflowLruMetrics {
    #[inline]
    pub fn record_get(&mut self, hit: bool) {
        if hit {
            self.get_hits += 1;
        } else {
            self.get_misses += 1;
        }
    }

    #[inline]
    pub fn record_peek(&self, hit: bool) {
        self.peek_calls.incr();
        if hit {
            self.peek_hits.incr();
        }
    }

    #[inline]
    pub fn record_refusal(&mut self) {
        self.refusals += 1;
    }

    #[inline]
    pub fn record_eviction(&mut self) {
        self.evicted_entries += 1;
    }
}
