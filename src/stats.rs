//! Staleness histogram for tuning the space limit.
//!
//! [`StatsRecorder`] maps cache timestamps to wall-clock time by sampling the
//! head's timestamp whenever [`snapshot`](StatsRecorder::snapshot) is called.
//! A resident entry stamped with `t` is attributed the time of the first
//! sample whose counter is `>= t`, i.e. the first snapshot that saw it.
//!
//! ```text
//!   samples (counter → wall time)       queue walked tail → head
//!   ┌─────────┬──────────────────┐      ┌───────────────────────────────────┐
//!   │   12    │ 10:00:00         │      │ group 1 (oldest) │ ... │ group N  │
//!   │   40    │ 10:05:00         │ ───► │  avg age 2h 3m   │     │ avg 4s   │
//!   │   97    │ 10:10:00         │      └───────────────────────────────────┘
//!   └─────────┴──────────────────┘
//! ```
//!
//! Both operations walk the whole queue or sample list; keep them off hot
//! paths. Neither changes the cache's recency order.
//!
//! When the cache renumbers its timestamps after the counter wraps, every
//! sample taken before refers to the old numbering and is discarded at the
//! next snapshot.

use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cache::OverflowLruCache;

/// Number of buckets used by [`StatsRecorder::print_stats`].
pub const DEFAULT_STATS_GROUPS: usize = 5;

const INITIAL_SAMPLE_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Sample {
    counter: u64,
    at: DateTime<Utc>,
}

/// `(timestamp counter, wall time)` samples.
#[derive(Debug, Clone)]
pub struct StatsRecorder {
    // Ascending by counter; reset whenever the cache's counter moves backwards.
    samples: Vec<Sample>,
    last_counter: u64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self {
            samples: Vec::with_capacity(INITIAL_SAMPLE_CAPACITY),
            last_counter: 0,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Records the head's timestamp at the current wall time.
    pub fn snapshot<K, V, C, E>(&mut self, cache: &OverflowLruCache<K, V, C, E>)
    where
        K: Eq + Hash + Clone,
    {
        self.snapshot_at(cache, Utc::now());
    }

    /// Drops samples older than the tail (no resident entry can map to them)
    /// and records the head's timestamp at `now` unless already sampled.
    ///
    /// A counter lower than the one seen last time means the cache renumbered
    /// its entries; all earlier samples are dropped.
    pub fn snapshot_at<K, V, C, E>(
        &mut self,
        cache: &OverflowLruCache<K, V, C, E>,
        now: DateTime<Utc>,
    ) where
        K: Eq + Hash + Clone,
    {
        let counter = cache.timestamp_counter();
        if counter < self.last_counter {
            debug!(
                samples = self.samples.len(),
                "timestamp counter moved backwards; discarding samples"
            );
            self.samples.clear();
        }
        self.last_counter = counter;

        match cache.oldest_timestamp() {
            Some(oldest) => self.samples.retain(|sample| sample.counter >= oldest),
            None => self.samples.clear(),
        }
        if let Some(newest) = cache.newest_timestamp() {
            self.record(newest, now);
        }
    }

    fn record(&mut self, counter: u64, at: DateTime<Utc>) {
        if self.samples.iter().any(|sample| sample.counter == counter) {
            return;
        }
        self.samples.push(Sample { counter, at });
    }

    /// Wall time of the first snapshot that saw `timestamp`.
    pub fn wall_time_for(&self, timestamp: u64) -> Option<DateTime<Utc>> {
        self.samples
            .iter()
            .find(|sample| sample.counter >= timestamp)
            .map(|sample| sample.at)
    }

    /// Average age of `count` entries whose sampled wall times (epoch
    /// milliseconds) add up to `accumulated_millis`, measured at `now`.
    ///
    /// Returns `None` when `count` is zero.
    pub fn average_age(
        accumulated_millis: i128,
        count: usize,
        now: DateTime<Utc>,
    ) -> Option<AgeBreakdown> {
        if count == 0 {
            return None;
        }
        let average = accumulated_millis / count as i128;
        let age_millis = (i128::from(now.timestamp_millis()) - average).max(0);
        Some(AgeBreakdown::from_seconds((age_millis / 1000) as u64))
    }

    /// Partitions the queue, oldest first, into `groups` equal-size buckets
    /// and reports the average age of each.
    pub fn report<K, V, C, E>(
        &self,
        cache: &OverflowLruCache<K, V, C, E>,
        groups: usize,
        now: DateTime<Utc>,
    ) -> StatsReport
    where
        K: Eq + Hash + Clone,
    {
        let groups = groups.max(1);
        let entries = cache.len();
        let per_group = (entries / groups).max(1);

        let mut report = StatsReport {
            entries,
            current_space: cache.current_space(),
            space_limit: cache.space_limit(),
            per_group,
            groups: Vec::with_capacity(groups),
        };

        let mut members = 0usize;
        let mut sampled = 0usize;
        let mut accumulated = 0i128;
        for timestamp in cache.timestamps_lru_first() {
            if let Some(at) = self.wall_time_for(timestamp) {
                accumulated += i128::from(at.timestamp_millis());
                sampled += 1;
            }
            members += 1;
            if members >= per_group && report.groups.len() + 1 < groups {
                report.groups.push(GroupStats {
                    entries: members,
                    sampled,
                    average_age: Self::average_age(accumulated, sampled, now),
                });
                members = 0;
                sampled = 0;
                accumulated = 0;
            }
        }
        if members > 0 {
            report.groups.push(GroupStats {
                entries: members,
                sampled,
                average_age: Self::average_age(accumulated, sampled, now),
            });
        }
        report
    }

    /// Renders a [`DEFAULT_STATS_GROUPS`]-bucket report at the current time.
    pub fn print_stats<K, V, C, E>(&self, cache: &OverflowLruCache<K, V, C, E>) -> String
    where
        K: Eq + Hash + Clone,
    {
        self.report(cache, DEFAULT_STATS_GROUPS, Utc::now()).to_string()
    }
}

impl Default for StatsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Age split into whole days, hours, minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBreakdown {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl AgeBreakdown {
    pub fn from_seconds(total: u64) -> Self {
        Self {
            days: total / 86_400,
            hours: total % 86_400 / 3_600,
            minutes: total % 3_600 / 60,
            seconds: total % 60,
        }
    }
}

impl fmt::Display for AgeBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} days {} hours {} minutes {} seconds",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStats {
    pub entries: usize,
    /// Entries that could be mapped to a wall time.
    pub sampled: usize,
    pub average_age: Option<AgeBreakdown>,
}

/// Per-bucket staleness, oldest bucket first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsReport {
    pub entries: usize,
    pub current_space: usize,
    pub space_limit: usize,
    pub per_group: usize,
    pub groups: Vec<GroupStats>,
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries == 0 {
            return writeln!(f, "No elements in cache");
        }
        writeln!(
            f,
            "Number of elements in cache: {} (space {}/{})",
            self.entries, self.current_space, self.space_limit
        )?;
        writeln!(
            f,
            "(elements are split into {} groups of ~{}; group 1 is least recently used)",
            self.groups.len(),
            self.per_group
        )?;
        for (idx, group) in self.groups.iter().enumerate() {
            match group.average_age {
                Some(age) => writeln!(
                    f,
                    "Group {}: {} elements, average age {}",
                    idx + 1,
                    group.entries,
                    age
                )?,
                None => writeln!(
                    f,
                    "Group {}: {} elements, average age N/A",
                    idx + 1,
                    group.entries
                )?,
            }
        }
        Ok(())
    }
}
