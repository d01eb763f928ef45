//! Per-job progress aggregation and ETA

use std::time::{Duration, Instant};

use tonvanity_pattern::search_space;

use crate::types::{ProgressSnapshot, SearchStatus};

/// Rate and remaining-time estimate for `total` attempts after `elapsed`.
///
/// The ETA assumes uniform coverage of a `16^pattern_len` space and ignores
/// revisits, so it is a heuristic only.
pub fn estimate(total: u64, elapsed: Duration, pattern_len: usize) -> (u64, Option<u64>) {
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        (total as f64 / secs).floor() as u64
    } else {
        0
    };

    let remaining = search_space(pattern_len).saturating_sub(total);
    let eta = if rate > 0 { Some(remaining / rate) } else { None };

    (rate, eta)
}

/// Sums batch reports from all workers of one job
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    total_attempts: u64,
    started_at: Instant,
    pattern_len: usize,
}

impl ProgressAggregator {
    pub fn new(pattern_len: usize, started_at: Instant) -> Self {
        Self {
            total_attempts: 0,
            started_at,
            pattern_len,
        }
    }

    pub fn total_attempts(&self) -> u64 {
        self.total_attempts
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Add one batch report and return the running snapshot
    pub fn record(&mut self, batch: u64) -> ProgressSnapshot {
        self.record_at(batch, Instant::now())
    }

    pub fn record_at(&mut self, batch: u64, now: Instant) -> ProgressSnapshot {
        self.total_attempts = self.total_attempts.saturating_add(batch);
        self.snapshot_at(now, SearchStatus::Running)
    }

    pub fn snapshot_at(&self, now: Instant, status: SearchStatus) -> ProgressSnapshot {
        let elapsed = now.saturating_duration_since(self.started_at);
        let (rate, eta) = estimate(self.total_attempts, elapsed, self.pattern_len);
        ProgressSnapshot {
            attempts: self.total_attempts,
            attempts_per_second: rate,
            estimated_time_seconds: eta,
            status,
        }
    }
}
