// src/monitor/wait_log.rs

use std::time::{Duration, Instant};

/// Lower bound on the gap between two "still waiting" lines.
pub const MIN_WAIT_LOG_GAP: Duration = Duration::from_secs(5 * 60);

/// Decides when the poll loop may log "still waiting".
///
/// The first miss is always logged; after that at most once per
/// `max(10 × interval, 5 min)`. Pure: callers pass the current instant.
#[derive(Debug, Clone)]
pub struct WaitLog {
    gap: Duration,
    last: Option<Instant>,
}

impl WaitLog {
    pub fn new(interval: Duration) -> Self {
        Self {
            gap: interval.saturating_mul(10).max(MIN_WAIT_LOG_GAP),
            last: None,
        }
    }

    pub fn gap(&self) -> Duration {
        self.gap
    }

    /// Returns `true` if a line should be logged at `now`, and if so
    /// remembers `now` as the last logged instant.
    pub fn should_log(&mut self, now: Instant) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.gap,
        };
        if due {
            self.last = Some(now);
        }
        due
    }
}
