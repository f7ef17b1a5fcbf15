//! TokioClock - wall clock that advances with the tokio timer

use chrono::{DateTime, Utc};
use contracts::Clock;
use tokio::time::Instant;

/// Clock anchored to `tokio::time::Instant`
///
/// Reads `anchor + elapsed`, so under a paused test runtime the timestamps
/// stamped on entries and the timers that drive flushes move together.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    wall: DateTime<Utc>,
    instant: Instant,
}

impl TokioClock {
    /// Anchor at the current wall-clock time
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Anchor at a fixed wall-clock time
    pub fn anchored_at(wall: DateTime<Utc>) -> Self {
        Self {
            wall,
            instant: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.instant.elapsed())
            .unwrap_or(chrono::Duration::MAX);
        self.wall
            .checked_add_signed(elapsed)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
