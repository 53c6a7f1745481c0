use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Fixed-interval send pacer.
///
/// Each `reserve` books the next slot `interval` after the previous one, so a burst
/// of sends is spread out at one send per interval (100ms by default for
/// broadcasts, well under Telegram's ~30 msg/sec global limit).
#[derive(Debug)]
pub struct SendPacer {
    interval: Duration,
    next: Instant,
}

impl SendPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    pub fn reserve(&mut self) -> Duration {
        self.reserve_at(Instant::now())
    }

    fn reserve_at(&mut self, now: Instant) -> Duration {
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }

    /// Wait until the next slot is available.
    pub async fn pace(&mut self) {
        let wait = self.reserve();
        if wait > Duration::ZERO {
            sleep(wait).await;
        }
    }
}
