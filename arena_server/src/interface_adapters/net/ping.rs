// Round-trip time estimation from server pings echoed by the client.

use std::collections::VecDeque;
use std::time::Duration;

pub const PING_INTERVAL: Duration = Duration::from_secs(2);
/// Samples averaged into the reported RTT.
pub const RTT_WINDOW: usize = 5;
/// Echoes older than this are stale (or forged) and ignored.
pub const MAX_RTT_SAMPLE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct PingTracker {
    samples: VecDeque<Duration>,
    window: usize,
}

impl Default for PingTracker {
    fn default() -> Self {
        Self::new(RTT_WINDOW)
    }
}

impl PingTracker {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            samples: VecDeque::with_capacity(window),
            window,
        }
    }

    /// Records the echo of a ping sent at `sent_ms`, returning the updated average.
    pub fn record_echo(&mut self, sent_ms: u64, now_ms: u64) -> Option<Duration> {
        let elapsed = now_ms.checked_sub(sent_ms)?;
        let sample = Duration::from_millis(elapsed);
        if sample > MAX_RTT_SAMPLE {
            return None;
        }
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        self.average()
    }

    pub fn average(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_the_most_recent_window() {
        let mut tracker = PingTracker::default();
        assert_eq!(tracker.average(), None);
        for rtt in [100, 100, 100, 100, 100] {
            tracker.record_echo(1_000, 1_000 + rtt);
        }
        assert_eq!(tracker.average(), Some(Duration::from_millis(100)));

        // Sixth sample evicts the first.
        assert_eq!(tracker.record_echo(2_000, 2_600), Some(Duration::from_millis(200)));
        assert_eq!(tracker.sample_count(), RTT_WINDOW);
    }

    #[test]
    fn ignores_future_and_stale_echoes() {
        let mut tracker = PingTracker::default();
        assert_eq!(tracker.record_echo(5_000, 4_000), None);
        assert_eq!(tracker.record_echo(0, 60_000), None);
        assert_eq!(tracker.sample_count(), 0);
        assert_eq!(tracker.record_echo(1_000, 1_040), Some(Duration::from_millis(40)));
    }
}
