use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::types::Direction;

/// Renders a byte count with a binary unit suffix and two decimals.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2}GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2}MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2}KB", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// Byte counters of one session.
///
/// Each counter has a single writer: the outbound loop only adds to `sent`,
/// the inbound loop only to `received`. Readers may see a value that is one
/// chunk behind, which is fine for periodic reporting.
#[derive(Debug)]
pub struct SessionStats {
    sent: AtomicU64,
    received: AtomicU64,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            sent: AtomicU64::new(0),
            received: AtomicU64::new(0),
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    pub fn add(&self, direction: Direction, n: u64) {
        let counter = match direction {
            Direction::Outbound => &self.sent,
            Direction::Inbound => &self.received,
        };
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            elapsed: self.elapsed(),
            sent: self.sent(),
            received: self.received(),
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters, rendered for humans by `Display`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub elapsed: Duration,
    pub sent: u64,
    pub received: u64,
}

impl StatsSnapshot {
    /// Bytes per second over the elapsed time, zero before the first millisecond.
    pub fn throughput(bytes: u64, elapsed: Duration) -> u64 {
        let millis = elapsed.as_millis();
        if millis == 0 {
            return 0;
        }
        (bytes as u128 * 1000 / millis) as u64
    }

    pub fn elapsed_display(&self) -> String {
        let rounded = Duration::from_millis(self.elapsed.as_millis() as u64);
        humantime::format_duration(rounded).to_string()
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} elapsed, {} sent ({}/s), {} received ({}/s)",
            self.elapsed_display(),
            format_bytes(self.sent),
            format_bytes(Self::throughput(self.sent, self.elapsed)),
            format_bytes(self.received),
            format_bytes(Self::throughput(self.received, self.elapsed)),
        )
    }
}
