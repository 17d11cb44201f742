use crate::error::Error;

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    packets: u64,
    bytes: u64,
    errors: u64,
}

/// Generation statistics, shared between the send loop and the reporter.
///
/// The three counters live behind a single mutex so that a snapshot never
/// mixes packets and bytes from different updates.
#[derive(Debug)]
pub struct Stats {
    start_time: Instant,
    counters: Mutex<Counters>,
}

impl Default for Stats {
    fn default() -> Self {
        Stats::new()
    }
}

/// A consistent view of the statistics at some instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub packets: u64,
    pub bytes: u64,
    pub errors: u64,
    pub elapsed: Duration,
    /// packets per second
    pub pps: f64,
    /// bits per second
    pub bps: f64,
}

impl StatsSnapshot {
    fn new(counters: Counters, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let (pps, bps) = if secs > 0. {
            (
                counters.packets as f64 / secs,
                8. * counters.bytes as f64 / secs,
            )
        } else {
            (0., 0.)
        };
        StatsSnapshot {
            packets: counters.packets,
            bytes: counters.bytes,
            errors: counters.errors,
            elapsed,
            pps,
            bps,
        }
    }

    pub fn mbps(&self) -> f64 {
        self.bps / 1_000_000.
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packets: {} | Rate: {:.2} pps | Bandwidth: {:.2} Mbps | Errors: {}",
            self.packets,
            self.pps,
            self.mbps(),
            self.errors
        )
    }
}

impl Stats {
    pub fn new() -> Self {
        Stats {
            start_time: Instant::now(),
            counters: Mutex::default(),
        }
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    /// Records one write attempt of `bytes` bytes
    pub fn update(&self, bytes: usize, outcome: &Result<(), Error>) {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(()) => {
                counters.packets += 1;
                counters.bytes += bytes as u64;
            }
            Err(_) => counters.errors += 1,
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.snapshot_at(Instant::now())
    }

    /// Snapshot with the rates computed at instant `now`
    pub fn snapshot_at(&self, now: Instant) -> StatsSnapshot {
        let counters = *self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        StatsSnapshot::new(counters, now.saturating_duration_since(self.start_time))
    }
}
