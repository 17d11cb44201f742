use crate::config::{PacketCount, TrafficConfig, TrafficMode};
use crate::error::Result;
use crate::frame;
use crate::sink::FrameSink;
use crate::stats::Stats;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use rand_core::SeedableRng;
use rand_pcg::Pcg32;
use std::time::{Duration, Instant};

/// Number of frames sent at each tick in burst mode
pub const BURST_SIZE: usize = 10;

/// Periodic ticks on absolute deadlines.
///
/// A late tick fires immediately, but ticks missed by more than one period
/// are dropped instead of being caught up in a burst.
struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    fn new(period: Duration) -> Self {
        Ticker {
            period,
            next: Instant::now() + period,
        }
    }

    /// Blocks until the next tick. Returns false if `stop` received a
    /// message or got disconnected meanwhile.
    fn wait(&mut self, stop: &Receiver<()>) -> bool {
        let timeout = self.next.saturating_duration_since(Instant::now());
        match stop.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => (),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return false,
        }
        let now = Instant::now();
        self.next += self.period;
        if now > self.next + self.period {
            self.next = now;
        }
        true
    }
}

fn send<S: FrameSink + ?Sized>(sink: &mut S, stats: &Stats, frame: &[u8]) {
    let outcome = sink.write_frame(frame);
    if let Err(e) = &outcome {
        log::debug!("Failed to send frame: {e}");
    }
    stats.update(frame.len(), &outcome);
}

/// Sends the traffic described by `config` through `sink`.
///
/// The configuration is validated and the frame built before the first
/// tick: any error there is returned and nothing is sent. Afterwards, write
/// failures are only counted in `stats`.
///
/// The loop stops after `config.count` ticks, or, in any case, as soon as
/// `stop` receives a message or all its senders are dropped. Returns the
/// number of ticks performed.
pub fn run<S: FrameSink + ?Sized>(
    sink: &mut S,
    config: &TrafficConfig,
    stats: &Stats,
    stop: &Receiver<()>,
) -> Result<u64> {
    config.validate()?;
    let frame = frame::build(config)?;
    log::info!(
        "Sending {}-byte frames ({} mode, {} pps, count: {})",
        frame.len(),
        config.mode,
        config.rate,
        config.count
    );

    let seed = config.seed.unwrap_or_else(rand::random);
    let mut rng = Pcg32::seed_from_u64(seed);
    let mut scratch = Vec::with_capacity(frame.len());

    let mut ticker = Ticker::new(config.period());
    let mut ticks: u64 = 0;
    while ticker.wait(stop) {
        match config.mode {
            TrafficMode::Sequential => send(sink, stats, frame.as_bytes()),
            TrafficMode::Random => {
                frame.randomize_into(&mut rng, &mut scratch);
                send(sink, stats, &scratch);
            }
            TrafficMode::Burst => {
                for _ in 0..BURST_SIZE {
                    send(sink, stats, frame.as_bytes());
                }
            }
        }

        ticks += 1;
        if let PacketCount::Bounded(count) = config.count {
            if ticks >= count {
                break;
            }
        }
    }
    log::debug!("Send loop stopped after {ticks} ticks");
    Ok(ticks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_ticker_period() {
        let (_tx, rx) = bounded::<()>(1);
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(10));
        for _ in 0..3 {
            assert!(ticker.wait(&rx));
        }
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_ticker_stop() {
        let (tx, rx) = bounded::<()>(1);
        let mut ticker = Ticker::new(Duration::from_secs(3600));
        tx.send(()).unwrap();
        assert!(!ticker.wait(&rx));
        drop(tx);
        assert!(!ticker.wait(&rx));
    }

    #[test]
    fn test_ticker_drops_missed_ticks() {
        let (_tx, rx) = bounded::<()>(1);
        let period = Duration::from_millis(5);
        let mut ticker = Ticker::new(period);
        std::thread::sleep(Duration::from_millis(50));
        assert!(ticker.wait(&rx));
        // no backlog of ten ticks: the next deadline is close to now
        assert!(ticker.next <= Instant::now() + period);
        assert!(ticker.next + Duration::from_millis(20) > Instant::now());
    }
}
