use crate::stats::Stats;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

pub const REPORT_PERIOD: Duration = Duration::from_secs(1);

/// Logs a statistics line every second until `stop` receives a message or
/// is disconnected, then logs the final figures.
///
/// Purely observational: it never touches the sink nor the send timing.
pub fn run(stats: Arc<Stats>, stop: Receiver<()>) {
    run_with_period(stats, stop, REPORT_PERIOD)
}

pub fn run_with_period(stats: Arc<Stats>, stop: Receiver<()>, period: Duration) {
    loop {
        match stop.recv_timeout(period) {
            Err(RecvTimeoutError::Timeout) => log::info!("{}", stats.snapshot()),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    log::info!("{}", stats.snapshot());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_stops_promptly() {
        let stats = Arc::new(Stats::new());
        let (tx, rx) = bounded::<()>(0);
        let handle = {
            let stats = Arc::clone(&stats);
            thread::spawn(move || run(stats, rx))
        };
        let start = Instant::now();
        drop(tx);
        handle.join().unwrap();
        assert!(start.elapsed() < REPORT_PERIOD);
    }

    #[test]
    fn test_does_not_modify_stats() {
        let stats = Arc::new(Stats::new());
        stats.update(100, &Ok(()));
        let (tx, rx) = bounded::<()>(0);
        let handle = {
            let stats = Arc::clone(&stats);
            thread::spawn(move || run_with_period(stats, rx, Duration::from_millis(5)))
        };
        thread::sleep(Duration::from_millis(30));
        drop(tx);
        handle.join().unwrap();
        let s = stats.snapshot();
        assert_eq!((s.packets, s.bytes, s.errors), (1, 100, 0));
    }
}
