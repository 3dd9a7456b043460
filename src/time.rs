//! Operation time tracking.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use log;

/// Time tracker interface. Brackets an operation with `start` and `stop` calls.
pub trait TimeTracker: Send + Sync {
    /// Starts (or restarts) the measurement.
    fn start(&self);

    /// Stops the measurement and reports the elapsed time of the named operation.
    fn stop(&self, operation_name: &str);
}

/// Time tracker reporting elapsed time to the log.
#[derive(Default)]
pub struct LogTimeTracker {
    started: Mutex<Option<Instant>>,
}

impl LogTimeTracker {
    pub fn new() -> Self {
        LogTimeTracker::default()
    }
}

impl TimeTracker for LogTimeTracker {
    fn start(&self) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
    }

    fn stop(&self, operation_name: &str) {
        let started = match self.started.lock() {
            Ok(mut started) => started.take(),
            Err(_) => None,
        };

        match started {
            Some(started) => log::info!(
                "{} completed in {}",
                operation_name,
                format_elapsed(started.elapsed())
            ),
            None => log::warn!("{} stopped without being started", operation_name),
        }
    }
}

/// Time tracker that does nothing.
#[derive(Default)]
pub struct NoopTimeTracker;

impl TimeTracker for NoopTimeTracker {
    fn start(&self) {}

    fn stop(&self, _operation_name: &str) {}
}

/// Formats a duration as `hh:mm:ss`.
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use rstest::*;

    use super::{format_elapsed, LogTimeTracker, TimeTracker};

    #[rstest]
    #[case(Duration::from_millis(999), "00:00:00")]
    #[case(Duration::from_secs(61), "00:01:01")]
    #[case(Duration::from_secs(3600 * 26 + 59), "26:00:59")]
    fn test_format_elapsed(#[case] elapsed: Duration, #[case] expected: &str) {
        assert_eq!(format_elapsed(elapsed), expected);
    }

    #[test]
    fn test_log_time_tracker() {
        let tracker = LogTimeTracker::new();
        tracker.start();
        tracker.stop("test");
        assert!(tracker.started.lock().unwrap().is_none());
    }
}
