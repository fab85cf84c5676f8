//! Elapsed-time measurement for script runs and syntax checks.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A two-call stopwatch: [`start`](Self::start), then [`stop`](Self::stop),
/// then read [`elapsed_ms`](Self::elapsed_ms).
///
/// One instance per timed operation; it is not meant to be shared between
/// overlapping timings.
#[derive(Debug, Default, Clone, Copy)]
pub struct StopWatch {
    started: Option<Instant>,
    stopped: Option<Instant>,
}

impl StopWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stopwatch that is already running.
    pub fn started() -> Self {
        let mut sw = Self::new();
        sw.start();
        sw
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
        self.stopped = None;
    }

    pub fn stop(&mut self) {
        self.stopped = Some(Instant::now());
    }

    /// Milliseconds between `start` and `stop`, truncated.
    ///
    /// Both calls must have happened; a stopwatch that was never stopped
    /// reports zero.
    pub fn elapsed_ms(&self) -> u64 {
        debug_assert!(
            self.started.is_some() && self.stopped.is_some(),
            "elapsed_ms() read before start()/stop()"
        );
        match (self.started, self.stopped) {
            (Some(start), Some(stop)) => {
                let ms = stop.saturating_duration_since(start).as_millis();
                u64::try_from(ms).unwrap_or(u64::MAX)
            }
            _ => 0,
        }
    }
}

/// Wall-clock time in seconds since the Unix epoch, with sub-second precision.
pub fn precise_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
