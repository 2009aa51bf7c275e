//! Fixed-interval polling loop.

use std::ops::ControlFlow;
use std::thread;
use std::time::{Duration, Instant};

/// Timing for [`run_loop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

impl LoopConfig {
    /// Runs the callback once per `interval`.
    pub fn every(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Calls `callback` repeatedly until it returns `ControlFlow::Break`.
///
/// Iterations start one interval apart: the time the callback took is
/// subtracted from the sleep. A callback slower than the interval runs again
/// immediately. Returns the number of iterations run.
pub fn run_loop<F>(config: LoopConfig, mut callback: F) -> usize
where
    F: FnMut() -> ControlFlow<()>,
{
    let mut iterations = 0;
    loop {
        let started = Instant::now();
        iterations += 1;
        if callback().is_break() {
            tracing::debug!(iterations, "loop stopped");
            return iterations;
        }
        let remaining = config.interval.saturating_sub(started.elapsed());
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
    }
}
