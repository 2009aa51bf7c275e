//! Execution adapters: where and how many times a dispatch callback runs.
//!
//! A [`Dispatcher`](crate::Dispatcher) is single-threaded, so adapters never
//! share one. The callback handed to [`Adapter::start`] builds its own
//! dispatcher for each worker:
//!
//! ```rust
//! use std::sync::Arc;
//! use tasklane::{Adapter, Dispatcher, WorkerPool};
//!
//! let mut pool = WorkerPool::new(2);
//! pool.start(Arc::new(|worker| {
//!     let mut cli = Dispatcher::new(["prog", "job"])?;
//!     cli.task("job").action(move |_| Ok(()));
//!     cli.run()?;
//!     assert!(worker < 2);
//!     Ok(())
//! }))?;
//! # Ok::<(), tasklane::DispatchError>(())
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::error::{DispatchError, Result};

/// Callback run once per worker, receiving the worker id.
pub type WorkerFn = Arc<dyn Fn(usize) -> anyhow::Result<()> + Send + Sync>;

/// Runs a dispatch callback on one or more workers.
pub trait Adapter {
    /// Number of workers `start` will run.
    fn worker_count(&self) -> usize;

    /// Runs `callback` on every worker and blocks until all are done.
    fn start(&mut self, callback: WorkerFn) -> Result<()>;

    /// Asks workers to finish. Workers observe this through a [`StopToken`];
    /// a stop requested before `start` is seen by the workers it starts.
    fn stop(&mut self);

    /// Registers a callback run on each worker before the main callback.
    fn on_worker_start(&mut self, callback: WorkerFn);

    /// Registers a callback run on each worker after the main callback.
    fn on_worker_stop(&mut self, callback: WorkerFn);

    /// Processes a single job on the calling thread.
    fn on_job(&mut self, job: &dyn Fn() -> anyhow::Result<()>) -> Result<()> {
        job().map_err(DispatchError::Action)
    }
}

/// Shared flag telling workers to wind down.
///
/// Clones share the flag, so a worker holding a clone can stop its siblings
/// while [`Adapter::start`] is blocked. Once stopped, the token stays stopped
/// until [`StopToken::resume`] is called.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clears a previous stop request.
    pub fn resume(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Default, Clone)]
struct Lifecycle {
    on_start: Vec<WorkerFn>,
    on_stop: Vec<WorkerFn>,
}

impl Lifecycle {
    fn run_worker(&self, id: usize, callback: &WorkerFn) -> anyhow::Result<()> {
        tracing::debug!(worker = id, "worker starting");
        for hook in &self.on_start {
            hook(id)?;
        }
        let result = callback(id);
        for hook in &self.on_stop {
            hook(id)?;
        }
        tracing::debug!(worker = id, ok = result.is_ok(), "worker stopped");
        result
    }
}

/// Runs the callback once, on the current thread, as worker 0.
#[derive(Default)]
pub struct Generic {
    lifecycle: Lifecycle,
    token: StopToken,
}

impl Generic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_token(&self) -> StopToken {
        self.token.clone()
    }
}

impl Adapter for Generic {
    fn worker_count(&self) -> usize {
        1
    }

    fn start(&mut self, callback: WorkerFn) -> Result<()> {
        self.lifecycle
            .run_worker(0, &callback)
            .map_err(DispatchError::Action)
    }

    fn stop(&mut self) {
        self.token.stop();
    }

    fn on_worker_start(&mut self, callback: WorkerFn) {
        self.lifecycle.on_start.push(callback);
    }

    fn on_worker_stop(&mut self, callback: WorkerFn) {
        self.lifecycle.on_stop.push(callback);
    }
}

/// Runs the callback on `workers` OS threads, one call per thread.
pub struct WorkerPool {
    workers: usize,
    lifecycle: Lifecycle,
    token: StopToken,
}

impl WorkerPool {
    /// A pool of `workers` threads. Zero is treated as one.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            lifecycle: Lifecycle::default(),
            token: StopToken::default(),
        }
    }

    pub fn stop_token(&self) -> StopToken {
        self.token.clone()
    }
}

impl Adapter for WorkerPool {
    fn worker_count(&self) -> usize {
        self.workers
    }

    /// Spawns every worker, then joins them in id order.
    ///
    /// The first callback error (by worker id) is returned after all workers
    /// have finished. A panicking worker yields
    /// [`DispatchError::WorkerPanicked`].
    fn start(&mut self, callback: WorkerFn) -> Result<()> {
        tracing::debug!(
            workers = self.workers,
            stopped = self.token.is_stopped(),
            "starting worker pool"
        );

        let handles: Vec<_> = (0..self.workers)
            .map(|id| {
                let lifecycle = self.lifecycle.clone();
                let callback = callback.clone();
                thread::spawn(move || lifecycle.run_worker(id, &callback))
            })
            .collect();

        let mut first_error = None;
        for (id, handle) in handles.into_iter().enumerate() {
            let outcome = match handle.join() {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => DispatchError::Action(e),
                Err(_) => DispatchError::WorkerPanicked(id),
            };
            tracing::warn!(worker = id, error = %outcome, "worker failed");
            first_error.get_or_insert(outcome);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn stop(&mut self) {
        self.token.stop();
    }

    fn on_worker_start(&mut self, callback: WorkerFn) {
        self.lifecycle.on_start.push(callback);
    }

    fn on_worker_stop(&mut self, callback: WorkerFn) {
        self.lifecycle.on_stop.push(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[test]
    fn test_generic_runs_once_as_worker_zero() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();

        let mut adapter = Generic::new();
        adapter
            .start(Arc::new(move |id| {
                record.lock().unwrap().push(id);
                Ok(())
            }))
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_generic_propagates_error() {
        let mut adapter = Generic::new();
        let err = adapter
            .start(Arc::new(|_| Err(anyhow::anyhow!("boom"))))
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_on_job_runs_inline() {
        let calls = AtomicUsize::new(0);
        let mut adapter = Generic::new();
        adapter
            .on_job(&|| -> anyhow::Result<()> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pool_runs_every_worker() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();

        let mut pool = WorkerPool::new(4);
        assert_eq!(pool.worker_count(), 4);
        pool.start(Arc::new(move |id| {
            record.lock().unwrap().push(id);
            Ok(())
        }))
        .unwrap();

        let mut ids = seen.lock().unwrap().clone();
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_pool_lifecycle_hooks_wrap_callback() {
        let events = Arc::new(Mutex::new(Vec::new()));

        let mut pool = WorkerPool::new(1);
        let log = events.clone();
        pool.on_worker_start(Arc::new(move |id| {
            log.lock().unwrap().push(format!("start-{}", id));
            Ok(())
        }));
        let log = events.clone();
        pool.on_worker_stop(Arc::new(move |id| {
            log.lock().unwrap().push(format!("stop-{}", id));
            Ok(())
        }));

        let log = events.clone();
        pool.start(Arc::new(move |id| {
            log.lock().unwrap().push(format!("job-{}", id));
            Ok(())
        }))
        .unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec!["start-0", "job-0", "stop-0"]
        );
    }

    #[test]
    fn test_pool_reports_panic() {
        let mut pool = WorkerPool::new(2);
        let err = pool
            .start(Arc::new(|id| {
                if id == 1 {
                    panic!("worker blew up");
                }
                Ok(())
            }))
            .unwrap_err();
        assert!(matches!(err, DispatchError::WorkerPanicked(1)));
    }

    #[test]
    fn test_zero_workers_means_one() {
        assert_eq!(WorkerPool::new(0).worker_count(), 1);
    }

    #[test]
    fn test_stop_token() {
        let mut pool = WorkerPool::new(1);
        let token = pool.stop_token();
        assert!(!token.is_stopped());
        pool.stop();
        assert!(token.is_stopped());
        token.resume();
        assert!(!pool.stop_token().is_stopped());
    }

    #[test]
    fn test_stop_before_start_reaches_workers() {
        let mut pool = WorkerPool::new(2);
        let token = pool.stop_token();
        pool.stop();

        let seen = Arc::new(AtomicUsize::new(0));
        let count = seen.clone();
        pool.start(Arc::new(move |_| {
            if token.is_stopped() {
                count.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }))
        .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_worker_stops_its_siblings() {
        let mut pool = WorkerPool::new(3);
        let token = pool.stop_token();
        let rounds = Arc::new(AtomicUsize::new(0));
        let counter = rounds.clone();

        pool.start(Arc::new(move |id| {
            if id == 0 {
                thread::sleep(std::time::Duration::from_millis(50));
                token.stop();
                return Ok(());
            }
            while !token.is_stopped() {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(std::time::Duration::from_millis(5));
            }
            Ok(())
        }))
        .unwrap();

        assert!(pool.stop_token().is_stopped());
        assert!(rounds.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_generic_sees_stop() {
        let mut adapter = Generic::new();
        let token = adapter.stop_token();
        adapter.stop();
        let err = adapter
            .start(Arc::new(move |_| {
                anyhow::ensure!(!token.is_stopped(), "stopped");
                Ok(())
            }))
            .unwrap_err();
        assert_eq!(err.to_string(), "stopped");
    }
}
