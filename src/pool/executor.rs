//! Bounded worker pool with caller-runs backpressure.
//!
//! # Submission order
//! 1. Fewer than `core_workers` running: start a worker with the task.
//! 2. Otherwise: enqueue on the bounded queue.
//! 3. Queue full and fewer than `max_workers` running: start a worker.
//! 4. Queue full and at `max_workers`: the submitter runs the task itself.
//!
//! Workers above the core count retire after `keep_alive` without work.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::{mpsc, Mutex};

use crate::config::PoolConfig;
use crate::error::GatewayError;
use crate::observability::metrics;

type Task = BoxFuture<'static, ()>;

/// Where a submitted task ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// Handed directly to a newly started worker.
    Worker,
    /// Placed on the queue for an existing worker.
    Queued,
    /// Executed by the submitting task because the pool was saturated.
    CallerRuns,
}

impl Execution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Execution::Worker => "worker",
            Execution::Queued => "queued",
            Execution::CallerRuns => "caller_runs",
        }
    }
}

/// Resolved pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSize {
    pub core_workers: usize,
    pub max_workers: usize,
    pub queue_capacity: usize,
    pub keep_alive: Duration,
}

impl PoolSize {
    /// Resolve configured sizes, substituting `2 × (cores + 1)` and
    /// `4 × (cores + 1)` for zero worker counts.
    pub fn from_config(config: &PoolConfig) -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::resolve(config, cores)
    }

    pub(crate) fn resolve(config: &PoolConfig, cores: usize) -> Self {
        let core_workers = match config.core_workers {
            0 => 2 * (cores + 1),
            n => n,
        };
        let max_workers = match config.max_workers {
            0 => 4 * (cores + 1),
            n => n,
        };
        Self {
            core_workers,
            max_workers,
            queue_capacity: config.queue_capacity,
            keep_alive: Duration::from_millis(config.keep_alive_ms),
        }
    }
}

struct Shared {
    name: &'static str,
    queue: Mutex<mpsc::Receiver<Task>>,
    workers: AtomicUsize,
    core_workers: usize,
    keep_alive: Duration,
}

impl Shared {
    /// Give up a worker slot if the pool is above its core size.
    fn try_retire(&self) -> bool {
        let mut current = self.workers.load(Ordering::Acquire);
        loop {
            if current <= self.core_workers {
                return false;
            }
            match self.workers.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(x) => current = x,
            }
        }
    }
}

/// A fixed-capacity task queue drained by an elastic set of Tokio workers.
///
/// Dropping the pool closes the queue; workers finish what is queued and exit.
pub struct WorkerPool {
    shared: Arc<Shared>,
    queue: mpsc::Sender<Task>,
    max_workers: usize,
}

impl WorkerPool {
    pub fn new(name: &'static str, size: PoolSize) -> Result<Self, GatewayError> {
        if size.queue_capacity == 0 {
            return Err(GatewayError::InvalidConfiguration(
                "pool queue capacity must be greater than 0".into(),
            ));
        }
        if size.core_workers == 0 || size.core_workers > size.max_workers {
            return Err(GatewayError::InvalidConfiguration(format!(
                "pool needs 1 <= core workers ({}) <= max workers ({})",
                size.core_workers, size.max_workers
            )));
        }

        let (tx, rx) = mpsc::channel(size.queue_capacity);
        tracing::debug!(
            pool = name,
            core_workers = size.core_workers,
            max_workers = size.max_workers,
            queue_capacity = size.queue_capacity,
            "Worker pool created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                name,
                queue: Mutex::new(rx),
                workers: AtomicUsize::new(0),
                core_workers: size.core_workers,
                keep_alive: size.keep_alive,
            }),
            queue: tx,
            max_workers: size.max_workers,
        })
    }

    /// Submit a task. Never drops it: under saturation the task is awaited
    /// in place before this returns.
    pub async fn execute<F>(&self, task: F) -> Execution
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let execution = self.submit(task.boxed()).await;
        metrics::record_submission(execution);
        execution
    }

    async fn submit(&self, task: Task) -> Execution {
        let task = match self.start_worker(self.shared.core_workers, task) {
            Ok(()) => return Execution::Worker,
            Err(task) => task,
        };

        let task = match self.queue.try_send(task) {
            Ok(()) => return Execution::Queued,
            Err(mpsc::error::TrySendError::Full(task))
            | Err(mpsc::error::TrySendError::Closed(task)) => task,
        };

        let task = match self.start_worker(self.max_workers, task) {
            Ok(()) => return Execution::Worker,
            Err(task) => task,
        };

        tracing::debug!(pool = self.shared.name, "Pool saturated, running task on caller");
        run_guarded(self.shared.name, task).await;
        Execution::CallerRuns
    }

    /// Claim a worker slot below `limit` and start a worker seeded with `first`.
    fn start_worker(&self, limit: usize, first: Task) -> Result<(), Task> {
        let mut current = self.shared.workers.load(Ordering::Acquire);
        loop {
            if current >= limit {
                return Err(first);
            }
            match self.shared.workers.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(x) => current = x,
            }
        }

        tokio::spawn(worker_loop(self.shared.clone(), first));
        Ok(())
    }

    /// Number of live workers.
    pub fn workers(&self) -> usize {
        self.shared.workers.load(Ordering::Acquire)
    }

    /// Number of tasks waiting in the queue.
    pub fn queued(&self) -> usize {
        self.queue.max_capacity() - self.queue.capacity()
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.shared.name)
            .field("workers", &self.workers())
            .field("core_workers", &self.shared.core_workers)
            .field("max_workers", &self.max_workers)
            .field("queued", &self.queued())
            .finish()
    }
}

async fn worker_loop(shared: Arc<Shared>, first: Task) {
    run_guarded(shared.name, first).await;

    loop {
        // Waiting for the lock counts as idle time too, so every idle extra
        // worker retires within one keep-alive window.
        let next = tokio::time::timeout(shared.keep_alive, async {
            let mut queue = shared.queue.lock().await;
            queue.recv().await
        })
        .await;

        match next {
            Ok(Some(task)) => run_guarded(shared.name, task).await,
            Ok(None) => {
                shared.workers.fetch_sub(1, Ordering::AcqRel);
                return;
            }
            Err(_idle) => {
                if shared.try_retire() {
                    tracing::trace!(pool = shared.name, "Idle worker retired");
                    return;
                }
            }
        }
    }
}

/// Run a task, containing any panic so the worker slot stays accounted for.
async fn run_guarded(pool: &'static str, task: Task) {
    if AssertUnwindSafe(task).catch_unwind().await.is_err() {
        tracing::error!(pool, "Pool task panicked");
    }
}
