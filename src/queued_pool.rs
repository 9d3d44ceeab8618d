//! `QueuedPool` — a `DirectPool` plus an unbounded FIFO backlog fed by a
//! dedicated dispatcher thread.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info};

use crate::direct_pool::DirectPool;
use crate::error::PoolError;
use crate::monitor::Monitor;
use crate::task::BoxedTask;
use crate::task_slot::IdleSink;

/// Upper bound of the randomized backoff the dispatcher sleeps for after a
/// failed assignment attempt, before looking at the backlog again.
const DISPATCH_BACKOFF_MAX_MS: u64 = 112;

struct QueueState {
    backlog: VecDeque<BoxedTask>,
    stopping: bool,
}

struct QueueIdleSink {
    monitor: Arc<Monitor<QueueState>>,
}

impl IdleSink for QueueIdleSink {
    fn notify_idle(&self) {
        let guard = self.monitor.lock().expect("queue monitor is never locked reentrantly");
        guard.notify_all();
    }
}

/// A `DirectPool` with an unbounded FIFO backlog: `execute` never blocks,
/// tasks pile up in the backlog and a dispatcher thread feeds them into the
/// underlying pool as slots free up.
pub struct QueuedPool {
    inner: Arc<DirectPool>,
    queue: Arc<Monitor<QueueState>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl QueuedPool {
    /// Spawns `size` worker threads plus one dispatcher thread. The
    /// dispatcher starts immediately — there is no separate "armed but not
    /// started" state to manage, matching the rest of the crate's
    /// constructors, which leave nothing to do before a caller can submit
    /// work.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ThreadStart`] if any worker or the dispatcher
    /// thread fails to spawn.
    pub fn new(size: usize, stack_size: usize) -> Result<Self, PoolError> {
        let queue = Arc::new(Monitor::new(QueueState { backlog: VecDeque::new(), stopping: false }));
        let queue_sink: Arc<dyn IdleSink> = Arc::new(QueueIdleSink { monitor: Arc::clone(&queue) });

        let inner = Arc::new(DirectPool::with_extra_sink(size, stack_size, Some(queue_sink))?);
        let dispatcher = spawn_dispatcher(Arc::clone(&inner), Arc::clone(&queue))?;

        info!(workers = size, "queued pool started");
        Ok(Self { inner, queue, dispatcher: Some(dispatcher) })
    }

    /// Idempotent no-op kept for API parity with pools whose dispatcher is
    /// not started at construction time; this pool's dispatcher is already
    /// running once `new` returns.
    pub fn start(&self) {}

    /// Enqueues `task` onto the backlog. Never blocks — the backlog has no
    /// bound — and always succeeds, even after [`Self::stop`] has been
    /// called (the task is accepted and silently dropped at
    /// [`Self::terminate`] without running, matching the queued variant's
    /// documented shutdown behavior).
    pub fn execute(&self, task: BoxedTask) {
        let mut guard = self.queue.lock().expect("queue monitor is never locked reentrantly");
        guard.backlog.push_back(task);
        guard.notify_all();
    }

    /// Number of tasks currently waiting in the backlog (not yet handed to
    /// a worker slot).
    #[must_use]
    pub fn queue_length(&self) -> usize {
        let guard = self.queue.lock().expect("queue monitor is never locked reentrantly");
        guard.backlog.len()
    }

    /// `true` if the backlog is empty and every worker slot is idle.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue_length() == 0 && self.inner.is_idle()
    }

    /// `true` if the backlog is non-empty or every worker slot is busy.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.queue_length() > 0 || self.inner.is_busy()
    }

    /// Stops the dispatcher from handing out any more backlog entries and
    /// wakes it so it can observe the request promptly. `execute` still
    /// accepts tasks afterward; they simply never run (see
    /// [`Self::terminate`]).
    pub fn stop(&self) {
        let mut guard = self.queue.lock().expect("queue monitor is never locked reentrantly");
        guard.stopping = true;
        guard.notify_all();
    }

    /// Stops the dispatcher and every worker thread, then joins them all.
    /// Any tasks still sitting in the backlog at this point are dropped
    /// without running. Consumes the pool.
    pub fn terminate(mut self) {
        self.stop();
        if let Some(handle) = self.dispatcher.take() {
            let _ = handle.join();
        }
        let remaining = self.queue_length();
        if remaining > 0 {
            debug!(remaining, "dropping tasks still in backlog at termination");
        }
        match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner.terminate(),
            Err(_) => unreachable!("dispatcher thread already joined, no other Arc clone remains"),
        }
    }
}

fn spawn_dispatcher(pool: Arc<DirectPool>, queue: Arc<Monitor<QueueState>>) -> Result<JoinHandle<()>, PoolError> {
    thread::Builder::new()
        .name("queued-pool-dispatcher".to_string())
        .spawn(move || run_dispatcher(&pool, &queue))
        .map_err(PoolError::ThreadStart)
}

fn run_dispatcher(pool: &DirectPool, queue: &Monitor<QueueState>) {
    let mut rng = rand::rng();
    loop {
        let task = {
            let mut guard = queue.lock().expect("queue monitor is never locked reentrantly");
            while guard.backlog.is_empty() && !guard.stopping {
                guard.wait();
            }
            if guard.stopping {
                return;
            }
            guard.backlog.pop_front()
        };

        let Some(task) = task else { continue };

        // pop_front/push_front stands in for the original algorithm's
        // non-removing peek: BoxedTask isn't Clone, so a failed dispatch
        // attempt puts the task back at the front instead.
        if let Err(task) = pool.try_dispatch(task) {
            {
                let mut guard = queue.lock().expect("queue monitor is never locked reentrantly");
                guard.backlog.push_front(task);
            }
            let backoff = rng.random_range(0..=DISPATCH_BACKOFF_MAX_MS);
            thread::sleep(Duration::from_millis(backoff));
        }
    }
}
