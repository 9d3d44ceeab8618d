//! `DirectPool` — a fixed roster of worker threads with bounded, blocking
//! submission directly into a free slot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::PoolError;
use crate::monitor::Monitor;
use crate::task::BoxedTask;
use crate::task_slot::{IdleSink, TaskSlot};

struct PoolIdleSink {
    monitor: Arc<Monitor<()>>,
}

impl IdleSink for PoolIdleSink {
    fn notify_idle(&self) {
        let guard = self.monitor.lock().expect("pool monitor is never locked reentrantly");
        guard.notify_all();
    }
}

/// Fans a single idle notification out to the pool's own monitor plus one
/// extra sink. Lets `QueuedPool` observe slot idleness without `DirectPool`
/// knowing anything about dispatcher queues (composition, not inheritance).
struct CompositeIdleSink {
    primary: Arc<dyn IdleSink>,
    extra: Arc<dyn IdleSink>,
}

impl IdleSink for CompositeIdleSink {
    fn notify_idle(&self) {
        self.primary.notify_idle();
        self.extra.notify_idle();
    }
}

/// A pool of `size` dedicated worker threads. `execute` blocks the caller
/// until some slot accepts the task; it never queues work beyond what the
/// slots themselves hold.
pub struct DirectPool {
    slots: Vec<TaskSlot>,
    monitor: Arc<Monitor<()>>,
    rotor: AtomicUsize,
    stack_size: usize,
}

impl DirectPool {
    /// Spawns `size` worker threads, each with `stack_size` bytes of stack.
    /// `size == 0` is accepted: the pool then never completes any task
    /// submitted to it, which is the documented behavior for a
    /// zero-capacity pool rather than a construction error.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ThreadStart`] if any worker thread fails to
    /// spawn. Threads already started for this pool are stopped and joined
    /// before the error is returned, so no orphaned threads survive a
    /// failed construction.
    pub fn new(size: usize, stack_size: usize) -> Result<Self, PoolError> {
        Self::with_extra_sink(size, stack_size, None)
    }

    /// As [`Self::new`], but every slot's idle notification is also fanned
    /// out to `extra_sink` when present. This is how `QueuedPool` learns a
    /// slot went idle without `DirectPool` knowing dispatcher queues exist.
    pub(crate) fn with_extra_sink(
        size: usize,
        stack_size: usize,
        extra_sink: Option<Arc<dyn IdleSink>>,
    ) -> Result<Self, PoolError> {
        let monitor = Arc::new(Monitor::new(()));
        let primary: Arc<dyn IdleSink> = Arc::new(PoolIdleSink { monitor: Arc::clone(&monitor) });
        let sink: Arc<dyn IdleSink> = match extra_sink {
            Some(extra) => Arc::new(CompositeIdleSink { primary, extra }),
            None => primary,
        };

        let mut slots = Vec::with_capacity(size);
        for index in 0..size {
            match TaskSlot::spawn(format!("direct-pool-worker-{index}"), stack_size, Arc::clone(&sink)) {
                Ok(slot) => slots.push(slot),
                Err(err) => {
                    for slot in slots {
                        slot.stop_and_join();
                    }
                    return Err(err);
                }
            }
        }

        info!(workers = size, stack_size, "direct pool started");
        Ok(Self { slots, monitor, rotor: AtomicUsize::new(0), stack_size })
    }

    /// Number of worker threads in this pool.
    #[must_use]
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Stack size, in bytes, each worker thread was spawned with.
    #[must_use]
    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    /// `true` if every slot is currently idle.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.slots.iter().all(TaskSlot::is_idle)
    }

    /// `true` if every slot currently holds a task.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        !self.slots.is_empty() && self.slots.iter().all(|slot| !slot.is_idle())
    }

    /// Attempts to hand `task` to some idle slot without blocking. Slots
    /// are tried starting from a rotating offset so load spreads evenly
    /// rather than always favoring slot 0.
    ///
    /// # Errors
    ///
    /// Returns the task back to the caller if every slot was busy (or
    /// momentarily contended) at the time of the attempt.
    pub fn try_dispatch(&self, task: BoxedTask) -> Result<(), BoxedTask> {
        if self.slots.is_empty() {
            return Err(task);
        }
        let start = self.rotor.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        let mut task = task;
        for offset in 0..self.slots.len() {
            let idx = (start + offset) % self.slots.len();
            match self.slots[idx].try_assign(task) {
                Ok(()) => return Ok(()),
                Err(returned) => task = returned,
            }
        }
        Err(task)
    }

    /// Submits `task`, blocking the caller until some slot accepts it.
    ///
    /// With zero worker threads this blocks forever — there is no slot
    /// that will ever accept the task, which matches the documented
    /// behavior of a zero-capacity pool rather than being treated as an
    /// error.
    pub fn execute(&self, task: BoxedTask) {
        let mut pending = task;
        loop {
            // The pool monitor is held across the dispatch attempt and the
            // subsequent wait, not just the wait: a slot going idle between
            // an unlocked scan and a separately-acquired wait() would have
            // its notification dropped on the floor (PoolIdleSink::notify_idle
            // needs this same lock to signal, so it can't land in that gap).
            let mut guard = self.monitor.lock().expect("pool monitor is never locked reentrantly");
            match self.try_dispatch(pending) {
                Ok(()) => return,
                Err(returned) => pending = returned,
            }
            debug!("all slots busy, waiting for an idle notification");
            guard.wait();
        }
    }

    /// Signals every worker thread to stop after finishing its current
    /// task (if any) and joins them all. Consumes the pool.
    pub fn terminate(self) {
        info!(workers = self.slots.len(), "direct pool terminating");
        for slot in self.slots {
            slot.stop_and_join();
        }
    }
}
