//! `TaskSlot` — a single-slot mailbox backed by one dedicated worker thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, trace};

use crate::error::PoolError;
use crate::monitor::Monitor;
use crate::task::BoxedTask;

/// Capability a `TaskSlot` uses to tell its owner it has gone idle, without
/// holding a reference back to the pool object itself (see the "Slot → Pool
/// back-reference" design note).
pub trait IdleSink: Send + Sync {
    /// Called once a slot has finished running a task and is ready to
    /// accept another, after the slot's own monitor has already been
    /// released (release-before-notify: notifying while still holding the
    /// slot monitor risks a lock-order inversion against a pool that locks
    /// itself before inspecting slots).
    fn notify_idle(&self);
}

struct SlotState {
    task: Option<BoxedTask>,
    stopping: bool,
}

/// A worker thread paired with a one-task mailbox.
pub struct TaskSlot {
    monitor: Arc<Monitor<SlotState>>,
    worker: Option<JoinHandle<()>>,
}

impl TaskSlot {
    /// Spawns the backing worker thread, named `name` with the given
    /// `stack_size`. The thread immediately begins waiting for its first
    /// task.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ThreadStart`] if the OS refuses to spawn the
    /// thread; no partial state is left behind.
    pub fn spawn(
        name: String,
        stack_size: usize,
        idle_sink: Arc<dyn IdleSink>,
    ) -> Result<Self, PoolError> {
        let monitor = Arc::new(Monitor::new(SlotState { task: None, stopping: false }));
        let worker_monitor = Arc::clone(&monitor);
        let worker_name = name.clone();

        let worker = thread::Builder::new()
            .name(name)
            .stack_size(stack_size)
            .spawn(move || run_worker(&worker_name, &worker_monitor, idle_sink.as_ref()))
            .map_err(PoolError::ThreadStart)?;

        Ok(Self { monitor, worker: Some(worker) })
    }

    /// Attempts to hand `task` to this slot without blocking. Returns the
    /// task back to the caller if the slot is already occupied or its
    /// monitor is contended.
    pub fn try_assign(&self, task: BoxedTask) -> Result<(), BoxedTask> {
        use crate::monitor::TryLockOutcome;
        match self.monitor.try_lock() {
            TryLockOutcome::Locked(mut guard) => {
                if guard.task.is_some() {
                    return Err(task);
                }
                guard.task = Some(task);
                guard.notify_one();
                Ok(())
            }
            TryLockOutcome::Owned | TryLockOutcome::Busy => Err(task),
        }
    }

    /// Hands `task` to this slot, blocking until the slot is free.
    pub fn assign(&self, task: BoxedTask) {
        let mut guard = self.monitor.lock().expect("slot monitor is never locked reentrantly");
        while guard.task.is_some() {
            guard.wait();
        }
        guard.task = Some(task);
        guard.notify_one();
    }

    /// Returns `true` if this slot currently holds no task. Uses a
    /// non-blocking lock attempt: a slot that is momentarily contended
    /// (another thread assigning or the worker picking up its task) is
    /// conservatively reported busy.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        use crate::monitor::TryLockOutcome;
        matches!(self.monitor.try_lock(), TryLockOutcome::Locked(guard) if guard.task.is_none())
    }

    /// Signals the worker thread to exit once its current task (if any)
    /// completes, and waits for it to do so.
    pub fn stop_and_join(mut self) {
        {
            let mut guard = self.monitor.lock().expect("slot monitor is never locked reentrantly");
            guard.stopping = true;
            guard.notify_all();
        }
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

fn run_worker(name: &str, monitor: &Monitor<SlotState>, idle_sink: &dyn IdleSink) {
    loop {
        let task = {
            let mut guard = monitor.lock().expect("slot monitor is never locked reentrantly");
            while guard.task.is_none() && !guard.stopping {
                guard.wait();
            }
            if guard.task.is_none() {
                debug!(worker = name, "slot stopping, no task pending");
                return;
            }
            guard.task.take()
        };

        if let Some(task) = task {
            trace!(worker = name, "running task");
            task.run();
            trace!(worker = name, "task complete");
        }

        // Release-before-notify: the slot monitor above was already
        // dropped before we reach here, so the idle notification never
        // races a pool that locks itself before inspecting its slots.
        idle_sink.notify_idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingSink(Arc<AtomicUsize>);
    impl IdleSink for CountingSink {
        fn notify_idle(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn runs_assigned_task_and_goes_idle_again() {
        let idle_count = Arc::new(AtomicUsize::new(0));
        let slot = TaskSlot::spawn(
            "test-slot".into(),
            256 * 1024,
            Arc::new(CountingSink(Arc::clone(&idle_count))),
        )
        .unwrap();

        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = Arc::clone(&ran);
        slot.assign(Box::new(move || {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        }));

        for _ in 0..200 {
            if idle_count.load(Ordering::SeqCst) >= 1 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert!(idle_count.load(Ordering::SeqCst) >= 1);
        slot.stop_and_join();
    }

    #[test]
    fn try_assign_rejects_when_occupied() {
        let idle_count = Arc::new(AtomicUsize::new(0));
        let slot = TaskSlot::spawn(
            "test-slot-busy".into(),
            256 * 1024,
            Arc::new(CountingSink(idle_count)),
        )
        .unwrap();

        slot.assign(Box::new(|| {
            thread::sleep(Duration::from_millis(100));
        }));
        thread::sleep(Duration::from_millis(10));

        let rejected = slot.try_assign(Box::new(|| {}));
        assert!(rejected.is_err());
        slot.stop_and_join();
    }
}
