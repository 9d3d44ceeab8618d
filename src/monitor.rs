//! The `Monitor` synchronization primitive.
//!
//! A `Monitor<T>` couples a [`parking_lot::Mutex`] guarding a payload `T`
//! with a [`parking_lot::Condvar`], an owning-thread tag, and a
//! level-triggered signal flag. It is the sole locking/signalling primitive
//! used throughout this crate — every other component (`TaskSlot`,
//! `DirectPool`, `QueuedPool`) is built on top of it rather than reaching
//! for a bare `Mutex` or channel.
//!
//! Unlike a recursive mutex, a `Monitor` is **non-reentrant by contract**: a
//! second `lock()` from the thread that already holds it returns
//! [`MonitorError::AlreadyOwned`] instead of deadlocking or silently
//! succeeding. Recursive locking is a frequent source of latent bugs in
//! pool/dispatcher code, so this is treated as a usage error to surface, not
//! a convenience to support.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use thiserror::Error;

const SPIN_INTERVAL: Duration = Duration::from_millis(10);
const TEARDOWN_GRACE: Duration = Duration::from_millis(10);

static NEXT_THREAD_TAG: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TAG: u64 = NEXT_THREAD_TAG.fetch_add(1, Ordering::Relaxed);
}

fn current_thread_tag() -> u64 {
    THREAD_TAG.with(|tag| *tag)
}

/// Usage errors reported by [`Monitor`] operations.
///
/// These are never retried or silently converted into reentrant locking;
/// they are reported back to the caller as ordinary `Result` values.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MonitorError {
    /// `lock()` was called by a thread that already owns this monitor.
    #[error("monitor already locked by the current thread")]
    AlreadyOwned,
    /// `unlock()` (or an operation requiring ownership) was called by a
    /// thread that does not currently hold the monitor.
    #[error("current thread does not own this monitor")]
    NotOwner,
}

/// Returned by [`Monitor::try_lock_for`] and [`MonitorGuard::wait_for`] when
/// the deadline elapses before the lock/signal could be obtained.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("timed out waiting on monitor")]
pub struct Timeout;

/// Outcome of a non-blocking [`Monitor::try_lock`] attempt.
pub enum TryLockOutcome<'a, T> {
    /// The calling thread already owns this monitor (observed, not newly
    /// acquired — no guard is produced since the caller's existing guard
    /// remains the sole owner of the critical section).
    Owned,
    /// The monitor was free and is now held by the caller.
    Locked(MonitorGuard<'a, T>),
    /// The monitor is held by another thread.
    Busy,
}

/// A mutex + condvar + ownership tag, guarding a payload `T`.
pub struct Monitor<T> {
    mutex: Mutex<T>,
    condvar: Condvar,
    owner: AtomicU64,
    signaled: AtomicBool,
}

impl<T> Monitor<T> {
    /// Creates a new, unlocked monitor guarding `value`.
    pub fn new(value: T) -> Self {
        Self {
            mutex: Mutex::new(value),
            condvar: Condvar::new(),
            owner: AtomicU64::new(0),
            signaled: AtomicBool::new(false),
        }
    }

    /// Returns `true` if the calling thread currently owns this monitor.
    #[must_use]
    pub fn is_locked_by_current_thread(&self) -> bool {
        self.owner.load(Ordering::Acquire) == current_thread_tag()
    }

    /// Acquires the monitor, blocking until it is free.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::AlreadyOwned`] if the calling thread already
    /// holds this monitor. This is a usage error, not contention — callers
    /// must not call `lock` reentrantly.
    pub fn lock(&self) -> Result<MonitorGuard<'_, T>, MonitorError> {
        if self.is_locked_by_current_thread() {
            return Err(MonitorError::AlreadyOwned);
        }
        let raw = self.mutex.lock();
        self.owner.store(current_thread_tag(), Ordering::Release);
        Ok(MonitorGuard { monitor: self, raw: Some(raw) })
    }

    /// Attempts to acquire the monitor, spinning with 10ms sleeps until
    /// either it is acquired or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`Timeout`] if `timeout` elapses before the monitor could be
    /// acquired.
    pub fn try_lock_for(&self, timeout: Duration) -> Result<MonitorGuard<'_, T>, Timeout> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(raw) = self.mutex.try_lock() {
                self.owner.store(current_thread_tag(), Ordering::Release);
                return Ok(MonitorGuard { monitor: self, raw: Some(raw) });
            }
            if Instant::now() >= deadline {
                return Err(Timeout);
            }
            thread::sleep(SPIN_INTERVAL);
        }
    }

    /// Non-blocking lock attempt distinguishing three outcomes: already
    /// owned by the caller, newly acquired, or busy with another thread.
    pub fn try_lock(&self) -> TryLockOutcome<'_, T> {
        if self.is_locked_by_current_thread() {
            return TryLockOutcome::Owned;
        }
        match self.mutex.try_lock() {
            Some(raw) => {
                self.owner.store(current_thread_tag(), Ordering::Release);
                TryLockOutcome::Locked(MonitorGuard { monitor: self, raw: Some(raw) })
            }
            None => TryLockOutcome::Busy,
        }
    }
}

impl<T> Drop for Monitor<T> {
    /// Notifies all waiters and gives them a brief window to return from
    /// `wait` before the mutex/condvar are actually torn down. Unconditional
    /// because, unlike the lock itself, a `Monitor` cannot tell from the
    /// destructor whether anyone is currently parked on it.
    fn drop(&mut self) {
        self.signaled.store(true, Ordering::Release);
        self.condvar.notify_all();
        thread::sleep(TEARDOWN_GRACE);
    }
}

/// A scoped acquisition of a [`Monitor`]. Dropping it releases the lock.
///
/// `wait` / `wait_for` / `notify_one` / `notify_all` all forward to the
/// owning monitor, matching the "scoped-acquisition helper" described in the
/// component design.
pub struct MonitorGuard<'a, T> {
    monitor: &'a Monitor<T>,
    raw: Option<MutexGuard<'a, T>>,
}

impl<'a, T> MonitorGuard<'a, T> {
    /// Releases the monitor early, reporting [`MonitorError::NotOwner`] if
    /// the guard had already been released (which cannot happen through
    /// the safe API, but keeps the operation fallible per the component
    /// contract table).
    pub fn unlock(mut self) -> Result<(), MonitorError> {
        if self.raw.take().is_some() {
            self.monitor.owner.store(0, Ordering::Release);
            Ok(())
        } else {
            Err(MonitorError::NotOwner)
        }
    }

    /// Atomically releases the monitor, blocks until signalled, then
    /// reacquires it. Clears the signal flag on entry and loops until it is
    /// observed `true` again, so spurious or stale notifications do not
    /// wake the caller early.
    pub fn wait(&mut self) {
        self.monitor.signaled.store(false, Ordering::Release);
        self.monitor.owner.store(0, Ordering::Release);
        loop {
            self.monitor.condvar.wait(self.raw.as_mut().expect("guard holds lock while waiting"));
            self.monitor.owner.store(current_thread_tag(), Ordering::Release);
            if self.monitor.signaled.load(Ordering::Acquire) {
                break;
            }
            self.monitor.owner.store(0, Ordering::Release);
        }
    }

    /// As [`Self::wait`], but gives up once `timeout` has elapsed. The
    /// monitor is reacquired and owned by the caller on return either way.
    ///
    /// # Errors
    ///
    /// Returns [`Timeout`] if the deadline passes before a signal is
    /// observed.
    pub fn wait_for(&mut self, timeout: Duration) -> Result<(), Timeout> {
        self.monitor.signaled.store(false, Ordering::Release);
        self.monitor.owner.store(0, Ordering::Release);
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let timed_out = self
                .monitor
                .condvar
                .wait_for(self.raw.as_mut().expect("guard holds lock while waiting"), remaining)
                .timed_out();
            self.monitor.owner.store(current_thread_tag(), Ordering::Release);
            if self.monitor.signaled.load(Ordering::Acquire) {
                return Ok(());
            }
            if timed_out || Instant::now() >= deadline {
                return Err(Timeout);
            }
            self.monitor.owner.store(0, Ordering::Release);
        }
    }

    /// Sets the signal flag and wakes one waiter.
    pub fn notify_one(&self) {
        self.monitor.signaled.store(true, Ordering::Release);
        self.monitor.condvar.notify_one();
    }

    /// Sets the signal flag and wakes all waiters.
    pub fn notify_all(&self) {
        self.monitor.signaled.store(true, Ordering::Release);
        self.monitor.condvar.notify_all();
    }
}

impl<T> Deref for MonitorGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.raw.as_ref().expect("guard holds lock")
    }
}

impl<T> DerefMut for MonitorGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.raw.as_mut().expect("guard holds lock")
    }
}

impl<T> Drop for MonitorGuard<'_, T> {
    fn drop(&mut self) {
        if self.raw.is_some() {
            self.monitor.owner.store(0, Ordering::Release);
        }
    }
}

/// Deadlock-avoiding acquisition of several monitors at once.
///
/// Repeatedly attempts to `try_lock` every monitor in order; on the first
/// `Busy` outcome it releases everything it has acquired so far and retries
/// from the top. Because a thread never blocks while holding a partial set,
/// two threads locking the same monitors in opposite orders cannot
/// deadlock each other — the equivalent of `boost::lock(m1, m2, ...)` for
/// `Monitor`.
pub fn lock_all<'a, T>(monitors: &[&'a Monitor<T>]) -> Vec<MonitorGuard<'a, T>> {
    loop {
        let mut guards = Vec::with_capacity(monitors.len());
        let mut busy = false;
        for monitor in monitors {
            match monitor.try_lock() {
                TryLockOutcome::Locked(guard) => guards.push(guard),
                TryLockOutcome::Owned | TryLockOutcome::Busy => {
                    busy = true;
                    break;
                }
            }
        }
        if busy {
            drop(guards);
            thread::yield_now();
            continue;
        }
        return guards;
    }
}
