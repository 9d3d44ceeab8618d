//! # threadpool_core
//!
//! A worker-pool execution core built on a single synchronization
//! primitive, [`Monitor`](monitor::Monitor): a mutex, a condition variable,
//! an owning-thread tag, and a level-triggered signal flag, composed
//! together instead of used as three separate tools.
//!
//! Two pool variants are built on top of it:
//!
//! - [`DirectPool`](direct_pool::DirectPool) — a fixed roster of worker
//!   threads. `execute` blocks the caller until some slot accepts the
//!   task; there is no backlog beyond the slots themselves.
//! - [`QueuedPool`](queued_pool::QueuedPool) — a `DirectPool` plus an
//!   unbounded FIFO backlog fed by a dedicated dispatcher thread.
//!   `execute` never blocks.
//!
//! ```rust,no_run
//! use threadpool_core::direct_pool::DirectPool;
//!
//! let pool = DirectPool::new(4, threadpool_core::config::DEFAULT_STACK_SIZE)?;
//! pool.execute(Box::new(|| println!("hello from a worker")));
//! pool.terminate();
//! # Ok::<(), threadpool_core::error::PoolError>(())
//! ```
//!
//! For complete examples, see `tests/direct_pool_test.rs` and
//! `tests/queued_pool_test.rs`.

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Pool configuration: worker counts, stack size, dispatcher backoff bounds.
pub mod config;
/// `DirectPool` — fixed worker roster, blocking submission.
pub mod direct_pool;
/// Error types shared across the pool variants.
pub mod error;
/// The `Monitor` synchronization primitive.
pub mod monitor;
/// `QueuedPool` — `DirectPool` plus an unbounded FIFO backlog.
pub mod queued_pool;
/// The unit of work dispatched across worker threads.
pub mod task;
/// `TaskSlot` — a single-slot mailbox backed by one worker thread.
pub mod task_slot;
/// Shared utilities (structured logging).
pub mod util;

pub use direct_pool::DirectPool;
pub use error::{MonitorError, PoolError};
pub use monitor::{Monitor, MonitorGuard};
pub use queued_pool::QueuedPool;
pub use task::{BoxedTask, Task};
