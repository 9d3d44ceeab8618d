//! The unit of work dispatched across worker threads.

/// An opaque callable a pool can run exactly once.
///
/// Submitting a closure directly works via the blanket impl below; the
/// trait exists so `TaskSlot` and the dispatcher queue can hold
/// `Box<dyn Task>` without being generic over every caller's closure type.
pub trait Task: Send + 'static {
    /// Consumes and runs the task. Panicking here unwinds the worker
    /// thread it runs on — task panics are never caught.
    fn run(self: Box<Self>);
}

impl<F> Task for F
where
    F: FnOnce() + Send + 'static,
{
    fn run(self: Box<Self>) {
        (*self)();
    }
}

/// The unit of ownership transfer between a caller and a worker slot.
pub type BoxedTask = Box<dyn Task>;
