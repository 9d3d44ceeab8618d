//! Integration tests for `QueuedPool`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use threadpool_core::queued_pool::QueuedPool;

fn wait_until(mut predicate: impl FnMut() -> bool, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    predicate()
}

#[test]
fn queued_pool_fifo_dispatch_order() {
    let pool = QueuedPool::new(1, 256 * 1024).unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..20 {
        let order = Arc::clone(&order);
        pool.execute(Box::new(move || {
            order.lock().unwrap().push(i);
        }));
    }

    assert!(wait_until(|| order.lock().unwrap().len() == 20, Duration::from_secs(5)));
    assert_eq!(*order.lock().unwrap(), (0..20).collect::<Vec<_>>());
    pool.terminate();
}

#[test]
fn queued_pool_zero_workers_stays_queued() {
    let pool = QueuedPool::new(0, 256 * 1024).unwrap();
    let ran = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let ran = Arc::clone(&ran);
        pool.execute(Box::new(move || {
            ran.fetch_add(1, Ordering::SeqCst);
        }));
    }

    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(pool.queue_length(), 3);
    assert!(pool.is_busy());
    assert!(!pool.is_idle());
    pool.terminate();
}

#[test]
fn queued_pool_execute_never_blocks_caller() {
    let pool = QueuedPool::new(1, 256 * 1024).unwrap();
    pool.execute(Box::new(|| std::thread::sleep(Duration::from_millis(200))));

    let started = std::time::Instant::now();
    for _ in 0..50 {
        pool.execute(Box::new(|| {}));
    }
    // Submitting 50 more tasks while the single worker is still busy with
    // the first must not block: they all land in the backlog.
    assert!(started.elapsed() < Duration::from_millis(100));

    pool.terminate();
}

#[test]
fn queued_pool_drains_backlog_with_multiple_workers() {
    let pool = QueuedPool::new(4, 256 * 1024).unwrap();
    let completed = Arc::new(AtomicUsize::new(0));

    for _ in 0..40 {
        let completed = Arc::clone(&completed);
        pool.execute(Box::new(move || {
            completed.fetch_add(1, Ordering::SeqCst);
        }));
    }

    assert!(wait_until(|| completed.load(Ordering::SeqCst) == 40, Duration::from_secs(5)));
    assert!(wait_until(|| pool.is_idle(), Duration::from_secs(2)));
    pool.terminate();
}
