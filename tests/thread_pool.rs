use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use workpool::{PoolError, TaskError, ThreadPool, ThreadPoolBuilder};

#[test]
fn test_every_task_runs_exactly_once() {
    let thread_pool = ThreadPool::new(3).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    for i in 0..200 {
        let seen = seen.clone();
        thread_pool
            .execute(move || seen.lock().unwrap().push(i))
            .unwrap();
    }
    thread_pool.join().unwrap();

    let mut seen = seen.lock().unwrap().clone();
    seen.sort_unstable();
    assert_eq!((0..200).collect::<Vec<_>>(), seen);
}

#[test]
fn test_squares_are_value_correct() {
    let thread_pool = ThreadPool::new(4).unwrap();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            thread_pool
                .submit(move || {
                    thread::sleep(Duration::from_millis(20));
                    i * i
                })
                .unwrap()
        })
        .collect();

    let ids: Vec<usize> = handles.iter().map(|h| h.id()).collect();
    assert_eq!((0..8).collect::<Vec<_>>(), ids);

    let results: HashSet<i32> = handles.into_iter().map(|h| h.get().unwrap()).collect();
    assert_eq!(HashSet::from([0, 1, 4, 9, 16, 25, 36, 49]), results);
}

#[test]
fn test_submit_after_shutdown_fails() {
    let thread_pool = ThreadPool::new(2).unwrap();
    for i in 0..10 {
        assert!(thread_pool.submit(move || i).is_ok());
    }
    assert!(!thread_pool.is_shutdown());

    thread_pool.shutdown();
    thread_pool.shutdown();
    assert!(thread_pool.is_shutdown());
    assert!(matches!(thread_pool.submit(|| 1), Err(PoolError::Stopped)));
    assert!(matches!(thread_pool.execute(|| ()), Err(PoolError::Stopped)));
    assert_eq!("the thread pool is stopped", PoolError::Stopped.to_string());
}

#[test]
fn test_drop_drains_the_queue() {
    let markers = Arc::new(Mutex::new(Vec::new()));
    let thread_pool = ThreadPool::new(1).unwrap();
    for i in 0..5 {
        let markers = markers.clone();
        thread_pool
            .execute(move || {
                thread::sleep(Duration::from_millis(10));
                markers.lock().unwrap().push(i);
            })
            .unwrap();
    }
    drop(thread_pool);

    // One worker runs the queue in FIFO order.
    assert_eq!(vec![0, 1, 2, 3, 4], *markers.lock().unwrap());
}

#[test]
fn test_queued_tasks_survive_shutdown() {
    let thread_pool = ThreadPool::new(2).unwrap();
    let handles: Vec<_> = (0..20)
        .map(|i| {
            thread_pool
                .submit(move || {
                    thread::sleep(Duration::from_millis(1));
                    i
                })
                .unwrap()
        })
        .collect();
    thread_pool.shutdown();

    let sum: i32 = handles.into_iter().map(|h| h.get().unwrap()).sum();
    assert_eq!((0..20).sum::<i32>(), sum);
    thread_pool.join().unwrap();
}

#[test]
fn test_many_producers() {
    const PRODUCERS: usize = 8;
    const TASKS: usize = 250;

    let thread_pool = Arc::new(ThreadPool::new(4).unwrap());
    let completions = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(HashSet::new()));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let thread_pool = thread_pool.clone();
            let completions = completions.clone();
            let seen = seen.clone();
            thread::spawn(move || {
                for task in 0..TASKS {
                    let completions = completions.clone();
                    let seen = seen.clone();
                    thread_pool
                        .execute(move || {
                            completions.fetch_add(1, Ordering::SeqCst);
                            assert!(seen.lock().unwrap().insert((producer, task)));
                        })
                        .unwrap();
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    thread_pool.join().unwrap();

    assert_eq!(PRODUCERS * TASKS, completions.load(Ordering::SeqCst));
    assert_eq!(PRODUCERS * TASKS, seen.lock().unwrap().len());
}

#[test]
fn test_panic_is_surfaced_to_its_handle_only() {
    let thread_pool = ThreadPool::new(2).unwrap();
    let before = thread_pool.submit(|| 1).unwrap();
    let failing = thread_pool
        .submit(|| -> i32 { panic!("bad item {}", 7) })
        .unwrap();
    let after = thread_pool.submit(|| 3).unwrap();

    let err = failing.get().unwrap_err();
    match &err {
        TaskError::Panicked { id, message, .. } => {
            assert_eq!(1, *id);
            assert_eq!("bad item 7", message);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!("task 1 panicked: bad item 7", err.to_string());

    assert_eq!(1, before.get().unwrap());
    assert_eq!(3, after.get().unwrap());

    // The worker that ran the failing task is still alive.
    assert_eq!(2, thread_pool.active_count());
    thread_pool.join().unwrap();
}

#[test]
fn test_join_resumes_panic_in_waiter() {
    let thread_pool = ThreadPool::new(1).unwrap();
    let handle = thread_pool
        .submit(|| -> u8 { panic!("propagated") })
        .unwrap();

    let waiter = thread::spawn(move || handle.join());
    let payload = waiter.join().unwrap_err();
    assert_eq!(Some(&"propagated"), payload.downcast_ref::<&str>());
}

#[test]
fn test_concurrent_waiters() {
    let thread_pool = ThreadPool::new(4).unwrap();
    let waiters: Vec<_> = (0..16_u64)
        .map(|i| {
            let handle = thread_pool
                .submit(move || {
                    thread::sleep(Duration::from_millis(16 - i));
                    i * 10
                })
                .unwrap();
            thread::spawn(move || {
                assert!(handle.wait_timeout(Duration::from_secs(10)));
                assert!(handle.is_finished());
                handle.get().unwrap()
            })
        })
        .collect();

    for (i, waiter) in waiters.into_iter().enumerate() {
        assert_eq!(i as u64 * 10, waiter.join().unwrap());
    }
}

#[test]
fn test_dead_workers_abandon_queued_tasks() {
    let thread_pool = ThreadPoolBuilder::new()
        .pool_size(1)
        .listener_before_execute(|id| {
            if id == 0 {
                panic!("listener failed");
            }
        })
        .build()
        .unwrap();

    let first = thread_pool.submit(|| 0).unwrap();
    assert!(matches!(first.get(), Err(TaskError::Abandoned { id: 0 })));

    // Nothing is left to run these, dropping the pool releases them.
    let stranded: Vec<_> = (1..4).map(|i| thread_pool.submit(move || i).unwrap()).collect();
    assert_eq!(3, thread_pool.queued_count());
    drop(thread_pool);

    for handle in stranded {
        let err = handle.get().unwrap_err();
        assert!(!err.is_panic());
        assert!(err.task_id() >= 1);
    }
}

#[test]
fn test_pools_are_independent() {
    let first = ThreadPool::new(1).unwrap();
    let second = ThreadPool::new(1).unwrap();

    first.shutdown();
    assert!(first.submit(|| ()).is_err());
    assert_eq!(0, second.submit(|| 0).unwrap().get().unwrap());
    assert_eq!(1, second.pool_size());
}

#[test]
fn test_chunked_maximum() {
    let nums: Arc<Vec<u32>> = Arc::new(
        (0..100_000_u32)
            .map(|i| i.wrapping_mul(2_654_435_761) % 1_000_003)
            .collect(),
    );
    let expected = nums.iter().copied().max().unwrap();

    let thread_pool = ThreadPool::new(4).unwrap();
    let chunk = nums.len() / 8;
    let handles: Vec<_> = (0..8)
        .map(|part| {
            let nums = nums.clone();
            let start = part * chunk;
            let end = if part == 7 { nums.len() } else { start + chunk };
            thread_pool
                .submit(move || nums[start..end].iter().copied().max().unwrap_or(0))
                .unwrap()
        })
        .collect();

    let max = handles.into_iter().map(|h| h.get().unwrap()).max().unwrap();
    assert_eq!(expected, max);
}
