use crate::{
    error::panic_message,
    handle::{self, TaskHandle},
    task::{Task, TaskFn, TaskListeners},
    worker::Worker,
    PoolError, TaskError, ThreadPoolBuilder,
};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, trace, warn};

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread::{self, ThreadId},
};

/// A `ThreadPool` consists of a fixed set of worker threads and an
/// unbounded FIFO channel that is used to transfer and hold submitted
/// tasks.
///
/// # Channel(Queue)
///
/// Submitted tasks are sent into the channel in submission order and
/// each one is received by exactly one idle worker. The sending side
/// lives behind a lock; shutting the pool down takes it out, which
/// closes the channel. Workers keep receiving until the channel is
/// closed *and* empty, so tasks queued before shutdown still run.
///
/// # Worker Thread
///
/// Every worker runs the same loop: block on the channel, run the
/// received task without holding any pool lock, repeat. Tasks running
/// on different workers are not synchronized with each other.
///
/// # Task Results
///
/// [`ThreadPool::submit`] returns a [`TaskHandle`] that yields the
/// task's output, or the panic it raised. A panic inside a task never
/// takes down the worker that ran it.
///
/// # Shutdown
///
/// Dropping the pool shuts it down and blocks until every worker has
/// drained the queue and exited. A task that never returns blocks this
/// forever.
pub struct ThreadPool {
    pub(crate) sender: Mutex<Option<Sender<Task>>>,
    pub(crate) receiver: Receiver<Task>,
    pub(crate) workers: Mutex<Option<Vec<Worker>>>,
    pub(crate) worker_ids: Vec<ThreadId>,
    pub(crate) joined: Mutex<bool>,
    pub(crate) all_joined: Condvar,
    pub(crate) next_task_id: AtomicUsize,

    pub(crate) pool_size: usize,
    pub(crate) task_listeners: Arc<TaskListeners>,
}

impl ThreadPool {
    /// Creates a thread pool with `pool_size` worker threads and the
    /// default configuration otherwise.
    ///
    /// # Errors
    ///
    /// See [`ThreadPoolBuilder::build`].
    pub fn new(pool_size: usize) -> Result<Self, PoolError> {
        ThreadPoolBuilder::new().pool_size(pool_size).build()
    }

    /// Builds a thread pool from a configration(builder) and spawns
    /// its workers.
    ///
    /// This assumes arguments of the builder are valid.
    pub(crate) fn from_builder(builder: ThreadPoolBuilder) -> Result<Self, PoolError> {
        let (sender, receiver) = unbounded();
        let mut workers = Vec::with_capacity(builder.pool_size);
        for index in 0..builder.pool_size {
            match Worker::spawn(index, builder.thread_builder(index), receiver.clone()) {
                Ok(worker) => workers.push(worker),
                Err(err) => {
                    // Close the channel so the workers already started exit.
                    drop(sender);
                    for worker in workers {
                        let index = worker.index;
                        if worker.join().is_err() {
                            debug!(worker = index, "worker thread panicked");
                        }
                    }
                    return Err(PoolError::Spawn(err));
                }
            }
        }
        debug!(pool_size = builder.pool_size, "thread pool started");

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            receiver,
            worker_ids: workers.iter().map(|w| w.handle.thread().id()).collect(),
            workers: Mutex::new(Some(workers)),
            joined: Mutex::new(false),
            all_joined: Condvar::new(),
            next_task_id: AtomicUsize::new(0),
            pool_size: builder.pool_size,
            task_listeners: Arc::new(builder.task_listeners),
        })
    }

    /// Submits a task and returns a handle to its output.
    ///
    /// Arguments are bound by capturing them in the closure. The task
    /// is queued behind every task submitted before it and this call
    /// never waits for it to run.
    ///
    /// # Errors
    ///
    /// [`Stopped`]: The thread pool has been shut down. The task is
    /// dropped without running.
    ///
    /// [`Stopped`]: crate::PoolError::Stopped
    ///
    /// # Examples
    ///
    /// ```
    /// use workpool::ThreadPool;
    ///
    /// let thread_pool = ThreadPool::new(4).unwrap();
    /// let handles: Vec<_> = (0..8)
    ///     .map(|i| thread_pool.submit(move || i * i).unwrap())
    ///     .collect();
    ///
    /// let squares: Vec<i32> = handles.into_iter().map(|h| h.get().unwrap()).collect();
    /// assert_eq!(vec![0, 1, 4, 9, 16, 25, 36, 49], squares);
    /// ```
    pub fn submit<F, R>(&self, task_fn: F) -> Result<TaskHandle<R>, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let id = self.next_id();
        let (completer, handle) = handle::pair(id);
        self.send_task(Task::create(
            id,
            Box::new(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(task_fn))
                    .map_err(|payload| TaskError::panicked(id, payload));
                completer.complete(result);
            }),
            self.task_listeners.clone(),
        ))?;
        Ok(handle)
    }

    /// Executes the given task in the future without returning a
    /// handle. A panic in the task is caught and logged.
    ///
    /// # Errors
    ///
    /// [`Stopped`]: The thread pool has been shut down.
    ///
    /// [`Stopped`]: crate::PoolError::Stopped
    pub fn execute<F>(&self, task_fn: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.next_id();
        let task_fn: TaskFn = Box::new(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task_fn)) {
                warn!(
                    task = id,
                    panic = %panic_message(payload.as_ref()),
                    "task panicked"
                );
            }
        });
        self.send_task(Task::create(id, task_fn, self.task_listeners.clone()))
    }

    /// Closes the thread pool.
    ///
    /// A closed thread pool will not accept any tasks, but will still
    /// process tasks in the channel(queue). Calling this more than once
    /// has no further effect.
    ///
    /// # Examples
    ///
    /// ```
    /// use workpool::{PoolError, ThreadPool};
    ///
    /// let thread_pool = ThreadPool::new(2).unwrap();
    /// thread_pool.shutdown();
    ///
    /// assert!(matches!(thread_pool.submit(|| 1), Err(PoolError::Stopped)));
    /// ```
    pub fn shutdown(&self) {
        // Dropping the only sender wakes every blocked worker.
        if self.sender.lock().take().is_some() {
            debug!("thread pool shutdown requested");
        }
    }

    /// Returns `true` if the thread pool is closed.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Shuts the thread pool down and waits for all worker threads to
    /// finish, which happens once the queue is drained.
    ///
    /// If this is called in a worker thread, then that worker thread
    /// will not be joined. When several threads call this at once, one
    /// of them joins the workers and the others wait until it is done;
    /// only that one reports a worker panic. A call from a worker thread
    /// never waits on another caller.
    ///
    /// # Errors
    ///
    /// Returns the panic payload of the first worker thread that
    /// panicked. All workers are joined regardless.
    ///
    /// # Examples
    ///
    /// ```
    /// use workpool::ThreadPool;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let thread_pool = ThreadPool::new(4).unwrap();
    ///
    /// let sum = Arc::new(AtomicUsize::new(0));
    /// for _ in 0..10 {
    ///     let sum = sum.clone();
    ///     thread_pool.execute(move || {
    ///         sum.fetch_add(1, Ordering::SeqCst);
    ///     }).unwrap();
    /// }
    ///
    /// // Block current thread until all worker threads are finished.
    /// thread_pool.join().unwrap();
    /// assert_eq!(10, sum.load(Ordering::Relaxed));
    /// ```
    pub fn join(&self) -> thread::Result<()> {
        self.shutdown();
        let workers = self.workers.lock().take();
        let Some(workers) = workers else {
            if !self.worker_ids.contains(&thread::current().id()) {
                let mut joined = self.joined.lock();
                while !*joined {
                    self.all_joined.wait(&mut joined);
                }
            }
            return Ok(());
        };

        let mut result = Ok(());
        for worker in workers {
            let index = worker.index;
            if let Err(payload) = worker.join() {
                debug!(worker = index, "worker thread panicked");
                if result.is_ok() {
                    result = Err(payload);
                }
            }
        }
        debug!("all workers joined");
        *self.joined.lock() = true;
        self.all_joined.notify_all();
        result
    }

    /// The number of worker threads the pool was built with.
    #[inline]
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Counts the worker threads that are still running.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.workers.lock().as_ref().map_or(0, |workers| {
            workers.iter().filter(|worker| !worker.is_finished()).count()
        })
    }

    /// Counts the tasks waiting in the queue, excluding running ones.
    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.receiver.len()
    }

    fn next_id(&self) -> usize {
        self.next_task_id.fetch_add(1, Ordering::Relaxed)
    }

    fn send_task(&self, task: Task) -> Result<(), PoolError> {
        let id = task.id();
        let queued = match self.sender.lock().as_ref() {
            // The pool keeps a receiver, so the channel cannot disconnect here.
            Some(sender) => sender.send(task).is_ok(),
            None => false,
        };

        if !queued {
            warn!(task = id, "task rejected, the thread pool is stopped");
            return Err(PoolError::Stopped);
        }
        trace!(task = id, "task queued");
        Ok(())
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if let Err(payload) = self.join() {
            error!(
                panic = %panic_message(payload.as_ref()),
                "worker thread panicked"
            );
        }
    }
}
