use std::{sync::Arc, thread};

use crate::{task::TaskListeners, PoolError, ThreadPool};

/// A function that used to create a custom worker thread.
pub type ThreadFactory = dyn Fn() -> thread::Builder + Send + Sync + 'static;

/// A builder of the [`ThreadPool`], which can be used to configure
/// the properties of a new thread pool.
///
/// # Examples
///
/// ```
/// use workpool::ThreadPoolBuilder;
///
/// let thread_pool = ThreadPoolBuilder::default()
///     .pool_size(4)
///     .thread_name("compute")
///     .stack_size(1024 * 1024)
///     .listener_before_execute(|id| println!("the task {} will be executed.", id))
///     .listener_after_execute(|id| println!("the task {} has been executed.", id))
///     .build()
///     .unwrap();
///
/// assert_eq!(4, thread_pool.pool_size());
/// ```
pub struct ThreadPoolBuilder {
    pub(crate) pool_size: usize,
    pub(crate) thread_name: String,
    pub(crate) stack_size: Option<usize>,
    pub(crate) task_listeners: TaskListeners,
    pub(crate) thread_factory: Option<Arc<ThreadFactory>>,
}

impl Default for ThreadPoolBuilder {
    /// Creates a new builder with the default configuration.
    ///
    /// # Default Configuration
    /// - `pool_size`: the number of physical cores of the current
    /// system, at least 1
    /// - `thread_name`: `"worker"`
    /// - `stack_size`: the platform default
    /// - `before_execute`: an empty closure `|_| ()`
    /// - `after_execute`: an empty closure `|_| ()`
    /// - `thread_factory`: none
    fn default() -> Self {
        Self {
            pool_size: usize::max(1, num_cpus::get_physical()),
            thread_name: "worker".to_owned(),
            stack_size: None,
            task_listeners: TaskListeners::default(),
            thread_factory: None,
        }
    }
}

impl ThreadPoolBuilder {
    /// Creates the base configuration for the new thread pool.
    ///
    /// See: [`ThreadPoolBuilder::default`]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads. The pool never grows or
    /// shrinks after it is built.
    #[must_use]
    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Sets the name prefix of worker threads. Each thread is named
    /// `"{name}-{index}"`.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Sets the stack size of worker threads in bytes.
    #[must_use]
    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Sets the listener function that will be invoked on the worker
    /// thread before a task is executed.
    ///
    /// A panicking listener terminates the worker thread that ran it.
    #[must_use]
    pub fn listener_before_execute<F>(mut self, listener: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.task_listeners.before_execute = Box::new(listener);
        self
    }

    /// Sets the listener function that will be invoked on the worker
    /// thread after a task is executed, even if the task panicked.
    ///
    /// A panicking listener terminates the worker thread that ran it.
    #[must_use]
    pub fn listener_after_execute<F>(mut self, listener: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.task_listeners.after_execute = Box::new(listener);
        self
    }

    /// Sets the factory function that is used to create a new custom
    /// thread. It takes precedence over `thread_name` and `stack_size`.
    #[must_use]
    pub fn thread_factory_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> thread::Builder + Send + Sync + 'static,
    {
        self.thread_factory = Some(Arc::new(f));
        self
    }

    /// Creates a thread pool with the configuration and starts all of
    /// its worker threads.
    ///
    /// # Errors
    ///
    /// 1. [`NoWorkers`]: `pool_size` is 0.
    ///
    /// 2. [`Spawn`]: A worker thread could not be spawned.
    ///
    /// [`NoWorkers`]: crate::PoolError::NoWorkers
    /// [`Spawn`]: crate::PoolError::Spawn
    pub fn build(self) -> Result<ThreadPool, PoolError> {
        if self.pool_size == 0 {
            return Err(PoolError::NoWorkers);
        }
        ThreadPool::from_builder(self)
    }

    pub(crate) fn thread_builder(&self, index: usize) -> thread::Builder {
        if let Some(factory) = &self.thread_factory {
            return factory();
        }
        let builder = thread::Builder::new().name(format!("{}-{}", self.thread_name, index));
        match self.stack_size {
            Some(size) => builder.stack_size(size),
            None => builder,
        }
    }
}
