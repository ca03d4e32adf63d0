//! # Work Pool
//!
//! A fixed-size thread pool. Tasks are queued in a FIFO channel and
//! each one is run by exactly one of the pool's worker threads. The
//! number of workers is decided when the pool is built and never
//! changes.
//!
//! # Build a thread pool
//!
//! Use [`ThreadPool::new`] for a pool with a given number of workers,
//! or the [`ThreadPoolBuilder`] to build a thread pool with a custom
//! configuration.
//!
//! # Results
//!
//! [`ThreadPool::submit`] returns a [`TaskHandle`] that blocks until
//! the task has run and then yields its output. A panic inside a task
//! is caught and handed to whoever waits on the handle, as a
//! [`TaskError`]; nothing else observes it.
//!
//! # Examples
//!
//! ```
//! use workpool::ThreadPoolBuilder;
//! let thread_pool = ThreadPoolBuilder::default()
//!     .pool_size(4)
//!     .build()
//!     .unwrap();
//!
//! let handle = thread_pool.submit(|| "Hello World".len()).unwrap();
//! assert_eq!(11, handle.get().unwrap());
//!
//! // Close the thread pool and wait for all worker threads to end.
//! thread_pool.join().unwrap();
//! ```

mod builder;
mod error;
mod handle;
mod thread_pool;

pub(crate) mod task;
pub(crate) mod worker;

pub use builder::*;
pub use error::{PoolError, TaskError};
pub use handle::TaskHandle;
pub use thread_pool::*;
