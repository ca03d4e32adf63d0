use std::any::Any;

use thiserror::Error;

/// An error returned when building a pool or submitting a task.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The task could not be queued because the thread pool has been
    /// shut down.
    #[error("the thread pool is stopped")]
    Stopped,

    /// The pool was configured with zero worker threads.
    #[error("the thread pool needs at least one worker")]
    NoWorkers,

    /// The operating system refused to spawn a worker thread.
    #[error("failed to spawn a worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// The failure of a single task, observed through its [`TaskHandle`].
///
/// [`TaskHandle`]: crate::TaskHandle
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task panicked while running. The panic payload is kept so it
    /// can be resumed in the waiting thread.
    #[error("task {id} panicked: {message}")]
    Panicked {
        id: usize,
        message: String,
        payload: Box<dyn Any + Send>,
    },

    /// The task was dropped without ever running.
    #[error("task {id} was dropped before it could run")]
    Abandoned { id: usize },
}

impl TaskError {
    /// The id of the task this error belongs to.
    #[must_use]
    pub fn task_id(&self) -> usize {
        match self {
            TaskError::Panicked { id, .. } | TaskError::Abandoned { id } => *id,
        }
    }

    /// Returns `true` if the task panicked.
    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked { .. })
    }

    /// Consumes the error and returns the panic payload, if the task
    /// panicked.
    #[must_use]
    pub fn into_panic(self) -> Option<Box<dyn Any + Send>> {
        match self {
            TaskError::Panicked { payload, .. } => Some(payload),
            TaskError::Abandoned { .. } => None,
        }
    }

    pub(crate) fn panicked(id: usize, payload: Box<dyn Any + Send>) -> Self {
        TaskError::Panicked {
            id,
            message: panic_message(payload.as_ref()),
            payload,
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
