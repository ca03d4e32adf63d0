use std::sync::Arc;

use tracing::trace;

/// A type-erased unit of work. Closures capture whatever arguments the
/// work needs.
pub(crate) type TaskFn = Box<dyn FnOnce() + Send + 'static>;

pub(crate) type Listener = Box<dyn Fn(usize) + Send + Sync>;

pub(crate) struct TaskListeners {
    pub(crate) before_execute: Listener,
    pub(crate) after_execute: Listener,
}

impl Default for TaskListeners {
    fn default() -> Self {
        Self {
            before_execute: Box::new(|_| {}),
            after_execute: Box::new(|_| {}),
        }
    }
}

/// A queued task: the work plus the id it was assigned at submission.
pub(crate) struct Task {
    id: usize,
    task_fn: TaskFn,
    listeners: Arc<TaskListeners>,
}

impl Task {
    pub(crate) fn create(id: usize, task_fn: TaskFn, listeners: Arc<TaskListeners>) -> Self {
        Self {
            id,
            task_fn,
            listeners,
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> usize {
        self.id
    }

    /// Runs the task on the current thread.
    ///
    /// `task_fn` is expected to catch its own panics. A panic from a
    /// listener unwinds out of here and takes the worker thread down.
    pub(crate) fn run(self) {
        let listeners = self.listeners;
        (listeners.before_execute)(self.id);
        trace!(task = self.id, "task started");
        (self.task_fn)();
        trace!(task = self.id, "task finished");
        (listeners.after_execute)(self.id);
    }
}
