use std::{
    fmt, mem, panic,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::TaskError;

type TaskResult<T> = Result<T, TaskError>;

enum State<T> {
    Pending,
    Completed(T),
    Failed(TaskError),
}

impl<T> State<T> {
    #[inline]
    fn is_pending(&self) -> bool {
        matches!(self, State::Pending)
    }
}

/// The result cell shared by a [`TaskHandle`] and its [`Completer`].
struct Slot<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

/// Creates a connected completer/handle pair for the task `id`.
pub(crate) fn pair<T>(id: usize) -> (Completer<T>, TaskHandle<T>) {
    let slot = Arc::new(Slot {
        state: Mutex::new(State::Pending),
        ready: Condvar::new(),
    });
    (
        Completer {
            id,
            slot: Some(slot.clone()),
        },
        TaskHandle { id, slot },
    )
}

/// The write side of a task result. It is moved into the task closure
/// and writes exactly once.
///
/// Dropping a completer that never wrote marks the task as
/// [`TaskError::Abandoned`], so readers are never left waiting for a
/// task that will not run.
pub(crate) struct Completer<T> {
    id: usize,
    slot: Option<Arc<Slot<T>>>,
}

impl<T> Completer<T> {
    pub(crate) fn complete(mut self, result: TaskResult<T>) {
        if let Some(slot) = self.slot.take() {
            Self::write(&slot, result);
        }
    }

    fn write(slot: &Slot<T>, result: TaskResult<T>) {
        let mut state = slot.state.lock();
        debug_assert!(state.is_pending());
        *state = match result {
            Ok(value) => State::Completed(value),
            Err(err) => State::Failed(err),
        };
        drop(state);
        slot.ready.notify_all();
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            Self::write(&slot, Err(TaskError::Abandoned { id: self.id }));
        }
    }
}

/// A handle to the result of a task submitted with
/// [`ThreadPool::submit`].
///
/// Waiting on the handle blocks the current thread until the task has
/// run. The result is then taken out with [`get`] or [`join`].
///
/// [`ThreadPool::submit`]: crate::ThreadPool::submit
/// [`get`]: TaskHandle::get
/// [`join`]: TaskHandle::join
///
/// # Examples
///
/// ```
/// use workpool::ThreadPool;
///
/// let pool = ThreadPool::new(2).unwrap();
/// let handle = pool.submit(|| 6 * 7).unwrap();
/// assert_eq!(42, handle.get().unwrap());
/// ```
pub struct TaskHandle<T> {
    id: usize,
    slot: Arc<Slot<T>>,
}

impl<T> TaskHandle<T> {
    /// The pool-unique id of the task.
    #[inline]
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns `true` if the task has finished, successfully or not.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !self.slot.state.lock().is_pending()
    }

    /// Blocks the current thread until the task has finished.
    pub fn wait(&self) {
        let mut state = self.slot.state.lock();
        while state.is_pending() {
            self.slot.ready.wait(&mut state);
        }
    }

    /// Blocks the current thread until the task has finished or the
    /// timeout elapses. Returns `true` if the task has finished.
    ///
    /// A timeout does not cancel the task. A timeout too large to be
    /// represented as a deadline waits without limit.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };
        let mut state = self.slot.state.lock();
        while state.is_pending() {
            if self.slot.ready.wait_until(&mut state, deadline).timed_out() {
                return !state.is_pending();
            }
        }
        true
    }

    /// Waits for the task and returns its output.
    ///
    /// # Errors
    ///
    /// 1. [`Panicked`]: The task panicked.
    ///
    /// 2. [`Abandoned`]: The task was dropped without running.
    ///
    /// [`Panicked`]: crate::TaskError::Panicked
    /// [`Abandoned`]: crate::TaskError::Abandoned
    pub fn get(self) -> Result<T, TaskError> {
        let mut state = self.slot.state.lock();
        while state.is_pending() {
            self.slot.ready.wait(&mut state);
        }
        match mem::replace(&mut *state, State::Pending) {
            State::Completed(value) => Ok(value),
            State::Failed(err) => Err(err),
            State::Pending => unreachable!("the result slot is written before it is read"),
        }
    }

    /// Waits for the task and returns its output. If the task panicked,
    /// the panic is resumed in the current thread.
    ///
    /// # Panics
    ///
    /// Panics if the task panicked or was dropped without running.
    pub fn join(self) -> T {
        match self.get() {
            Ok(value) => value,
            Err(TaskError::Panicked { payload, .. }) => panic::resume_unwind(payload),
            Err(err) => panic!("{err}"),
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("finished", &self.is_finished())
            .finish()
    }
}
