use std::{
    io,
    thread::{self, JoinHandle},
};

use crossbeam_channel::Receiver;
use tracing::debug;

use crate::task::Task;

/// A worker holds a thread that keeps receiving tasks from the shared
/// queue and running them.
///
/// The thread exits once the queue is closed and drained. A panic that
/// escapes a task (only listeners can do that) ends this worker alone.
pub(crate) struct Worker {
    pub(crate) index: usize,
    pub(crate) handle: JoinHandle<()>,
}

impl Worker {
    pub(crate) fn spawn(
        index: usize,
        builder: thread::Builder,
        receiver: Receiver<Task>,
    ) -> io::Result<Self> {
        let handle = builder.spawn(move || {
            debug!(worker = index, "worker started");
            while let Ok(task) = receiver.recv() {
                task.run();
            }
            debug!(worker = index, "worker exited");
        })?;
        Ok(Worker { index, handle })
    }

    #[inline]
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the worker thread to end. A worker never joins itself,
    /// which happens when the pool is dropped from inside a task.
    pub(crate) fn join(self) -> thread::Result<()> {
        if self.handle.thread().id() != thread::current().id() {
            self.handle.join()?;
        }
        Ok(())
    }
}
