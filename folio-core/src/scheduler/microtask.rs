//! Microtask Queue
//!
//! Work deferred until the host reaches its next checkpoint. The host decides
//! when that is: call [`Scheduler::run_microtasks`] once the current
//! synchronous work is done, or let [`spawn_pump`](super::spawn_pump) do it
//! from a tokio `LocalSet`.
//!
//! Tasks run in FIFO order. Tasks queued while the queue is being drained run
//! in the same call.

use std::cell::RefCell;
use std::collections::VecDeque;

use tracing::trace;

use super::runtime::{Phase, Scheduler};
use crate::error::FlushError;

pub(crate) enum Microtask {
    /// Run [`Scheduler::flush`].
    Flush,
    /// Arbitrary host work.
    Task(Box<dyn FnOnce()>),
}

#[derive(Default)]
pub(crate) struct MicrotaskQueue {
    tasks: RefCell<VecDeque<Microtask>>,
}

impl MicrotaskQueue {
    pub(crate) fn push(&self, microtask: Microtask) {
        self.tasks.borrow_mut().push_back(microtask);
    }

    pub(crate) fn pop(&self) -> Option<Microtask> {
        self.tasks.borrow_mut().pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.borrow().len()
    }
}

impl Scheduler {
    /// Queue arbitrary work to run at the next microtask checkpoint.
    pub fn queue_microtask<F>(&self, task: F)
    where
        F: FnOnce() + 'static,
    {
        self.queue(Microtask::Task(Box::new(task)));
    }

    /// Number of microtasks waiting to run.
    pub fn pending_microtasks(&self) -> usize {
        self.inner.microtasks.len()
    }

    /// Drain the microtask queue.
    ///
    /// Returns how many microtasks ran. Stops at the first failed flush and
    /// returns its error; anything still queued stays queued.
    pub fn run_microtasks(&self) -> Result<usize, FlushError> {
        let mut ran = 0;
        while let Some(microtask) = self.inner.microtasks.pop() {
            ran += 1;
            match microtask {
                // A synchronous `flush()` may already have settled this batch.
                Microtask::Flush if self.phase() == Phase::Pending => self.flush()?,
                Microtask::Flush => trace!("batch already flushed; skipping flush microtask"),
                Microtask::Task(task) => task(),
            }
        }
        Ok(ran)
    }
}
