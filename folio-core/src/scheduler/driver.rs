//! Tokio Driver
//!
//! Hosts running a tokio `LocalSet` do not need to call
//! [`Scheduler::run_microtasks`] by hand. [`spawn_pump`] starts a local task
//! that sleeps until a microtask is queued and then drains the queue.
//!
//! The pump only holds a weak reference to the scheduler and exits once the
//! scheduler is dropped.

use std::rc::Rc;

use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::runtime::Scheduler;

/// Spawn a task that runs the scheduler's microtasks as they are queued.
///
/// Must be called from within a `tokio::task::LocalSet`.
pub fn spawn_pump(scheduler: &Scheduler) -> JoinHandle<()> {
    let wake = scheduler.inner.wake.clone();
    let weak = Rc::downgrade(&scheduler.inner);

    tokio::task::spawn_local(async move {
        loop {
            wake.notified().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            let scheduler = Scheduler { inner };

            // Keep draining past failed flushes so later work still runs.
            loop {
                match scheduler.run_microtasks() {
                    Ok(_) => break,
                    Err(err) => error!(error = %err, "flush failed"),
                }
            }
        }
        debug!("scheduler dropped; microtask pump exiting");
    })
}
