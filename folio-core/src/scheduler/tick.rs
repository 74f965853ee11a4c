//! Awaiting a settled scheduler.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::runtime::Scheduler;

/// Future returned by [`Scheduler::tick`].
///
/// Resolves once the flush that was pending (or started by the `tick` call)
/// has completed. Aborted flushes count as completed.
#[must_use = "futures do nothing unless polled"]
pub struct Tick {
    scheduler: Scheduler,
    target: u64,
}

impl Tick {
    /// Whether the awaited flush has completed.
    pub fn is_settled(&self) -> bool {
        self.scheduler.inner.completed_flushes.get() >= self.target
    }
}

impl Future for Tick {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.is_settled() {
            return Poll::Ready(());
        }
        self.scheduler
            .inner
            .tick_wakers
            .borrow_mut()
            .push(cx.waker().clone());
        Poll::Pending
    }
}

impl Scheduler {
    /// Wait for the scheduler to settle.
    ///
    /// Requests a flush if none is pending, so the returned future always
    /// has a flush to wait for.
    pub fn tick(&self) -> Tick {
        let target = self.inner.completed_flushes.get() + 1;
        self.request_flush();
        Tick {
            scheduler: self.clone(),
            target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use futures_util::FutureExt;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn tick_resolves_after_flush() {
        let scheduler = Scheduler::new();
        let tick = scheduler.tick();

        assert!(!tick.is_settled());
        scheduler.run_microtasks().unwrap();
        assert!(tick.is_settled());
        assert_eq!(tick.now_or_never(), Some(()));
    }

    #[test]
    fn tick_waits_for_the_pending_flush() {
        let scheduler = Scheduler::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        let component = Component::new("a").with_update(move || {
            count_clone.set(count_clone.get() + 1);
            Ok(())
        });

        scheduler.schedule_update(&component);
        let tick = scheduler.tick();

        // Only one flush was queued for both the update and the tick.
        assert_eq!(scheduler.pending_microtasks(), 1);

        let mut tick = tick;
        assert_eq!((&mut tick).now_or_never(), None);

        scheduler.run_microtasks().unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(tick.now_or_never(), Some(()));
    }
}
