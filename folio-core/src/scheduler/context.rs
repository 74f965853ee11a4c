//! Component Context
//!
//! Lifecycle registration needs to know which component is being set up.
//! The scheduler keeps one "current component" slot; entering a context
//! swaps a component into it and the returned guard swaps the previous one
//! back when dropped, so nested initialization restores the parent.
//!
//! The guard restores the slot even if the initialization code panics.

use super::runtime::Scheduler;
use crate::component::Component;

/// Guard that restores the previously active component when dropped.
pub struct ComponentContext<'a> {
    scheduler: &'a Scheduler,
    entered: Option<Component>,
    previous: Option<Component>,
}

impl<'a> ComponentContext<'a> {
    /// Make `component` the active context until the guard is dropped.
    pub fn enter(scheduler: &'a Scheduler, component: Option<Component>) -> Self {
        let previous = scheduler.inner.current.replace(component.clone());
        Self {
            scheduler,
            entered: component,
            previous,
        }
    }
}

impl Drop for ComponentContext<'_> {
    fn drop(&mut self) {
        let popped = self.scheduler.inner.current.replace(self.previous.take());

        // Catches contexts exited out of order.
        if !std::thread::panicking() {
            debug_assert_eq!(
                popped, self.entered,
                "ComponentContext mismatch: expected {:?}, got {:?}",
                self.entered, popped
            );
        }
    }
}
