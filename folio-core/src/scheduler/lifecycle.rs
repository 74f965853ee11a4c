//! Lifecycle
//!
//! Registration of before-update, after-update, mount and destroy callbacks,
//! plus the init/mount/destroy sequence that drives them.
//!
//! Registration always targets the active component (see
//! [`ComponentContext`]). Registering with no active component is a
//! programming error and returns [`LifecycleError::OutsideInitialization`].

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use super::context::ComponentContext;
use super::runtime::Scheduler;
use crate::component::{Callback, CallbackId, Component, LifecycleHook};
use crate::error::LifecycleError;

impl Scheduler {
    /// Run `init` with `component` as the active context.
    ///
    /// Lifecycle registration inside `init` attaches to `component`. The
    /// previous context is restored afterwards.
    pub fn init<R>(&self, component: &Component, init: impl FnOnce() -> R) -> R {
        let _ctx = ComponentContext::enter(self, Some(component.clone()));
        init()
    }

    /// Run `callback` before every update of the active component.
    pub fn add_before_update(&self, callback: Callback) -> Result<Component, LifecycleError> {
        self.register(LifecycleHook::BeforeUpdate, callback)
    }

    /// Run `callback` after every update of the active component.
    pub fn add_after_update(&self, callback: Callback) -> Result<Component, LifecycleError> {
        self.register(LifecycleHook::AfterUpdate, callback)
    }

    /// Run `callback` once, after the active component is mounted.
    pub fn add_on_mount(&self, callback: Callback) -> Result<Component, LifecycleError> {
        self.register(LifecycleHook::OnMount, callback)
    }

    /// Run `callback` when the active component is destroyed.
    pub fn add_on_destroy(&self, callback: Callback) -> Result<Component, LifecycleError> {
        self.register(LifecycleHook::OnDestroy, callback)
    }

    /// Mount `component`: attach its fragment, then queue its mount and
    /// after-update callbacks for the next flush.
    pub fn mount(&self, component: &Component) {
        component.mount_fragment();

        let mounted = component.clone();
        self.add_render_callback(Callback::new(move || {
            for callback in mounted.take_on_mount() {
                callback.invoke();
            }
        }));
        for callback in component.after_update_callbacks() {
            self.add_render_callback(callback);
        }
        debug!(component = %component.id(), name = component.name(), "component mounted");
    }

    /// Destroy `component`.
    ///
    /// Pending after-update callbacks of the component run now and leave the
    /// render queue, then its destroy callbacks run and its fragment is torn
    /// down. The component is never updated again. Destroying twice is a
    /// no-op.
    pub fn destroy(&self, component: &Component) {
        let Some(after_update) = component.begin_destroy() else {
            return;
        };
        self.flush_render_callbacks(&after_update);

        for callback in component.take_on_destroy() {
            callback.invoke();
        }
        component.finish_destroy();
        debug!(component = %component.id(), name = component.name(), "component destroyed");
    }

    fn register(&self, hook: LifecycleHook, callback: Callback) -> Result<Component, LifecycleError> {
        let component = self
            .current_component()
            .ok_or(LifecycleError::OutsideInitialization { hook: hook.name() })?;
        component.push_hook(hook, callback);
        Ok(component)
    }

    /// Run and remove the queued render callbacks that belong to `callbacks`.
    fn flush_render_callbacks(&self, callbacks: &[Callback]) {
        let ids: HashSet<CallbackId> = callbacks.iter().map(Callback::id).collect();
        let (matching, rest): (VecDeque<Callback>, VecDeque<Callback>) = self
            .inner
            .render_callbacks
            .borrow_mut()
            .drain(..)
            .partition(|callback| ids.contains(&callback.id()));
        self.inner.render_callbacks.borrow_mut().extend(rest);

        for callback in matching {
            callback.invoke();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn logging(log: &Log, label: &'static str) -> Callback {
        let log = log.clone();
        Callback::new(move || log.borrow_mut().push(label))
    }

    #[test]
    fn registration_outside_init_fails() {
        let scheduler = Scheduler::new();

        let err = scheduler.add_on_mount(Callback::new(|| {})).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::OutsideInitialization { hook: "on_mount" }
        ));
        assert!(err.to_string().contains("outside component initialization"));

        assert!(scheduler.add_before_update(Callback::new(|| {})).is_err());
        assert!(scheduler.add_after_update(Callback::new(|| {})).is_err());
        assert!(scheduler.add_on_destroy(Callback::new(|| {})).is_err());
    }

    #[test]
    fn registration_inside_init_targets_the_component() {
        let scheduler = Scheduler::new();
        let component = Component::new("a");

        let registered = scheduler
            .init(&component, || scheduler.add_after_update(Callback::new(|| {})))
            .unwrap();

        assert_eq!(registered, component);
        assert_eq!(component.hook_count(LifecycleHook::AfterUpdate), 1);
        assert!(scheduler.current_component().is_none());
    }

    #[test]
    fn mount_runs_on_mount_once_then_after_update() {
        let scheduler = Scheduler::new();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let component = Component::new("a");

        scheduler.init(&component, || {
            scheduler.add_on_mount(logging(&log, "mount")).unwrap();
            scheduler.add_after_update(logging(&log, "after")).unwrap();
        });

        scheduler.mount(&component);
        scheduler.run_microtasks().unwrap();
        assert_eq!(*log.borrow(), vec!["mount", "after"]);

        scheduler.schedule_update(&component);
        scheduler.run_microtasks().unwrap();
        assert_eq!(*log.borrow(), vec!["mount", "after", "after"]);
    }

    #[test]
    fn destroy_runs_pending_after_update_and_destroy_callbacks() {
        let scheduler = Scheduler::new();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let component = Component::new("a");

        scheduler.init(&component, || {
            scheduler.add_after_update(logging(&log, "after")).unwrap();
            scheduler.add_on_destroy(logging(&log, "destroy")).unwrap();
        });
        scheduler.mount(&component);
        scheduler.destroy(&component);
        assert_eq!(*log.borrow(), vec!["after", "destroy"]);

        scheduler.destroy(&component);
        scheduler.run_microtasks().unwrap();
        assert_eq!(*log.borrow(), vec!["after", "destroy"]);
    }

    #[test]
    fn destroyed_component_is_skipped_by_flush() {
        let scheduler = Scheduler::new();
        let updates = Rc::new(RefCell::new(0));
        let updates_clone = updates.clone();
        let component = Component::new("a").with_update(move || {
            *updates_clone.borrow_mut() += 1;
            Ok(())
        });

        scheduler.schedule_update(&component);
        scheduler.destroy(&component);
        scheduler.run_microtasks().unwrap();

        assert_eq!(*updates.borrow(), 0);
        assert!(component.is_destroyed());

        scheduler.schedule_update(&component);
        assert_eq!(scheduler.dirty_len(), 0);
    }
}
