//! Component Instances
//!
//! A [`Component`] is the unit the scheduler updates. The scheduler never owns
//! components; it holds cheap handle clones while they sit in its queues.
//!
//! # Internal State
//!
//! Each instance carries:
//!
//! - a [`Fragment`], patched after every update
//! - an update function that applies pending state changes
//! - [`DirtyBits`] recording which context slots changed
//! - four lifecycle callback lists: before-update, after-update, mount and
//!   destroy
//!
//! # Borrowing
//!
//! User code (update functions, fragments, callbacks) is free to call back
//! into the scheduler, including for the component that is running. No
//! `RefCell` borrow is held while user code runs: callback lists are cloned
//! out first, and the update function and fragment are moved out of their
//! slots for the duration of the call. A drop guard puts them back even if
//! the call panics.

mod callback;
mod dirty;
mod fragment;

pub use callback::{Callback, CallbackId};
pub use dirty::DirtyBits;
pub use fragment::Fragment;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::BoxError;

/// Unique identifier for a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Generate a new unique component ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The lifecycle lists a callback can be registered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleHook {
    BeforeUpdate,
    AfterUpdate,
    OnMount,
    OnDestroy,
}

impl LifecycleHook {
    /// Name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            LifecycleHook::BeforeUpdate => "before_update",
            LifecycleHook::AfterUpdate => "after_update",
            LifecycleHook::OnMount => "on_mount",
            LifecycleHook::OnDestroy => "on_destroy",
        }
    }
}

type UpdateFn = dyn FnMut() -> Result<(), BoxError>;

#[derive(Default)]
struct ComponentState {
    fragment: Option<Box<dyn Fragment>>,
    update: Option<Box<UpdateFn>>,
    dirty: DirtyBits,
    before_update: Vec<Callback>,
    after_update: Vec<Callback>,
    on_mount: Vec<Callback>,
    on_destroy: Vec<Callback>,
    destroyed: bool,
}

struct ComponentInner {
    id: ComponentId,
    name: String,
    state: RefCell<ComponentState>,
}

/// Handle to a component instance.
///
/// Clones refer to the same instance; equality is identity.
///
/// # Example
///
/// ```rust,ignore
/// let counter = Component::new("counter")
///     .with_update(|| Ok(()))
///     .with_fragment(|dirty: &DirtyBits| println!("patch {:?}", dirty));
///
/// scheduler.schedule_update(&counter);
/// scheduler.run_microtasks()?;
/// ```
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

impl Component {
    /// Create a component with no update function and no fragment.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(ComponentInner {
                id: ComponentId::new(),
                name: name.into(),
                state: RefCell::new(ComponentState::default()),
            }),
        }
    }

    /// Set the function that applies pending state changes.
    pub fn with_update<F>(self, update: F) -> Self
    where
        F: FnMut() -> Result<(), BoxError> + 'static,
    {
        self.inner.state.borrow_mut().update = Some(Box::new(update));
        self
    }

    /// Set the fragment patched after each update.
    pub fn with_fragment<F>(self, fragment: F) -> Self
    where
        F: Fragment + 'static,
    {
        self.inner.state.borrow_mut().fragment = Some(Box::new(fragment));
        self
    }

    pub fn id(&self) -> ComponentId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Snapshot of the pending dirty bits.
    pub fn dirty(&self) -> DirtyBits {
        self.inner.state.borrow().dirty.clone()
    }

    /// Whether the component currently sits in a dirty queue.
    pub fn is_scheduled(&self) -> bool {
        !self.inner.state.borrow().dirty.is_clean()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.state.borrow().destroyed
    }

    /// Number of callbacks registered on `hook`.
    pub fn hook_count(&self, hook: LifecycleHook) -> usize {
        let state = self.inner.state.borrow();
        match hook {
            LifecycleHook::BeforeUpdate => state.before_update.len(),
            LifecycleHook::AfterUpdate => state.after_update.len(),
            LifecycleHook::OnMount => state.on_mount.len(),
            LifecycleHook::OnDestroy => state.on_destroy.len(),
        }
    }

    // ------------------------------------------------------------------------
    // Scheduler-facing operations
    // ------------------------------------------------------------------------

    /// Mark as scheduled. Returns `true` if the caller must enqueue it.
    pub(crate) fn mark_scheduled(&self) -> bool {
        let mut state = self.inner.state.borrow_mut();
        !state.destroyed && state.dirty.mark_scheduled()
    }

    /// Mark `slot` dirty. Returns `true` if the caller must enqueue it.
    pub(crate) fn mark_slot(&self, slot: usize) -> bool {
        let mut state = self.inner.state.borrow_mut();
        !state.destroyed && state.dirty.mark(slot)
    }

    /// Drop pending dirty bits without updating.
    pub(crate) fn reset_dirty(&self) {
        self.inner.state.borrow_mut().dirty = DirtyBits::Clean;
    }

    pub(crate) fn push_hook(&self, hook: LifecycleHook, callback: Callback) {
        let mut state = self.inner.state.borrow_mut();
        let list = match hook {
            LifecycleHook::BeforeUpdate => &mut state.before_update,
            LifecycleHook::AfterUpdate => &mut state.after_update,
            LifecycleHook::OnMount => &mut state.on_mount,
            LifecycleHook::OnDestroy => &mut state.on_destroy,
        };
        list.push(callback);
    }

    pub(crate) fn after_update_callbacks(&self) -> Vec<Callback> {
        self.inner.state.borrow().after_update.clone()
    }

    /// Take the mount callbacks; they run once.
    pub(crate) fn take_on_mount(&self) -> Vec<Callback> {
        std::mem::take(&mut self.inner.state.borrow_mut().on_mount)
    }

    /// Run one update: before-update callbacks, the update function, then
    /// the fragment patch with the captured dirty bits.
    ///
    /// Returns the after-update callbacks for the caller to queue. A
    /// destroyed component is not updated and yields no callbacks.
    pub(crate) fn run_update(&self) -> Result<Vec<Callback>, BoxError> {
        let before_update = {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed {
                state.dirty = DirtyBits::Clean;
                return Ok(Vec::new());
            }
            state.before_update.clone()
        };
        for callback in &before_update {
            callback.invoke();
        }

        let mut update = SlotGuard::take(self, update_slot);
        let result = match update.value.as_mut() {
            Some(update) => update(),
            None => Ok(()),
        };
        drop(update);
        result?;

        let dirty = self.inner.state.borrow_mut().dirty.take();
        let mut fragment = SlotGuard::take(self, fragment_slot);
        if let Some(fragment) = fragment.value.as_mut() {
            fragment.patch(&dirty);
        }
        drop(fragment);

        Ok(self.inner.state.borrow().after_update.clone())
    }

    pub(crate) fn mount_fragment(&self) {
        let mut fragment = SlotGuard::take(self, fragment_slot);
        if let Some(fragment) = fragment.value.as_mut() {
            fragment.mount();
        }
    }

    /// First half of teardown: mark destroyed and hand back the
    /// after-update callbacks that must be flushed out of the render queue.
    ///
    /// Returns `None` if the component was already destroyed.
    pub(crate) fn begin_destroy(&self) -> Option<Vec<Callback>> {
        let mut state = self.inner.state.borrow_mut();
        if state.destroyed {
            return None;
        }
        state.destroyed = true;
        state.dirty = DirtyBits::Clean;
        Some(std::mem::take(&mut state.after_update))
    }

    pub(crate) fn take_on_destroy(&self) -> Vec<Callback> {
        std::mem::take(&mut self.inner.state.borrow_mut().on_destroy)
    }

    /// Second half of teardown: destroy the fragment and release everything
    /// the instance still holds.
    pub(crate) fn finish_destroy(&self) {
        let (fragment, _update) = {
            let mut state = self.inner.state.borrow_mut();
            state.before_update.clear();
            state.on_mount.clear();
            (state.fragment.take(), state.update.take())
        };
        if let Some(mut fragment) = fragment {
            fragment.destroy();
        }
    }
}

fn update_slot(state: &mut ComponentState) -> &mut Option<Box<UpdateFn>> {
    &mut state.update
}

fn fragment_slot(state: &mut ComponentState) -> &mut Option<Box<dyn Fragment>> {
    &mut state.fragment
}

/// Holds a value moved out of `ComponentState` while user code runs and puts
/// it back on drop, unwinding included. Nothing is restored into a destroyed
/// component or over a replacement installed in the meantime.
struct SlotGuard<'a, T> {
    component: &'a Component,
    slot: fn(&mut ComponentState) -> &mut Option<T>,
    value: Option<T>,
}

impl<'a, T> SlotGuard<'a, T> {
    fn take(component: &'a Component, slot: fn(&mut ComponentState) -> &mut Option<T>) -> Self {
        let value = slot(&mut component.inner.state.borrow_mut()).take();
        Self {
            component,
            slot,
            value,
        }
    }
}

impl<T> Drop for SlotGuard<'_, T> {
    fn drop(&mut self) {
        let Ok(mut state) = self.component.inner.state.try_borrow_mut() else {
            return;
        };
        if state.destroyed {
            return;
        }
        let slot = (self.slot)(&mut state);
        if slot.is_none() {
            *slot = self.value.take();
        }
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Component {}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Component")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("dirty", &state.dirty)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Callback) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = log.clone();
        let make = move |label: &str| {
            let log = log_clone.clone();
            let label = label.to_string();
            Callback::new(move || log.borrow_mut().push(label.clone()))
        };
        (log, make)
    }

    #[test]
    fn run_update_orders_hooks_and_patch() {
        let (log, make) = recorder();

        let update_log = log.clone();
        let patch_log = log.clone();
        let component = Component::new("card")
            .with_update(move || {
                update_log.borrow_mut().push("update".into());
                Ok(())
            })
            .with_fragment(move |dirty: &DirtyBits| {
                patch_log
                    .borrow_mut()
                    .push(format!("patch {}", dirty.contains(2)));
            });

        component.push_hook(LifecycleHook::BeforeUpdate, make("before"));
        component.push_hook(LifecycleHook::AfterUpdate, make("after"));
        component.mark_slot(2);

        let after = component.run_update().unwrap();

        assert_eq!(*log.borrow(), vec!["before", "update", "patch true"]);
        assert_eq!(after.len(), 1);
        assert!(!component.is_scheduled());
    }

    #[test]
    fn failed_update_keeps_update_function() {
        let attempts = Rc::new(RefCell::new(0));
        let attempts_clone = attempts.clone();
        let component = Component::new("flaky").with_update(move || {
            *attempts_clone.borrow_mut() += 1;
            Err("boom".into())
        });

        assert!(component.run_update().is_err());
        assert!(component.run_update().is_err());
        assert_eq!(*attempts.borrow(), 2);
    }

    #[test]
    fn panicking_update_keeps_update_function() {
        let attempts = Rc::new(RefCell::new(0));
        let attempts_clone = attempts.clone();
        let component = Component::new("fragile").with_update(move || {
            *attempts_clone.borrow_mut() += 1;
            if *attempts_clone.borrow() == 1 {
                panic!("first update panics");
            }
            Ok(())
        });

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            component.run_update()
        }));
        assert!(outcome.is_err());

        assert!(component.run_update().is_ok());
        assert_eq!(*attempts.borrow(), 2);
    }

    #[test]
    fn panicking_patch_keeps_fragment() {
        let patches = Rc::new(RefCell::new(0));
        let patches_clone = patches.clone();
        let component = Component::new("fragile").with_fragment(move |_: &DirtyBits| {
            *patches_clone.borrow_mut() += 1;
            if *patches_clone.borrow() == 1 {
                panic!("first patch panics");
            }
        });

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            component.run_update()
        }));
        assert!(outcome.is_err());

        component.run_update().unwrap();
        assert_eq!(*patches.borrow(), 2);
    }

    #[test]
    fn destroyed_component_is_not_rescheduled() {
        let component = Component::new("gone");

        assert!(component.begin_destroy().is_some());
        assert!(component.begin_destroy().is_none());
        assert!(!component.mark_scheduled());
        assert!(!component.mark_slot(1));
        assert!(component.is_destroyed());
    }

    #[test]
    fn equality_is_identity() {
        let a = Component::new("same");
        let b = Component::new("same");

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
    }
}
