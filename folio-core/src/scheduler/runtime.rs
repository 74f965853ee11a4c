//! Scheduler Runtime
//!
//! The [`Scheduler`] owns every queue involved in an update:
//!
//! - the dirty queue of components waiting for `update`
//! - binding callbacks, run last-in-first-out after each component pass
//! - render (after-update) callbacks, deduplicated by identity per flush
//! - final callbacks, run last-in-first-out once the flush has settled
//! - the microtask queue that defers the flush itself
//!
//! # Flush Algorithm
//!
//! 1. Walk the dirty queue from the flush index. Each component becomes the
//!    active context, runs its update and queues its after-update callbacks.
//! 2. Reset the queue and index, then drain binding and render callbacks.
//! 3. If draining scheduled more components, go back to 1.
//! 4. Drain the final queue, return to `Idle`, restore the saved context.
//!
//! Step 3 has no iteration cap. A flush that keeps rescheduling work keeps
//! running; past [`SchedulerConfig::pass_warning_threshold`] passes a warning
//! is logged once.
//!
//! # Failure
//!
//! If an update fails (or panics), [`FlushGuard`] still runs: the dirty queue
//! and index are reset, abandoned components get clean dirty bits, and the
//! scheduler goes back to `Idle` so the next `schedule_update` starts a fresh
//! flush.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use std::sync::Arc;
use std::task::Waker;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

use super::microtask::{Microtask, MicrotaskQueue};
use crate::component::{Callback, CallbackId, Component};
use crate::config::SchedulerConfig;
use crate::error::FlushError;

/// Where the scheduler is in its update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing scheduled.
    Idle,
    /// A flush microtask is queued but has not started.
    Pending,
    /// Walking the dirty queue.
    Flushing,
    /// Draining binding, render and final callbacks.
    Draining,
}

/// Counters accumulated over the scheduler's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushStats {
    /// Flushes started (including aborted ones).
    pub flushes: u64,
    /// Passes over the dirty queue.
    pub passes: u64,
    /// Component updates run.
    pub updates: u64,
    /// Callbacks invoked by the flush loop.
    pub callbacks: u64,
}

pub(super) struct Inner {
    pub(super) config: SchedulerConfig,
    pub(super) phase: Cell<Phase>,
    pub(super) dirty_components: RefCell<Vec<Component>>,
    pub(super) flush_index: Cell<usize>,
    pub(super) binding_callbacks: RefCell<Vec<Callback>>,
    pub(super) render_callbacks: RefCell<VecDeque<Callback>>,
    pub(super) seen_callbacks: RefCell<HashSet<CallbackId>>,
    pub(super) final_callbacks: RefCell<IndexMap<CallbackId, Callback>>,
    pub(super) seen_final: RefCell<HashSet<CallbackId>>,
    pub(super) current: RefCell<Option<Component>>,
    pub(super) microtasks: MicrotaskQueue,
    pub(super) completed_flushes: Cell<u64>,
    pub(super) tick_wakers: RefCell<Vec<Waker>>,
    pub(super) wake: Arc<Notify>,
    pub(super) stats: Cell<FlushStats>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Lets a pump parked on `wake` notice the scheduler is gone.
        self.wake.notify_one();
    }
}

/// The update scheduler.
///
/// `Scheduler` is a cheap handle (`Rc`) and is `!Send`: all updates happen on
/// one thread. Clone it into callbacks that need to schedule more work.
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = Scheduler::new();
/// let header = Component::new("header").with_update(|| Ok(()));
///
/// scheduler.schedule_update(&header);
/// scheduler.schedule_update(&header); // coalesced
///
/// scheduler.run_microtasks()?; // one flush, one update
/// ```
#[derive(Clone)]
pub struct Scheduler {
    pub(super) inner: Rc<Inner>,
}

thread_local! {
    static GLOBAL: Scheduler = Scheduler::new();
}

impl Scheduler {
    /// Create a scheduler with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Create a scheduler with the given configuration.
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                config,
                phase: Cell::new(Phase::Idle),
                dirty_components: RefCell::new(Vec::new()),
                flush_index: Cell::new(0),
                binding_callbacks: RefCell::new(Vec::new()),
                render_callbacks: RefCell::new(VecDeque::new()),
                seen_callbacks: RefCell::new(HashSet::new()),
                final_callbacks: RefCell::new(IndexMap::new()),
                seen_final: RefCell::new(HashSet::new()),
                current: RefCell::new(None),
                microtasks: MicrotaskQueue::default(),
                completed_flushes: Cell::new(0),
                tick_wakers: RefCell::new(Vec::new()),
                wake: Arc::new(Notify::new()),
                stats: Cell::new(FlushStats::default()),
            }),
        }
    }

    /// The scheduler shared by everything on the current thread.
    pub fn global() -> Self {
        GLOBAL.with(Scheduler::clone)
    }

    /// The configuration this scheduler was built with.
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Current phase of the update cycle.
    pub fn phase(&self) -> Phase {
        self.inner.phase.get()
    }

    /// Whether a flush is queued or running.
    pub fn is_pending(&self) -> bool {
        self.phase() != Phase::Idle
    }

    /// Counters accumulated since the scheduler was created.
    pub fn stats(&self) -> FlushStats {
        self.inner.stats.get()
    }

    /// Number of components in the dirty queue, processed or not.
    pub fn dirty_len(&self) -> usize {
        self.inner.dirty_components.borrow().len()
    }

    /// Position of the flush cursor in the dirty queue.
    pub fn flush_index(&self) -> usize {
        self.inner.flush_index.get()
    }

    /// The component whose initialization or update is running, if any.
    pub fn current_component(&self) -> Option<Component> {
        self.inner.current.borrow().clone()
    }

    /// Queue `component` for the next flush.
    ///
    /// A component already waiting in this batch is not queued twice. Never
    /// flushes synchronously.
    pub fn schedule_update(&self, component: &Component) {
        if component.mark_scheduled() {
            self.enqueue(component);
        }
        self.request_flush();
    }

    /// Mark context `slot` of `component` as changed and queue it if needed.
    pub fn make_dirty(&self, component: &Component, slot: usize) {
        if component.mark_slot(slot) {
            self.enqueue(component);
        }
        self.request_flush();
    }

    /// Queue a callback to run after the current pass's updates.
    pub fn add_render_callback(&self, callback: Callback) {
        self.inner.render_callbacks.borrow_mut().push_back(callback);
        self.request_flush();
    }

    /// Queue a binding callback. Binding callbacks run last-in-first-out,
    /// after each pass's updates and before render callbacks.
    pub fn add_binding_callback(&self, callback: Callback) {
        self.inner.binding_callbacks.borrow_mut().push(callback);
        self.request_flush();
    }

    /// Queue a callback for the end of the flush, after the fixed point.
    ///
    /// Deferring the same callback more than once within a flush runs it
    /// once. Final callbacks run last-in-first-out.
    pub fn defer_final(&self, callback: Callback) {
        let id = callback.id();
        if !self.inner.seen_final.borrow().contains(&id) {
            self.inner
                .final_callbacks
                .borrow_mut()
                .entry(id)
                .or_insert(callback);
        }
        self.request_flush();
    }

    /// Run the update pass to its fixed point.
    ///
    /// Normally called from the flush microtask, but may be called directly
    /// to settle synchronously. A call made while a flush is already running
    /// returns `Ok(())` immediately.
    pub fn flush(&self) -> Result<(), FlushError> {
        let inner = &self.inner;
        if matches!(inner.phase.get(), Phase::Flushing | Phase::Draining) {
            trace!("flush already running; ignoring nested call");
            return Ok(());
        }

        let mut guard = FlushGuard::new(self);

        loop {
            inner.phase.set(Phase::Flushing);
            while let Some(component) = self.next_dirty() {
                *inner.current.borrow_mut() = Some(component.clone());
                if inner.config.trace_components {
                    trace!(component = %component.id(), name = component.name(), "updating component");
                }

                let after_update = component.run_update().map_err(|source| FlushError::Update {
                    component: component.id(),
                    source,
                })?;
                guard.updates += 1;
                inner.render_callbacks.borrow_mut().extend(after_update);
            }

            *inner.current.borrow_mut() = None;
            inner.dirty_components.borrow_mut().clear();
            inner.flush_index.set(0);

            inner.phase.set(Phase::Draining);
            while let Some(callback) = self.pop_binding_callback() {
                callback.invoke();
                guard.callbacks += 1;
            }
            while let Some(callback) = self.pop_render_callback() {
                let first_time = inner.seen_callbacks.borrow_mut().insert(callback.id());
                if first_time {
                    callback.invoke();
                    guard.callbacks += 1;
                }
            }

            guard.passes += 1;
            if inner.config.pass_warning_threshold == Some(guard.passes as usize) {
                warn!(
                    passes = guard.passes,
                    "flush has not settled; callbacks keep scheduling updates"
                );
            }

            if inner.dirty_components.borrow().is_empty() {
                break;
            }
        }

        while let Some(callback) = self.pop_final_callback() {
            callback.invoke();
            guard.callbacks += 1;
        }

        debug!(
            passes = guard.passes,
            updates = guard.updates,
            callbacks = guard.callbacks,
            "flush settled"
        );
        guard.completed = true;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn enqueue(&self, component: &Component) {
        trace!(component = %component.id(), "component scheduled");
        self.inner
            .dirty_components
            .borrow_mut()
            .push(component.clone());
    }

    /// Move `Idle` to `Pending` and queue the flush microtask.
    pub(super) fn request_flush(&self) {
        if self.inner.phase.get() == Phase::Idle {
            self.inner.phase.set(Phase::Pending);
            self.queue(Microtask::Flush);
        }
    }

    pub(super) fn queue(&self, microtask: Microtask) {
        self.inner.microtasks.push(microtask);
        self.inner.wake.notify_one();
    }

    fn has_queued_work(&self) -> bool {
        !self.inner.dirty_components.borrow().is_empty()
            || !self.inner.binding_callbacks.borrow().is_empty()
            || !self.inner.render_callbacks.borrow().is_empty()
            || !self.inner.final_callbacks.borrow().is_empty()
    }

    fn next_dirty(&self) -> Option<Component> {
        let queue = self.inner.dirty_components.borrow();
        let index = self.inner.flush_index.get();
        let component = queue.get(index)?.clone();
        self.inner.flush_index.set(index + 1);
        Some(component)
    }

    fn pop_binding_callback(&self) -> Option<Callback> {
        self.inner.binding_callbacks.borrow_mut().pop()
    }

    fn pop_render_callback(&self) -> Option<Callback> {
        self.inner.render_callbacks.borrow_mut().pop_front()
    }

    fn pop_final_callback(&self) -> Option<Callback> {
        let (id, callback) = self.inner.final_callbacks.borrow_mut().pop()?;
        self.inner.seen_final.borrow_mut().insert(id);
        Some(callback)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("phase", &self.phase())
            .field("dirty", &self.dirty_len())
            .field("flush_index", &self.flush_index())
            .field("microtasks", &self.inner.microtasks.len())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Restores scheduler state when a flush ends, however it ends.
struct FlushGuard<'a> {
    scheduler: &'a Scheduler,
    saved: Option<Component>,
    completed: bool,
    passes: u64,
    updates: u64,
    callbacks: u64,
}

impl<'a> FlushGuard<'a> {
    fn new(scheduler: &'a Scheduler) -> Self {
        let saved = scheduler.current_component();
        Self {
            scheduler,
            saved,
            completed: false,
            passes: 0,
            updates: 0,
            callbacks: 0,
        }
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        let inner = &self.scheduler.inner;

        if !self.completed {
            let abandoned: Vec<Component> = inner.dirty_components.borrow_mut().drain(..).collect();
            for component in &abandoned {
                component.reset_dirty();
            }
            inner.flush_index.set(0);

            // Callbacks queued by the aborted flush belong to it alone.
            let stale = inner.binding_callbacks.borrow().len()
                + inner.render_callbacks.borrow().len()
                + inner.final_callbacks.borrow().len();
            inner.binding_callbacks.borrow_mut().clear();
            inner.render_callbacks.borrow_mut().clear();
            inner.final_callbacks.borrow_mut().clear();
            warn!(
                abandoned = abandoned.len(),
                stale_callbacks = stale,
                "flush aborted; queues reset"
            );
        }

        inner.seen_callbacks.borrow_mut().clear();
        inner.seen_final.borrow_mut().clear();
        inner.phase.set(Phase::Idle);
        *inner.current.borrow_mut() = self.saved.take();

        let mut stats = inner.stats.get();
        stats.flushes += 1;
        stats.passes += self.passes;
        stats.updates += self.updates;
        stats.callbacks += self.callbacks;
        inner.stats.set(stats);

        inner.completed_flushes.set(inner.completed_flushes.get() + 1);
        let wakers = std::mem::take(&mut *inner.tick_wakers.borrow_mut());
        for waker in wakers {
            waker.wake();
        }

        // A final callback may have queued work after the last pass.
        if self.completed && self.scheduler.has_queued_work() {
            self.scheduler.request_flush();
        }
    }
}
