//! Update Scheduler
//!
//! This module batches component updates. Any number of synchronous
//! `schedule_update` calls collapse into a single flush that runs at the
//! next microtask checkpoint, in a fixed order, without losing updates that
//! callbacks request while the flush is running.
//!
//! # Lifecycle of a Flush
//!
//! ```text
//! Idle --schedule_update--> Pending --microtask--> Flushing --> Draining --> Idle
//!                                                     ^             |
//!                                                     +-- new dirty-+
//! ```
//!
//! - **Pending**: a flush microtask is queued. Further scheduling only adds
//!   to the dirty queue.
//! - **Flushing**: components are updated in the order they were scheduled.
//!   Components scheduled during this phase join the same pass.
//! - **Draining**: binding and after-update callbacks run. If they schedule
//!   more components the flush goes back to Flushing; otherwise final
//!   callbacks run and the scheduler returns to Idle.
//!
//! # Single-Threaded Model
//!
//! All state lives in a [`Scheduler`] value, which is `!Send`. Code that must
//! schedule from inside callbacks captures a clone of the handle. There are no
//! locks; re-entrancy is handled by the phase check at the top of
//! [`Scheduler::flush`].

mod context;
mod driver;
mod lifecycle;
mod microtask;
mod runtime;
mod tick;

pub use context::ComponentContext;
pub use driver::spawn_pump;
pub use runtime::{FlushStats, Phase, Scheduler};
pub use tick::Tick;
