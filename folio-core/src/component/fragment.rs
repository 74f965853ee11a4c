//! The rendered part of a component.

use super::DirtyBits;

/// Rendered output owned by a component.
///
/// The scheduler never looks inside a fragment. It calls [`patch`] once per
/// update with the slots that changed, and the lifecycle helpers call
/// [`mount`] and [`destroy`].
///
/// [`patch`]: Fragment::patch
/// [`mount`]: Fragment::mount
/// [`destroy`]: Fragment::destroy
pub trait Fragment {
    /// Apply the changes recorded in `dirty`.
    fn patch(&mut self, dirty: &DirtyBits);

    /// Attach the fragment. Called by [`Scheduler::mount`](crate::scheduler::Scheduler::mount).
    fn mount(&mut self) {}

    /// Tear the fragment down. Called once by
    /// [`Scheduler::destroy`](crate::scheduler::Scheduler::destroy).
    fn destroy(&mut self) {}
}

impl<F> Fragment for F
where
    F: FnMut(&DirtyBits),
{
    fn patch(&mut self, dirty: &DirtyBits) {
        self(dirty)
    }
}
