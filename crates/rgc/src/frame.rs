//! Frame Module - Stack-Walk Contract
//!
//! The collector never inspects interpreter stacks directly; the host
//! implements [`StackFrame`] and [`RootProvider`] and the collector
//! walks them during the rooting phase.
//!
//! Every inspection method takes two callbacks: `refs` receives
//! addresses of managed objects held directly, `byrefs` receives
//! addresses that may point *into* an object (a field, an array
//! element, a slice of a string). The collector resolves the latter to
//! their owning object by scanning the live list, so providers do not
//! need to know object boundaries.
//!
//! Reporting the null address (0) through either callback is allowed
//! and ignored.

/// One frame of the host's execution stack
///
/// A frame reports the managed references it holds, split by where
/// they live. Frames with nothing to report (intrinsic trampolines,
/// native glue) can leave the default empty bodies.
pub trait StackFrame {
    /// Report references on the evaluation stack
    fn inspect_evaluation_stack(
        &self,
        refs: &mut dyn FnMut(usize),
        byrefs: &mut dyn FnMut(usize),
    ) {
        let _ = (refs, byrefs);
    }

    /// Report references in local variable slots
    fn inspect_locals(&self, refs: &mut dyn FnMut(usize), byrefs: &mut dyn FnMut(usize)) {
        let _ = (refs, byrefs);
    }

    /// Report references in argument slots
    fn inspect_arguments(&self, refs: &mut dyn FnMut(usize), byrefs: &mut dyn FnMut(usize)) {
        let _ = (refs, byrefs);
    }
}

/// A frame that holds no managed references
///
/// Used for intrinsic calls that execute entirely in native code.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntrinsicFrame;

impl StackFrame for IntrinsicFrame {}

/// Source of all roots for one collection
///
/// Passed by the host into [`Collector::collect`] and every
/// allocation entry point so a threshold-triggered collection can
/// find the live graph.
///
/// [`Collector::collect`]: crate::gc::Collector::collect
pub trait RootProvider {
    /// Visit every frame of every execution stack, innermost first or
    /// outermost first; order does not matter to the collector
    fn walk_frames(&self, visit: &mut dyn FnMut(&dyn StackFrame));

    /// Report references held in static/global storage
    fn inspect_statics(&self, refs: &mut dyn FnMut(usize), byrefs: &mut dyn FnMut(usize)) {
        let _ = (refs, byrefs);
    }
}

/// Root provider with no roots at all
///
/// Everything on the heap is garbage under this provider. Useful for
/// startup, teardown, and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRoots;

impl RootProvider for NoRoots {
    fn walk_frames(&self, _visit: &mut dyn FnMut(&dyn StackFrame)) {}
}
