//! Hooks for watching a [`Page`](crate::Page) allocate and reclaim.
//!
//! Observers are purely informational: a page behaves identically whichever
//! observer it carries. The default observer `()` ignores everything and
//! compiles away.

/// A successful allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allocated {
    /// The table slot the allocation occupies (1 for the first).
    pub entry:     usize,
    /// Bytes requested.
    pub size:      usize,
    /// Bytes between the data start and the end of this allocation.
    pub consumed:  usize,
    /// Bytes a further allocation could take.
    pub remaining: usize,
}

/// An allocation refused for lack of space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Exhausted {
    /// The table slot the allocation would have occupied.
    pub entry:     usize,
    /// Bytes requested.
    pub size:      usize,
    /// Bytes that were available.
    pub remaining: usize,
}

/// The outcome of a deallocation's compaction pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reclaimed {
    /// Entries popped off the top of the table.
    pub blocks: usize,
    /// Bytes returned to the data region.
    pub bytes:  usize,
}

/// Receives events from a [`Page`](crate::Page). Every method defaults to
/// doing nothing.
pub trait PageObserver {
    #[inline(always)]
    fn allocated(&mut self, _event: &Allocated) {}

    #[inline(always)]
    fn exhausted(&mut self, _event: &Exhausted) {}

    #[inline(always)]
    fn reclaimed(&mut self, _event: &Reclaimed) {}
}

impl PageObserver for () {}

impl<O: PageObserver + ?Sized> PageObserver for &mut O {
    #[inline(always)]
    fn allocated(&mut self, event: &Allocated) { (**self).allocated(event) }

    #[inline(always)]
    fn exhausted(&mut self, event: &Exhausted) { (**self).exhausted(event) }

    #[inline(always)]
    fn reclaimed(&mut self, event: &Reclaimed) { (**self).reclaimed(event) }
}

/// Forwards every event to [`tracing`] at `TRACE` level under the
/// `lifo_page` target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraceObserver;

impl PageObserver for TraceObserver {
    fn allocated(&mut self, event: &Allocated) {
        tracing::trace!(
            target: "lifo_page",
            entry = event.entry,
            size = event.size,
            consumed = event.consumed,
            remaining = event.remaining,
            "allocated"
        );
    }

    fn exhausted(&mut self, event: &Exhausted) {
        tracing::trace!(
            target: "lifo_page",
            entry = event.entry,
            size = event.size,
            remaining = event.remaining,
            "no space left in the page"
        );
    }

    fn reclaimed(&mut self, event: &Reclaimed) {
        tracing::trace!(target: "lifo_page", blocks = event.blocks, bytes = event.bytes, "reclaimed");
    }
}
