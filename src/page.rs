use crate::error::PageError;
use crate::layout::{Entry, PageLayout};
use crate::observer::*;
use crate::page_ref::PageRef;
use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;

/// The page size used when none is named, 64KiB.
pub const DEFAULT_PAGE_SIZE: usize = 1 << 16;

/// A fixed-capacity arena carved out of the first `SIZE` bytes of a
/// caller-supplied buffer. Allocations are handed out bottom-up from just
/// past a small header, and recorded in a table that grows top-down from the
/// end of the page. Space is reclaimed last in, first out.
///
/// ## Example
///
/// ```
/// use lifo_page::Page;
/// let mut buffer = [0u8; 1024];
/// let mut page = Page::<1024>::new(&mut buffer).unwrap();
/// let a = page.allocate(64).unwrap();
/// let b = page.allocate(64).unwrap();
/// page.deallocate(a); // buried under b, only marked
/// assert_eq!(page.entry_count(), 2);
/// page.deallocate(b); // both come off the top
/// assert_eq!(page.entry_count(), 0);
/// assert_eq!(page.allocate(128), Some(a));
/// ```
///
/// ## Notes
///
/// The page never frees the buffer; dropping it just ends the borrow.
/// Freeing an allocation that still has live allocations above it only marks
/// it: its space comes back once everything above it is freed too, so
/// long-lived objects are best allocated early.
///
/// Moving out with [`Page::take`] leaves the source detached: it refuses
/// allocations and ignores deallocations.
pub struct Page<'a, const SIZE: usize = DEFAULT_PAGE_SIZE, O = ()> {
    inner:    Option<PageRef>,
    observer: O,
    _buffer:  PhantomData<&'a mut [u8]>,
}

impl<'a, const SIZE: usize> Page<'a, SIZE> {
    /// Creates a [`Page`] over the first `SIZE` bytes of `buffer`.
    ///
    /// ## Errors
    ///
    /// [`PageError::BufferTooSmall`] if `buffer` is shorter than `SIZE`, or
    /// `SIZE` cannot hold the page's own bookkeeping.
    pub fn new(buffer: &'a mut [u8]) -> Result<Self, PageError> {
        unsafe { Self::from_raw(buffer.as_mut_ptr(), buffer.len()) }
    }

    /// Creates a [`Page`] over a raw block of `len` bytes.
    ///
    /// ## Errors
    ///
    /// [`PageError::InvalidBuffer`] if `raw` is null, and the errors of
    /// [`Page::new`].
    ///
    /// ## Safety
    ///
    /// You must ensure:
    ///
    /// * `raw` is valid for reads and writes of `len` bytes for `'a`.
    /// * Nothing else touches the first `SIZE` bytes while the page is alive,
    ///   apart from the allocations it hands out.
    pub unsafe fn from_raw(raw: *mut u8, len: usize) -> Result<Self, PageError> {
        let inner = NonNull::new(raw).ok_or(PageError::InvalidBuffer)?;
        if len < SIZE {
            return Err(PageError::BufferTooSmall { required: SIZE, supplied: len });
        }
        let layout = PageLayout::for_buffer(raw as usize, SIZE)?;
        let page = PageRef::init(inner, layout);
        Ok(Page { inner: Some(page), observer: (), _buffer: PhantomData })
    }
}

impl<'a, const SIZE: usize, O: PageObserver> Page<'a, SIZE, O> {
    /// Replaces this page's observer.
    pub fn with_observer<P: PageObserver>(self, observer: P) -> Page<'a, SIZE, P> {
        Page { inner: self.inner, observer, _buffer: PhantomData }
    }

    /// Access to the observer by reference.
    #[inline(always)]
    pub fn observer(&self) -> &O { &self.observer }

    /// Access to the observer by mut reference.
    #[inline(always)]
    pub fn observer_mut(&mut self) -> &mut O { &mut self.observer }

    /// Hands out `size` bytes directly after the current top allocation.
    ///
    /// Returns `None` when the bytes would run into the allocation table, or
    /// the page is detached. The memory is uninitialised from the page's
    /// point of view and stays valid until it is reclaimed.
    ///
    /// Allocations are only byte-aligned.
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        let page = self.inner?;
        let layout = page.layout();
        let entries = unsafe { page.entries() };
        let entry = entries + 1;
        let base = unsafe { page.entry(entries) }.end();
        let end = match (base.checked_add(size), layout.slot(entry)) {
            (Some(end), Some(slot)) if end <= slot => end,
            _ => {
                let remaining = Self::remaining_in(page);
                self.observer.exhausted(&Exhausted { entry, size, remaining });
                return None;
            }
        };
        unsafe {
            page.write_entry(entry, Entry { base, len: size, token: base });
            page.set_entries(entry);
        }
        Self::check(page);
        let consumed = end - layout.data();
        let remaining = Self::remaining_in(page);
        self.observer.allocated(&Allocated { entry, size, consumed, remaining });
        Some(page.ptr_at(base))
    }

    /// Reclaims the allocation at `ptr`.
    ///
    /// Only a run of freed allocations at the top of the table actually
    /// returns space; anything freed beneath a live allocation waits for it.
    /// Pointers this page did not hand out, and second frees, are ignored.
    pub fn deallocate(&mut self, ptr: NonNull<u8>) {
        if let Some(page) = self.inner {
            let before = Self::top_end(page);
            Self::mark(page, ptr);
            self.compact(page, before);
        }
    }

    /// Like [`Page::deallocate`], but refuses pointers that no occupied entry
    /// was handed out for.
    ///
    /// ## Errors
    ///
    /// [`PageError::UnknownPointer`], leaving the page untouched.
    pub fn try_deallocate(&mut self, ptr: NonNull<u8>) -> Result<(), PageError> {
        let unknown = PageError::UnknownPointer { address: ptr.as_ptr() as usize };
        let page = self.inner.ok_or_else(|| unknown.clone())?;
        let before = Self::top_end(page);
        if !Self::mark(page, ptr) {
            return Err(unknown);
        }
        self.compact(page, before);
        Ok(())
    }

    /// Moves this page out, leaving a detached page behind.
    #[inline(always)]
    pub fn take(&mut self) -> Self where O: Default { mem::take(self) }

    /// Exchanges the buffers and observers of two pages.
    #[inline(always)]
    pub fn swap(&mut self, other: &mut Self) { mem::swap(self, other) }

    /// Whether this page has been moved out of.
    #[inline(always)]
    pub fn is_detached(&self) -> bool { self.inner.is_none() }

    /// The number of managed bytes.
    #[inline(always)]
    pub fn page_size(&self) -> usize { SIZE }

    /// Where the header, data and table sit, unless detached.
    #[inline(always)]
    pub fn layout(&self) -> Option<PageLayout> { self.inner.map(PageRef::layout) }

    /// Occupied table entries, not counting the sentinel. Includes freed
    /// entries still buried under live ones.
    #[inline(always)]
    pub fn entry_count(&self) -> usize {
        self.inner.map_or(0, |page| unsafe { page.entries() })
    }

    /// Bytes from the start of the data region to the end of the top
    /// allocation.
    pub fn used(&self) -> usize {
        self.inner.map_or(0, |page| Self::top_end(page) - page.layout().data())
    }

    /// The largest allocation that would currently succeed.
    pub fn remaining(&self) -> usize { self.inner.map_or(0, Self::remaining_in) }

    /// The largest allocation an empty page could hold.
    pub fn capacity(&self) -> usize { self.inner.map_or(0, |page| page.layout().capacity()) }

    #[inline(always)]
    fn top_end(page: PageRef) -> usize {
        unsafe { page.entry(page.entries()) }.end()
    }

    fn remaining_in(page: PageRef) -> usize {
        let next = unsafe { page.entries() } + 1;
        page.layout().slot(next).map_or(0, |slot| slot.saturating_sub(Self::top_end(page)))
    }

    /// Zeroes the length of every occupied entry handed out at `ptr`.
    fn mark(page: PageRef, ptr: NonNull<u8>) -> bool {
        let token = match page.offset_of(ptr.as_ptr()) {
            Some(token) => token,
            None => return false,
        };
        let entries = unsafe { page.entries() };
        let mut found = false;
        for slot in 1..=entries {
            if unsafe { page.entry(slot) }.token == token {
                unsafe { page.set_len(slot, 0) };
                found = true;
            }
        }
        found
    }

    /// Pops zero-length entries off the top, stopping at the first live one
    /// or the sentinel.
    fn compact(&mut self, page: PageRef, before: usize) {
        let start = unsafe { page.entries() };
        let mut entries = start;
        while entries > 0 && unsafe { page.entry(entries) }.len == 0 {
            entries -= 1;
        }
        unsafe { page.set_entries(entries) };
        Self::check(page);
        let bytes = before - Self::top_end(page);
        self.observer.reclaimed(&Reclaimed { blocks: start - entries, bytes });
    }

    /// Debug-only walk of the table, checking the data and table regions
    /// stay disjoint and the entries stay in address order.
    fn check(page: PageRef) {
        if !cfg!(debug_assertions) { return; }
        let layout = page.layout();
        let entries = unsafe { page.entries() };
        let sentinel = unsafe { page.entry(0) };
        debug_assert_eq!(sentinel, Entry { base: layout.data(), len: 0, token: layout.data() });
        let mut prev = sentinel;
        for slot in 1..=entries {
            let entry = unsafe { page.entry(slot) };
            debug_assert_eq!(entry.token, entry.base);
            debug_assert!(prev.end() <= entry.base, "slot {} overlaps the one below it", slot);
            prev = entry;
        }
        let fits = layout.slot(entries).map_or(false, |top| prev.end() <= top);
        debug_assert!(fits, "data region runs into the table");
    }
}

impl<'a, const SIZE: usize, O: PageObserver + Default> Default for Page<'a, SIZE, O> {
    /// A detached page.
    fn default() -> Self { Page { inner: None, observer: O::default(), _buffer: PhantomData } }
}

unsafe impl<'a, const SIZE: usize, O: Send> Send for Page<'a, SIZE, O> {}

impl<'a, const SIZE: usize, O> fmt::Debug for Page<'a, SIZE, O> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self.inner {
            Some(page) => write!(fmt, "Page[{}; {} entries]", SIZE, unsafe { page.entries() }),
            None => write!(fmt, "Page[{}; detached]", SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ENTRY_SIZE;
    use std::vec;

    #[test]
    fn fresh_page_has_only_the_sentinel() {
        let mut buf = vec![0u8; 4096];
        let page = Page::<4096>::new(&mut buf).unwrap();
        assert_eq!(page.entry_count(), 0);
        assert_eq!(page.used(), 0);
        assert_eq!(page.remaining(), page.capacity());
        let sentinel = unsafe { page.inner.unwrap().entry(0) };
        assert_eq!(sentinel.len, 0);
        assert_eq!(sentinel.base, page.layout().unwrap().data());
    }

    #[test]
    fn allocation_is_recorded_in_the_next_slot_down() {
        let mut buf = vec![0u8; 4096];
        let mut page = Page::<4096>::new(&mut buf).unwrap();
        let a = page.allocate(100).unwrap();
        let b = page.allocate(28).unwrap();
        let inner = page.inner.unwrap();
        let first = unsafe { inner.entry(1) };
        let second = unsafe { inner.entry(2) };
        assert_eq!(inner.ptr_at(first.base), a);
        assert_eq!(first.len, 100);
        assert_eq!(second.base, first.end());
        assert_eq!(inner.ptr_at(second.token), b);
        let layout = inner.layout();
        assert_eq!(layout.slot(2), Some(layout.table() - 2 * ENTRY_SIZE));
    }

    #[test]
    fn each_allocation_costs_one_entry_of_space() {
        let mut buf = vec![0u8; 4096];
        let mut page = Page::<4096>::new(&mut buf).unwrap();
        let before = page.remaining();
        page.allocate(10).unwrap();
        assert_eq!(page.remaining(), before - 10 - ENTRY_SIZE);
        assert_eq!(page.used(), 10);
    }

    #[test]
    fn debug_format_names_the_state() {
        let mut buf = vec![0u8; 1024];
        let mut page = Page::<1024>::new(&mut buf).unwrap();
        page.allocate(1).unwrap();
        assert_eq!(std::format!("{:?}", page), "Page[1024; 1 entries]");
        let _moved = page.take();
        assert_eq!(std::format!("{:?}", page), "Page[1024; detached]");
    }
}
