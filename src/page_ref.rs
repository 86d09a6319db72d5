use crate::layout::*;
use core::fmt;
use core::ptr::NonNull;

/// A raw pointer to an initialised page together with its [`PageLayout`].
/// This is the only place the crate dereferences the backing buffer; the
/// rest of the crate talks in slot indices and byte offsets.
#[derive(Clone, Copy)]
pub(crate) struct PageRef {
    inner:  NonNull<u8>,
    layout: PageLayout,
}

impl PageRef {
    /// Writes a fresh header and the sentinel slot, returning a [`PageRef`]
    /// to the initialised page.
    ///
    /// ## Safety
    ///
    /// `inner` must be valid for reads and writes of `layout.size()` bytes
    /// and `layout` must have been computed for `inner`'s address.
    pub(crate) unsafe fn init(inner: NonNull<u8>, layout: PageLayout) -> Self {
        let page = PageRef { inner, layout };
        page.set_entries(0);
        let data = layout.data();
        page.write_entry(0, Entry { base: data, len: 0, token: data });
        page
    }

    #[inline(always)]
    pub(crate) fn layout(self) -> PageLayout { self.layout }

    /// The address of the start of the backing buffer.
    #[inline(always)]
    pub(crate) fn addr(self) -> usize { self.inner.as_ptr() as usize }

    /// Converts a caller pointer into a buffer offset, if it points into
    /// this page.
    #[inline(always)]
    pub(crate) fn offset_of(self, ptr: *const u8) -> Option<usize> {
        (ptr as usize).checked_sub(self.addr()).filter(|offset| *offset < self.layout.size())
    }

    /// A pointer `offset` bytes into the page.
    #[inline(always)]
    pub(crate) fn ptr_at(self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset <= self.layout.size());
        unsafe { NonNull::new_unchecked(self.inner.as_ptr().add(offset)) }
    }

    /// ## Safety
    ///
    /// The page must still be alive and not accessed concurrently.
    #[inline(always)]
    pub(crate) unsafe fn entries(self) -> usize { (*self.header()).entries }

    /// ## Safety
    ///
    /// As [`PageRef::entries`].
    #[inline(always)]
    pub(crate) unsafe fn set_entries(self, entries: usize) { (*self.header()).entries = entries; }

    /// Reads table slot `slot`.
    ///
    /// ## Safety
    ///
    /// As [`PageRef::entries`], and `slot` must be a valid slot of the layout.
    #[inline(always)]
    pub(crate) unsafe fn entry(self, slot: usize) -> Entry { self.slot_ptr(slot).read() }

    /// ## Safety
    ///
    /// As [`PageRef::entry`].
    #[inline(always)]
    pub(crate) unsafe fn write_entry(self, slot: usize, entry: Entry) { self.slot_ptr(slot).write(entry) }

    /// ## Safety
    ///
    /// As [`PageRef::entry`].
    #[inline(always)]
    pub(crate) unsafe fn set_len(self, slot: usize, len: usize) { (*self.slot_ptr(slot)).len = len; }

    #[inline(always)]
    fn header(self) -> *mut PageHeader {
        unsafe { self.inner.as_ptr().add(self.layout.header()) }.cast()
    }

    #[inline(always)]
    fn slot_ptr(self, slot: usize) -> *mut Entry {
        debug_assert!(self.layout.slot(slot).is_some(), "slot {} outside the table", slot);
        let offset = self.layout.table() - slot * ENTRY_SIZE;
        unsafe { self.inner.as_ptr().add(offset) }.cast()
    }
}

impl fmt::Debug for PageRef {
    #[inline(always)]
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result { write!(fmt, "PageRef({:p})", self.inner) }
}
