use crate::error::PageError;
use core::fmt;
use core::mem::{align_of, size_of};

/// The bookkeeping stored at the aligned start of every page.
#[repr(C)]
pub(crate) struct PageHeader {
    /// Occupied table slots above the sentinel.
    pub(crate) entries: usize,
}

/// One allocation table slot. All fields are byte offsets from the start of
/// the backing buffer, never raw addresses.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Entry {
    pub(crate) base:  usize,
    pub(crate) len:   usize,
    pub(crate) token: usize,
}

impl Entry {
    /// The offset one past the last byte of this allocation.
    #[inline(always)]
    pub(crate) fn end(self) -> usize { self.base + self.len }
}

/// Size in bytes of one allocation table slot.
pub const ENTRY_SIZE: usize = size_of::<Entry>();

/// The smallest page size that can hold an aligned header, the sentinel slot
/// and one further slot at any buffer address.
pub const MIN_PAGE_SIZE: usize =
    size_of::<PageHeader>() + align_of::<PageHeader>() + 3 * ENTRY_SIZE;

/// Rounds `addr` up to the next multiple of `align`, which must be a power
/// of two.
#[inline(always)]
pub fn align_up(addr: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (addr + (align - 1)) & !(align - 1)
}

/// Rounds `addr` down to the previous multiple of `align`, which must be a
/// power of two.
#[inline(always)]
pub fn align_down(addr: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    addr & !(align - 1)
}

/// Describes where the header, the data region and the allocation table sit
/// inside a page. Computed once per buffer; every offset is relative to the
/// start of the buffer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    /// Offset of the header.
    header: usize,
    /// Offset of the first data byte, just past the header.
    data:   usize,
    /// Offset of slot 0, the sentinel. Slot `n` lives `n` entries below it.
    table:  usize,
    /// Number of managed bytes.
    size:   usize,
}

impl PageLayout {
    /// Lays out a page of `size` bytes over a buffer starting at `addr`.
    ///
    /// ## Errors
    ///
    /// [`PageError::BufferTooSmall`] if `size` is below [`MIN_PAGE_SIZE`].
    pub fn for_buffer(addr: usize, size: usize) -> Result<Self, PageError> {
        if size < MIN_PAGE_SIZE {
            return Err(PageError::BufferTooSmall { required: MIN_PAGE_SIZE, supplied: size });
        }
        let header = align_up(addr, align_of::<PageHeader>()) - addr;
        let data = header + size_of::<PageHeader>();
        let end = addr + size;
        let mut slot = align_up(end - ENTRY_SIZE, align_of::<Entry>());
        // Rounding up may have pushed the slot's tail past the page.
        if slot + ENTRY_SIZE > end { slot -= ENTRY_SIZE; }
        let table = slot - addr;
        debug_assert!(table >= data + ENTRY_SIZE);
        Ok(PageLayout { header, data, table, size })
    }

    /// Offset of the header.
    #[inline(always)]
    pub fn header(self) -> usize { self.header }

    /// Offset of the start of the data region.
    #[inline(always)]
    pub fn data(self) -> usize { self.data }

    /// Offset of the sentinel slot.
    #[inline(always)]
    pub fn table(self) -> usize { self.table }

    /// Number of managed bytes.
    #[inline(always)]
    pub fn size(self) -> usize { self.size }

    /// Offset of table slot `index`, or `None` if that slot would reach down
    /// into the header.
    #[inline(always)]
    pub fn slot(self, index: usize) -> Option<usize> {
        let depth = index.checked_mul(ENTRY_SIZE)?;
        self.table.checked_sub(depth).filter(|slot| *slot >= self.data)
    }

    /// Bytes available to a single allocation on an empty page.
    #[inline(always)]
    pub fn capacity(self) -> usize {
        self.slot(1).map_or(0, |slot| slot - self.data)
    }
}

impl fmt::Debug for PageLayout {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "PageLayout[data {}, table {}, size {}]", self.data, self.table, self.size)
    }
}
