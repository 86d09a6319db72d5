//! A fixed-capacity arena over a caller-supplied block of memory, with
//! last-in-first-out reclamation and no metadata outside the block.
//!
//! A [`Page`] splits its buffer three ways: a header holding the entry count
//! at the bottom, a data region growing upward from the header, and an
//! allocation table growing downward from the top. Each allocation pushes one
//! table entry. Freeing zeroes the entry's length, then pops zero-length
//! entries off the top of the table, so space only comes back in stack order.
//!
//! ## Example
//!
//! ```
//! use lifo_page::{Page, PageError};
//! let mut buffer = vec![0u8; 4096];
//! let mut page = Page::<4096>::new(&mut buffer)?;
//!
//! let frame = page.allocate(256).expect("room for a frame");
//! let scratch = page.allocate(512).expect("room for scratch");
//! unsafe { scratch.as_ptr().write_bytes(0, 512) };
//!
//! page.deallocate(scratch);
//! page.deallocate(frame);
//! assert_eq!(page.entry_count(), 0);
//!
//! // Out of space is an ordinary outcome, not an error.
//! assert!(page.allocate(1 << 20).is_none());
//! # Ok::<(), PageError>(())
//! ```
//!
//! ## Notes
//!
//! Pages are single-threaded and byte-aligned. The buffer outlives the page
//! and is never freed by it.
#![no_std]

#[cfg(test)]
extern crate std;

mod error;
pub use error::*;

mod layout;
pub use layout::{align_down, align_up, PageLayout, ENTRY_SIZE, MIN_PAGE_SIZE};

pub mod observer;
pub use observer::{PageObserver, TraceObserver};

mod page;
pub use page::*;

mod page_ref;
