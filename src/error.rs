//! Page error types.

use core::fmt;

/// Errors reported by [`Page`](crate::Page) construction and strict
/// deallocation. Running out of space is not an error: `allocate` returns
/// `None` for that.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageError {
    /// The supplied backing buffer pointer was null.
    InvalidBuffer,
    /// The supplied backing buffer is shorter than the page needs.
    BufferTooSmall {
        /// Bytes the page needs.
        required: usize,
        /// Bytes the caller supplied.
        supplied: usize,
    },
    /// A pointer handed to `try_deallocate` matches no occupied entry.
    UnknownPointer {
        /// The address of the unrecognised pointer.
        address: usize,
    },
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBuffer => write!(f, "supplied block is uninitialized"),
            Self::BufferTooSmall { required, supplied } => {
                write!(
                    f,
                    "supplied block is smaller than page size: need {required} bytes, got {supplied}"
                )
            }
            Self::UnknownPointer { address } => {
                write!(f, "pointer {address:#x} was not allocated from this page")
            }
        }
    }
}

impl core::error::Error for PageError {}
