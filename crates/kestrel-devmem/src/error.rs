//! Error types for device memory operations

use crate::region::{RegionId, RegionKind};
use thiserror::Error;

/// Result type alias for device memory operations
pub type Result<T> = std::result::Result<T, DevMemError>;

/// Errors that can occur while managing device memory
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DevMemError {
    /// No free region large enough to satisfy an allocation.
    ///
    /// Recoverable: the caller may free other regions and retry.
    #[error("out of device memory: {kind} allocation of {size} bytes (align {align}) with {free_bytes} bytes free")]
    MemoryAllocation {
        /// Kind that was requested
        kind: RegionKind,
        /// Requested payload size in bytes
        size: u64,
        /// Effective alignment of the request
        align: u64,
        /// Free bytes remaining in the allocator (fragmented)
        free_bytes: u64,
    },

    /// `free` was called with an identifier that names no live region.
    ///
    /// A caller programming error; never ignored, never retried.
    #[error("unknown region identifier {id}")]
    UnknownRegion {
        /// Identifier that was looked up
        id: RegionId,
    },

    /// An emplace target falls outside the managed range.
    #[error("emplace target [{offset:#x}, {offset:#x}+{size}) outside managed range")]
    EmplaceOutOfRange {
        /// Requested payload offset
        offset: u64,
        /// Requested payload size
        size: u64,
    },

    /// An emplace target is inside the managed range but collides with
    /// existing allocations (not contained in one free entry).
    #[error("emplace target [{offset:#x}, {offset:#x}+{size}) overlaps existing regions")]
    EmplaceOverlap {
        /// Requested payload offset
        offset: u64,
        /// Requested payload size
        size: u64,
    },

    /// A region of zero payload bytes was requested.
    #[error("zero-size {kind} region requested")]
    ZeroSizeRegion {
        /// Kind that was requested
        kind: RegionKind,
    },

    /// A requested alignment is not a power of two.
    #[error("alignment {requested} is not a power of two")]
    InvalidAlignment {
        /// Alignment that was requested
        requested: u64,
    },

    /// A managed range whose end would overflow the offset space.
    #[error("managed range [{base:#x}, {base:#x}+{size}) overflows the address space")]
    RangeOverflow {
        /// Range base offset
        base: u64,
        /// Range size in bytes
        size: u64,
    },
}

impl DevMemError {
    /// Create an out-of-memory error
    pub(crate) fn memory_allocation(kind: RegionKind, size: u64, align: u64, free_bytes: u64) -> Self {
        Self::MemoryAllocation {
            kind,
            size,
            align,
            free_bytes,
        }
    }

    /// Create an unknown-region error
    pub(crate) fn unknown_region(id: RegionId) -> Self {
        Self::UnknownRegion { id }
    }

    /// Create an emplace out-of-range error
    pub(crate) fn emplace_out_of_range(offset: u64, size: u64) -> Self {
        Self::EmplaceOutOfRange { offset, size }
    }

    /// Create an emplace overlap error
    pub(crate) fn emplace_overlap(offset: u64, size: u64) -> Self {
        Self::EmplaceOverlap { offset, size }
    }
}
