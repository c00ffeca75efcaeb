//! Region metadata: kinds, identifiers, and allocated-region records.
//!
//! Every allocated region on the device carries a fixed-size metadata
//! header physically immediately below its payload:
//!
//! ```text
//!  span_start        metadata_base       base (payload)       end_offset
//!       │                  │                  │                    │
//!       ▼                  ▼                  ▼                    ▼
//!       ┌──────────────────┬──────────────────┬────────────────────┐
//!       │ alignment pad    │ metadata header  │      payload       │
//!       └──────────────────┴──────────────────┴────────────────────┘
//!       └──────────────────── span_len ───────────────────────────-┘
//! ```
//!
//! Only identifiers and relative offsets ever leave the allocator
//! boundary; raw device addresses stay inside it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use kestrel_chip::{memmap, prot};
use serde::Serialize;

/// Minimum payload alignment. Requests below this (including zero) are
/// raised silently.
pub const MIN_ALIGN: u64 = memmap::align::MIN;

/// The kind of a memory region.
///
/// Closed set: the device's protection fabric and the metadata headers
/// understand exactly these five, so the enum is matched exhaustively
/// wherever a footprint or permission mask is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RegionKind {
    /// Unallocated space. Costs nothing to describe.
    Free,
    /// Firmware text and compiled kernels.
    Code,
    /// Model weights and other load-time constants.
    Constant,
    /// Per-inference scratch buffers.
    Placeholder,
    /// Device-side trace ring buffers.
    Logging,
}

impl RegionKind {
    /// Fixed metadata footprint of this kind, in bytes.
    ///
    /// The footprint sits physically below the payload and is part of the
    /// region's span. Free space has no header. Logging headers carry the
    /// trace ring's head/tail words on top of the common fields.
    #[must_use]
    pub const fn footprint(self) -> u64 {
        match self {
            Self::Free => 0,
            Self::Code => 64,
            Self::Constant | Self::Placeholder => 48,
            Self::Logging => 80,
        }
    }

    /// Access mask the protection fabric applies to this kind.
    #[must_use]
    pub const fn permissions(self) -> u8 {
        match self {
            Self::Free => prot::NONE,
            Self::Code => prot::RX,
            Self::Constant => prot::RO,
            Self::Placeholder | Self::Logging => prot::RW,
        }
    }

    /// Short lowercase name, as used in state dumps.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Code => "code",
            Self::Constant => "constant",
            Self::Placeholder => "placeholder",
            Self::Logging => "logging",
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifier of one allocated region.
///
/// Unique across the whole process and across all kinds: assigned from one
/// shared monotonic counter at creation time and never reused, even after
/// the region is freed. An identifier grants no access on its own — it is
/// only a lookup key handed back into `free` / `buffer_exists`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RegionId(u64);

impl RegionId {
    /// Raw counter value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

static NEXT_REGION_ID: AtomicU64 = AtomicU64::new(1);

/// Draw the next process-wide region identifier.
pub(crate) fn next_region_id() -> RegionId {
    RegionId(NEXT_REGION_ID.fetch_add(1, Ordering::Relaxed))
}

/// One allocated region.
///
/// Records live in their allocator's ordered map, keyed by metadata base;
/// `prev` / `next` hold the neighbouring records' metadata bases (`None`
/// at the ends) so a free can patch its neighbours without re-walking the
/// map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRecord {
    kind: RegionKind,
    id: RegionId,
    base: u64,
    size: u64,
    span_start: u64,
    span_len: u64,
    prev: Option<u64>,
    next: Option<u64>,
}

impl RegionRecord {
    pub(crate) fn new(kind: RegionKind, id: RegionId, base: u64, size: u64) -> Self {
        let footprint = kind.footprint();
        Self {
            kind,
            id,
            base,
            size,
            span_start: base - footprint,
            span_len: footprint + size,
            prev: None,
            next: None,
        }
    }

    /// Widen the record's span to the bytes actually consumed from the
    /// free pool, folding in alignment padding so it is returned on free.
    pub(crate) fn with_span(mut self, span_start: u64, span_len: u64) -> Self {
        debug_assert!(span_start <= self.metadata_base());
        debug_assert!(span_start + span_len >= self.base + self.size);
        self.span_start = span_start;
        self.span_len = span_len;
        self
    }

    /// Region kind.
    #[must_use]
    pub const fn kind(&self) -> RegionKind {
        self.kind
    }

    /// Region identifier.
    #[must_use]
    pub const fn id(&self) -> RegionId {
        self.id
    }

    /// First byte of the caller-visible payload.
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Payload bytes, excluding metadata and padding.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// First byte of the metadata header: `base - footprint(kind)`.
    #[must_use]
    pub const fn metadata_base(&self) -> u64 {
        self.base - self.kind.footprint()
    }

    /// First byte past the region's span.
    #[must_use]
    pub const fn end_offset(&self) -> u64 {
        self.span_start + self.span_len
    }

    /// Total bytes the region holds out of the pool: padding + metadata
    /// footprint + payload.
    #[must_use]
    pub const fn total_size(&self) -> u64 {
        self.span_len
    }

    /// Alignment padding folded into the span.
    #[must_use]
    pub const fn padding(&self) -> u64 {
        self.span_len - self.kind.footprint() - self.size
    }

    /// First byte of the region's span.
    #[must_use]
    pub const fn span_start(&self) -> u64 {
        self.span_start
    }

    /// Access mask of the region.
    #[must_use]
    pub const fn permissions(&self) -> u8 {
        self.kind.permissions()
    }

    pub(crate) const fn prev(&self) -> Option<u64> {
        self.prev
    }

    pub(crate) const fn next(&self) -> Option<u64> {
        self.next
    }

    pub(crate) fn set_prev(&mut self, prev: Option<u64>) {
        self.prev = prev;
    }

    pub(crate) fn set_next(&mut self, next: Option<u64>) {
        self.next = next;
    }
}

/// Receipt of a successful allocation.
///
/// The offset names the first payload byte; combined with the session's
/// base address it is a device address. The identifier is the only handle
/// that frees the region again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// Identifier of the new region.
    pub id: RegionId,
    /// Payload offset inside the managed range.
    pub offset: u64,
}

/// Round `value` up to `align` (a power of two). `None` on overflow.
pub(crate) fn align_up(value: u64, align: u64) -> Option<u64> {
    debug_assert!(align.is_power_of_two());
    value.checked_add(align - 1).map(|v| v & !(align - 1))
}

/// Round `value` down to `align` (a power of two).
pub(crate) fn align_down(value: u64, align: u64) -> u64 {
    debug_assert!(align.is_power_of_two());
    value & !(align - 1)
}

/// Validate a requested alignment and raise it to the fabric minimum.
pub(crate) fn effective_alignment(requested: u64) -> crate::Result<u64> {
    if requested == 0 {
        return Ok(MIN_ALIGN);
    }
    if !requested.is_power_of_two() {
        return Err(crate::DevMemError::InvalidAlignment { requested });
    }
    Ok(requested.max(MIN_ALIGN))
}
