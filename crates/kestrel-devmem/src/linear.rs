//! Single-direction first-fit allocator.
//!
//! Manages one contiguous range for a single growth direction; the code
//! region uses it. First-fit over the ascending free list rather than
//! best-fit: O(n), deterministic, and kernels are few and long-lived so
//! fragmentation pressure here is low.

use tracing::{debug, trace};

use crate::directory;
use crate::error::{DevMemError, Result};
use crate::freelist::{spans_tile_range, FreePool, RegionSet};
use crate::region::{align_up, effective_alignment, Allocation, RegionId, RegionKind, RegionRecord};

/// First-fit allocator over one contiguous range.
#[derive(Debug, Clone)]
pub struct LinearAllocator {
    base: u64,
    size: u64,
    pool: FreePool,
    regions: RegionSet,
}

impl LinearAllocator {
    /// Create an allocator managing `[base, base + size)`, initially all
    /// free.
    ///
    /// # Errors
    ///
    /// Returns [`DevMemError::RangeOverflow`] if the range end overflows
    /// the offset space.
    pub fn new(base: u64, size: u64) -> Result<Self> {
        if base.checked_add(size).is_none() {
            return Err(DevMemError::RangeOverflow { base, size });
        }
        Ok(Self {
            base,
            size,
            pool: FreePool::new(base, size),
            regions: RegionSet::new(),
        })
    }

    /// Base offset of the managed range.
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Size of the managed range in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Allocate a `kind` region of `size` payload bytes.
    ///
    /// The payload start is aligned to `align` (raised silently to the
    /// fabric minimum); any padding needed at the chosen free entry is
    /// folded into the region's span so it returns to the pool on free.
    ///
    /// # Errors
    ///
    /// [`DevMemError::MemoryAllocation`] if no free entry can hold the
    /// metadata footprint, payload, and padding; [`DevMemError::ZeroSizeRegion`]
    /// for a zero-byte payload; [`DevMemError::InvalidAlignment`] for a
    /// non-power-of-two alignment.
    pub fn allocate(&mut self, kind: RegionKind, size: u64, align: u64) -> Result<Allocation> {
        let align = effective_alignment(align)?;
        if size == 0 {
            return Err(DevMemError::ZeroSizeRegion { kind });
        }
        let footprint = kind.footprint();

        let fit = self.pool.iter().find_map(|(block_base, block_size)| {
            let payload = align_up(block_base.checked_add(footprint)?, align)?;
            let span_end = payload.checked_add(size)?;
            (span_end <= block_base + block_size).then_some((block_base, payload, span_end))
        });
        let Some((span_start, payload, span_end)) = fit else {
            debug!(
                kind = %kind,
                size,
                align,
                free = self.pool.total(),
                "allocation failed: no fitting free span"
            );
            return Err(DevMemError::memory_allocation(kind, size, align, self.pool.total()));
        };

        let span_len = span_end - span_start;
        self.pool.take_span(span_start, span_len);
        let record = directory::create(kind, payload, size)?.with_span(span_start, span_len);
        let id = record.id();
        self.regions.insert(record);
        trace!(%id, %kind, offset = payload, size, "allocated");
        Ok(Allocation { id, offset: payload })
    }

    /// Register a reservation the loader already placed at `offset`.
    ///
    /// The span `[offset - footprint, offset + size)` must lie inside one
    /// existing free entry. Used once at bring-up, before ordinary
    /// allocation traffic.
    ///
    /// # Errors
    ///
    /// [`DevMemError::EmplaceOutOfRange`] if the span falls outside the
    /// managed range, [`DevMemError::EmplaceOverlap`] if it collides with
    /// live regions, [`DevMemError::ZeroSizeRegion`] for a zero-byte
    /// payload.
    pub fn emplace(&mut self, kind: RegionKind, offset: u64, size: u64) -> Result<Allocation> {
        if size == 0 {
            return Err(DevMemError::ZeroSizeRegion { kind });
        }
        let footprint = kind.footprint();
        let span_start = offset
            .checked_sub(footprint)
            .ok_or_else(|| DevMemError::emplace_out_of_range(offset, size))?;
        let span_len = footprint + size;
        let span_end = span_start
            .checked_add(span_len)
            .ok_or_else(|| DevMemError::emplace_out_of_range(offset, size))?;
        if span_start < self.base || span_end > self.base + self.size {
            return Err(DevMemError::emplace_out_of_range(offset, size));
        }
        if !self.pool.take_span(span_start, span_len) {
            return Err(DevMemError::emplace_overlap(offset, size));
        }

        let record = directory::create(kind, offset, size)?;
        let id = record.id();
        self.regions.insert(record);
        debug!(%id, %kind, offset, size, "emplaced reservation");
        Ok(Allocation { id, offset })
    }

    /// Free the region named by `id`, returning its full span to the pool
    /// and merging with adjacent free entries.
    ///
    /// # Errors
    ///
    /// [`DevMemError::UnknownRegion`] if no live region has that
    /// identifier.
    pub fn free(&mut self, id: RegionId) -> Result<()> {
        let record = self
            .regions
            .remove_by_id(id)
            .ok_or_else(|| DevMemError::unknown_region(id))?;
        self.pool.insert(record.span_start(), record.total_size());
        trace!(%id, kind = %record.kind(), "freed");
        Ok(())
    }

    /// Sum of all free entries.
    #[must_use]
    pub fn free_memory(&self) -> u64 {
        self.pool.total()
    }

    /// Number of free entries (fragmentation gauge).
    #[must_use]
    pub fn free_fragments(&self) -> usize {
        self.pool.len()
    }

    /// Number of live regions.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// True if `id` names a live region in this allocator.
    #[must_use]
    pub fn contains(&self, id: RegionId) -> bool {
        self.regions.contains_id(id)
    }

    /// The live region named by `id`, if any.
    #[must_use]
    pub fn get(&self, id: RegionId) -> Option<&RegionRecord> {
        self.regions.get_by_id(id)
    }

    /// Live regions in ascending address order.
    pub fn regions(&self) -> impl Iterator<Item = &RegionRecord> {
        self.regions.iter()
    }

    /// Recompute every structural invariant. Intended for tests and debug
    /// builds, not production hot paths.
    ///
    /// Checks: free and allocated spans exactly tile the managed range
    /// (no gap, no overlap), the free list is maximally coalesced, and
    /// the allocated chain's back-references match address order.
    #[must_use]
    pub fn sanity_check(&self) -> bool {
        if self.pool.total() + self.regions.total_spans() != self.size {
            tracing::error!(base = self.base, "free + allocated bytes do not cover the range");
            return false;
        }
        if !self.pool.coalesced() {
            tracing::error!(base = self.base, "free list not maximally coalesced");
            return false;
        }
        if !self.regions.chain_consistent() {
            tracing::error!(base = self.base, "allocated chain inconsistent");
            return false;
        }
        let mut spans: Vec<(u64, u64)> = self.pool.iter().collect();
        spans.extend(self.regions.iter().map(|r| (r.span_start(), r.total_size())));
        if !spans_tile_range(self.base, self.size, spans) {
            tracing::error!(base = self.base, "regions do not tile the managed range");
            return false;
        }
        true
    }

    /// Free spans in ascending base order, as `(base, size)` pairs.
    pub fn free_spans(&self) -> impl DoubleEndedIterator<Item = (u64, u64)> + '_ {
        self.pool.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::MIN_ALIGN;

    const CODE_FP: u64 = RegionKind::Code.footprint();

    fn alloc_over_100_200() -> LinearAllocator {
        LinearAllocator::new(100, 100).unwrap()
    }

    #[test]
    fn allocate_then_free_restores_range() {
        let mut alloc = alloc_over_100_200();
        let a = alloc.allocate(RegionKind::Code, 10, 0).unwrap();
        assert_eq!(a.offset, 100 + CODE_FP);
        assert_eq!(alloc.free_memory(), 100 - (CODE_FP + 10));
        assert_eq!(
            alloc.free_spans().collect::<Vec<_>>(),
            vec![(100 + CODE_FP + 10, 100 - (CODE_FP + 10))]
        );
        assert!(alloc.sanity_check());

        alloc.free(a.id).unwrap();
        assert_eq!(alloc.free_memory(), 100);
        assert_eq!(alloc.free_spans().collect::<Vec<_>>(), vec![(100, 100)]);
        assert!(alloc.sanity_check());
    }

    #[test]
    fn first_fit_prefers_lowest_entry() {
        let mut alloc = LinearAllocator::new(0, 1024).unwrap();
        let a = alloc.allocate(RegionKind::Code, 64, 0).unwrap();
        let b = alloc.allocate(RegionKind::Code, 64, 0).unwrap();
        let _c = alloc.allocate(RegionKind::Code, 64, 0).unwrap();
        alloc.free(a.id).unwrap();
        alloc.free(b.id).unwrap();
        // Freed [0, 256) is one coalesced hole below c; the next request
        // must land back at its bottom.
        let d = alloc.allocate(RegionKind::Code, 8, 0).unwrap();
        assert_eq!(d.offset, CODE_FP);
        assert!(alloc.sanity_check());
    }

    #[test]
    fn alignment_pads_payload_not_metadata() {
        let mut alloc = LinearAllocator::new(0, 4096).unwrap();
        let a = alloc.allocate(RegionKind::Constant, 100, 256).unwrap();
        assert_eq!(a.offset % 256, 0);
        let rec = alloc.get(a.id).unwrap();
        assert_eq!(rec.metadata_base(), a.offset - RegionKind::Constant.footprint());
        // Padding is part of the span, so freeing leaks nothing.
        alloc.free(a.id).unwrap();
        assert_eq!(alloc.free_memory(), 4096);
        assert_eq!(alloc.free_fragments(), 1);
    }

    #[test]
    fn sub_minimum_alignment_is_raised() {
        let mut alloc = LinearAllocator::new(0, 1024).unwrap();
        let a = alloc.allocate(RegionKind::Code, 10, 1).unwrap();
        assert_eq!(a.offset % MIN_ALIGN, 0);
    }

    #[test]
    fn allocation_failure_reports_free_bytes() {
        let mut alloc = alloc_over_100_200();
        let err = alloc.allocate(RegionKind::Code, 1000, 0).unwrap_err();
        assert_eq!(
            err,
            DevMemError::MemoryAllocation {
                kind: RegionKind::Code,
                size: 1000,
                align: MIN_ALIGN,
                free_bytes: 100,
            }
        );
    }

    #[test]
    fn free_unknown_id_fails() {
        let mut alloc = alloc_over_100_200();
        let a = alloc.allocate(RegionKind::Code, 10, 0).unwrap();
        alloc.free(a.id).unwrap();
        assert_eq!(alloc.free(a.id).unwrap_err(), DevMemError::UnknownRegion { id: a.id });
    }

    #[test]
    fn middle_left_right_free_coalesces_stepwise() {
        let mut alloc = LinearAllocator::new(0, 4096).unwrap();
        let left = alloc.allocate(RegionKind::Code, 20, 0).unwrap();
        let middle = alloc.allocate(RegionKind::Code, 30, 0).unwrap();
        let right = alloc.allocate(RegionKind::Code, 40, 0).unwrap();
        let tail = alloc.free_memory();

        alloc.free(middle.id).unwrap();
        // The hole matches the middle region's span exactly.
        assert_eq!(
            alloc.free_spans().next().unwrap(),
            (middle.offset - CODE_FP, CODE_FP + 30)
        );
        assert_eq!(alloc.free_fragments(), 2); // middle hole + tail

        alloc.free(left.id).unwrap();
        assert_eq!(alloc.free_fragments(), 2); // left merged into middle

        alloc.free(right.id).unwrap();
        assert_eq!(alloc.free_fragments(), 1); // everything coalesced
        assert_eq!(alloc.free_memory(), tail + 3 * CODE_FP + 20 + 30 + 40);
        assert!(alloc.sanity_check());
    }

    #[test]
    fn emplace_carves_a_reservation() {
        let mut alloc = LinearAllocator::new(0, 8192).unwrap();
        let fw = alloc.emplace(RegionKind::Code, 1024, 512).unwrap();
        assert_eq!(fw.offset, 1024);
        assert_eq!(alloc.free_memory(), 8192 - (CODE_FP + 512));
        assert_eq!(alloc.free_fragments(), 2);
        assert!(alloc.sanity_check());

        // The carved span is gone; overlapping emplace must fail.
        let err = alloc.emplace(RegionKind::Code, 1024 + 256, 64).unwrap_err();
        assert_eq!(err, DevMemError::EmplaceOverlap { offset: 1280, size: 64 });
    }

    #[test]
    fn emplace_rejects_out_of_range() {
        let mut alloc = LinearAllocator::new(4096, 4096).unwrap();
        // Span start would land below the range (metadata underflow).
        let err = alloc.emplace(RegionKind::Code, 4096, 64).unwrap_err();
        assert_eq!(err, DevMemError::EmplaceOutOfRange { offset: 4096, size: 64 });
        // Payload end past the range.
        let err = alloc.emplace(RegionKind::Code, 8000, 1024).unwrap_err();
        assert_eq!(err, DevMemError::EmplaceOutOfRange { offset: 8000, size: 1024 });
    }

    #[test]
    fn exact_fit_removes_free_entry() {
        let mut alloc = LinearAllocator::new(0, CODE_FP + 32).unwrap();
        let a = alloc.allocate(RegionKind::Code, 32, 0).unwrap();
        assert_eq!(alloc.free_memory(), 0);
        assert_eq!(alloc.free_fragments(), 0);
        assert!(alloc.sanity_check());
        alloc.free(a.id).unwrap();
        assert_eq!(alloc.free_memory(), CODE_FP + 32);
    }
}
