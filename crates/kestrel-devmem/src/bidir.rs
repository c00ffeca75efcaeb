//! Bidirectional first-fit allocator.
//!
//! One contiguous range, one shared free pool, two independent allocated
//! sets. Front allocations fill from the low end, back allocations
//! accumulate downward from the high end:
//!
//! ```text
//! base                                                      base + size
//!  │ constants ─────▶            free              ◀──── placeholders │
//!  └────────────────┴───────────────────────────────┴─────────────────┘
//! ```
//!
//! The data region uses it with constants (load-time, session-lifetime)
//! in front and placeholders (per-inference scratch) in back, so the
//! churn-heavy traffic stays physically segregated at the top and the
//! front's free-list entry count stays low and stable.

use tracing::{debug, trace};

use crate::directory;
use crate::error::{DevMemError, Result};
use crate::freelist::{spans_tile_range, FreePool, RegionSet};
use crate::region::{
    align_down, align_up, effective_alignment, Allocation, RegionId, RegionKind, RegionRecord,
};

/// Which end of the range an allocation grows from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Low-address end; long-lived allocations.
    Front,
    /// High-address end; short-lived allocations.
    Back,
}

/// First-fit allocator serving two growth directions from one free pool.
#[derive(Debug, Clone)]
pub struct BidirAllocator {
    base: u64,
    size: u64,
    pool: FreePool,
    front: RegionSet,
    back: RegionSet,
}

impl BidirAllocator {
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
            front: RegionSet::new(),
            back: RegionSet::new(),
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

    /// Allocate from the low-address end.
    ///
    /// Scans the free list ascending and takes the first entry that can
    /// hold footprint, payload, and alignment padding.
    ///
    /// # Errors
    ///
    /// As [`LinearAllocator::allocate`](crate::LinearAllocator::allocate).
    pub fn allocate_front(&mut self, kind: RegionKind, size: u64, align: u64) -> Result<Allocation> {
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
            return Err(self.exhausted(Direction::Front, kind, size, align));
        };

        let span_len = span_end - span_start;
        self.pool.take_span(span_start, span_len);
        let record = directory::create(kind, payload, size)?.with_span(span_start, span_len);
        let id = record.id();
        self.front.insert(record);
        trace!(%id, %kind, offset = payload, size, "allocated front");
        Ok(Allocation { id, offset: payload })
    }

    /// Allocate from the high-address end.
    ///
    /// Scans the free list descending and aligns the payload downward
    /// from the chosen entry's end, so back allocations stack downward
    /// from the top of the range.
    ///
    /// # Errors
    ///
    /// As [`LinearAllocator::allocate`](crate::LinearAllocator::allocate).
    pub fn allocate_back(&mut self, kind: RegionKind, size: u64, align: u64) -> Result<Allocation> {
        let align = effective_alignment(align)?;
        if size == 0 {
            return Err(DevMemError::ZeroSizeRegion { kind });
        }
        let footprint = kind.footprint();

        let fit = self.pool.iter().rev().find_map(|(block_base, block_size)| {
            let block_end = block_base + block_size;
            let payload = align_down(block_end.checked_sub(size)?, align);
            let span_start = payload.checked_sub(footprint)?;
            (span_start >= block_base).then_some((span_start, payload, block_end))
        });
        let Some((span_start, payload, span_end)) = fit else {
            return Err(self.exhausted(Direction::Back, kind, size, align));
        };

        let span_len = span_end - span_start;
        self.pool.take_span(span_start, span_len);
        let record = directory::create(kind, payload, size)?.with_span(span_start, span_len);
        let id = record.id();
        self.back.insert(record);
        trace!(%id, %kind, offset = payload, size, "allocated back");
        Ok(Allocation { id, offset: payload })
    }

    /// Free the region named by `id`, whichever direction owns it, and
    /// merge its span back into the shared pool.
    ///
    /// # Errors
    ///
    /// [`DevMemError::UnknownRegion`] if neither set has a live region
    /// with that identifier.
    pub fn free(&mut self, id: RegionId) -> Result<()> {
        let record = self
            .front
            .remove_by_id(id)
            .or_else(|| self.back.remove_by_id(id))
            .ok_or_else(|| DevMemError::unknown_region(id))?;
        self.pool.insert(record.span_start(), record.total_size());
        trace!(%id, kind = %record.kind(), "freed");
        Ok(())
    }

    /// Sum of all free entries in the shared pool.
    #[must_use]
    pub fn free_memory(&self) -> u64 {
        self.pool.total()
    }

    /// Number of free entries (fragmentation gauge).
    #[must_use]
    pub fn free_fragments(&self) -> usize {
        self.pool.len()
    }

    /// Number of live regions in `direction`.
    #[must_use]
    pub fn region_count(&self, direction: Direction) -> usize {
        self.set(direction).len()
    }

    /// True if `id` names a live region in either direction.
    #[must_use]
    pub fn contains(&self, id: RegionId) -> bool {
        self.front.contains_id(id) || self.back.contains_id(id)
    }

    /// The live region named by `id`, if any, searching front then back.
    #[must_use]
    pub fn get(&self, id: RegionId) -> Option<&RegionRecord> {
        self.front.get_by_id(id).or_else(|| self.back.get_by_id(id))
    }

    /// Live regions of `direction` in ascending address order.
    pub fn regions(&self, direction: Direction) -> impl Iterator<Item = &RegionRecord> {
        self.set(direction).iter()
    }

    /// Recompute every structural invariant. Intended for tests and debug
    /// builds, not production hot paths.
    ///
    /// On top of the single-direction checks, verifies that no front and
    /// back region overlap and that each direction's back-reference chain
    /// is independently consistent.
    #[must_use]
    pub fn sanity_check(&self) -> bool {
        let covered = self.pool.total() + self.front.total_spans() + self.back.total_spans();
        if covered != self.size {
            tracing::error!(base = self.base, "free + allocated bytes do not cover the range");
            return false;
        }
        if !self.pool.coalesced() {
            tracing::error!(base = self.base, "free list not maximally coalesced");
            return false;
        }
        if !self.front.chain_consistent() || !self.back.chain_consistent() {
            tracing::error!(base = self.base, "allocated chain inconsistent");
            return false;
        }
        for record in self.front.iter() {
            if self.back.contains_id(record.id()) {
                tracing::error!(base = self.base, id = %record.id(), "region in both directions");
                return false;
            }
        }
        let mut spans: Vec<(u64, u64)> = self.pool.iter().collect();
        spans.extend(self.front.iter().map(|r| (r.span_start(), r.total_size())));
        spans.extend(self.back.iter().map(|r| (r.span_start(), r.total_size())));
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

    const fn set(&self, direction: Direction) -> &RegionSet {
        match direction {
            Direction::Front => &self.front,
            Direction::Back => &self.back,
        }
    }

    fn exhausted(&self, direction: Direction, kind: RegionKind, size: u64, align: u64) -> DevMemError {
        debug!(
            ?direction,
            kind = %kind,
            size,
            align,
            free = self.pool.total(),
            "allocation failed: no fitting free span"
        );
        DevMemError::memory_allocation(kind, size, align, self.pool.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONST_FP: u64 = RegionKind::Constant.footprint();
    const SCRATCH_FP: u64 = RegionKind::Placeholder.footprint();

    #[test]
    fn front_and_back_fill_opposite_ends() {
        let mut alloc = BidirAllocator::new(0, 4096).unwrap();
        let front = alloc.allocate_front(RegionKind::Constant, 100, 0).unwrap();
        let back = alloc.allocate_back(RegionKind::Placeholder, 100, 0).unwrap();
        assert_eq!(front.offset, CONST_FP);
        // Back payload ends flush with the top of the range.
        assert_eq!(back.offset + 100, 4096);
        assert!(alloc.sanity_check());
    }

    #[test]
    fn equal_front_back_then_free_restores_all() {
        const D: u64 = 1 << 20;
        let mut alloc = BidirAllocator::new(0, D).unwrap();
        let front = alloc.allocate_front(RegionKind::Constant, 256, 0).unwrap();
        let back = alloc.allocate_back(RegionKind::Placeholder, 256, 0).unwrap();
        assert_eq!(
            alloc.free_memory(),
            D - (CONST_FP + 256) - (SCRATCH_FP + 256)
        );

        // Freeing in either order restores the whole range.
        alloc.free(back.id).unwrap();
        alloc.free(front.id).unwrap();
        assert_eq!(alloc.free_memory(), D);
        assert_eq!(alloc.free_fragments(), 1);

        let front = alloc.allocate_front(RegionKind::Constant, 256, 0).unwrap();
        let back = alloc.allocate_back(RegionKind::Placeholder, 256, 0).unwrap();
        alloc.free(front.id).unwrap();
        alloc.free(back.id).unwrap();
        assert_eq!(alloc.free_memory(), D);
        assert!(alloc.sanity_check());
    }

    #[test]
    fn back_allocations_stack_downward() {
        let mut alloc = BidirAllocator::new(0, 8192).unwrap();
        let a = alloc.allocate_back(RegionKind::Placeholder, 100, 0).unwrap();
        let b = alloc.allocate_back(RegionKind::Placeholder, 100, 0).unwrap();
        let c = alloc.allocate_back(RegionKind::Placeholder, 100, 0).unwrap();
        assert!(b.offset < a.offset);
        assert!(c.offset < b.offset);
        assert!(alloc.sanity_check());
    }

    #[test]
    fn back_alignment_rounds_payload_down() {
        let mut alloc = BidirAllocator::new(0, 5000).unwrap();
        let a = alloc.allocate_back(RegionKind::Placeholder, 100, 256).unwrap();
        assert_eq!(a.offset % 256, 0);
        let rec = alloc.get(a.id).unwrap();
        // Top padding belongs to the span; nothing leaks on free.
        assert_eq!(rec.end_offset(), 5000);
        alloc.free(a.id).unwrap();
        assert_eq!(alloc.free_memory(), 5000);
        assert_eq!(alloc.free_fragments(), 1);
    }

    #[test]
    fn directions_are_independent_sets() {
        let mut alloc = BidirAllocator::new(0, 4096).unwrap();
        let front = alloc.allocate_front(RegionKind::Constant, 64, 0).unwrap();
        let back = alloc.allocate_back(RegionKind::Placeholder, 64, 0).unwrap();
        assert_eq!(alloc.region_count(Direction::Front), 1);
        assert_eq!(alloc.region_count(Direction::Back), 1);
        assert!(alloc.regions(Direction::Front).all(|r| r.id() == front.id));
        assert!(alloc.regions(Direction::Back).all(|r| r.id() == back.id));

        let back_before: Vec<RegionRecord> = alloc.regions(Direction::Back).cloned().collect();
        alloc.free(front.id).unwrap();
        let back_after: Vec<RegionRecord> = alloc.regions(Direction::Back).cloned().collect();
        assert_eq!(back_before, back_after);
        assert!(alloc.sanity_check());
    }

    #[test]
    fn free_searches_front_then_back() {
        let mut alloc = BidirAllocator::new(0, 4096).unwrap();
        let back = alloc.allocate_back(RegionKind::Placeholder, 64, 0).unwrap();
        alloc.free(back.id).unwrap();
        assert_eq!(
            alloc.free(back.id).unwrap_err(),
            DevMemError::UnknownRegion { id: back.id }
        );
    }

    #[test]
    fn shared_pool_exhausts_for_both_directions() {
        let mut alloc = BidirAllocator::new(0, 1024).unwrap();
        let _front = alloc.allocate_front(RegionKind::Constant, 900, 0).unwrap();
        assert!(matches!(
            alloc.allocate_back(RegionKind::Placeholder, 900, 0),
            Err(DevMemError::MemoryAllocation { .. })
        ));
        assert!(matches!(
            alloc.allocate_front(RegionKind::Constant, 900, 0),
            Err(DevMemError::MemoryAllocation { .. })
        ));
    }

    #[test]
    fn back_fills_holes_nearest_the_top() {
        let mut alloc = BidirAllocator::new(0, 8192).unwrap();
        let a = alloc.allocate_back(RegionKind::Placeholder, 500, 0).unwrap();
        let b = alloc.allocate_back(RegionKind::Placeholder, 500, 0).unwrap();
        alloc.free(a.id).unwrap();
        // The hole at the very top is preferred over the big middle span.
        let c = alloc.allocate_back(RegionKind::Placeholder, 100, 0).unwrap();
        assert!(c.offset > b.offset);
        assert_eq!(c.offset + 100, 8192);
        assert!(alloc.sanity_check());
    }

    #[test]
    fn logging_regions_front_allocate() {
        let mut alloc = BidirAllocator::new(0, 4096).unwrap();
        let log = alloc.allocate_front(RegionKind::Logging, 512, 64).unwrap();
        assert_eq!(log.offset % 64, 0);
        let rec = alloc.get(log.id).unwrap();
        assert_eq!(rec.kind(), RegionKind::Logging);
        assert_eq!(rec.metadata_base(), log.offset - RegionKind::Logging.footprint());
    }
}
