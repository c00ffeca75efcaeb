//! State snapshots of the allocators, for diagnostics and regression
//! baselines.
//!
//! Two renderings of the same snapshot: `Display` for eyeballs, JSON for
//! tooling. Neither text format is load-bearing; the snapshot fields are.

use std::fmt;

use kestrel_chip::prot;
use serde::Serialize;

use crate::bidir::{BidirAllocator, Direction};
use crate::linear::LinearAllocator;
use crate::region::{RegionKind, RegionRecord};

/// One free span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FreeEntry {
    /// Base offset of the span.
    pub base: u64,
    /// Span size in bytes.
    pub size: u64,
}

/// One live allocated region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionEntry {
    /// Region identifier.
    pub id: u64,
    /// Region kind.
    pub kind: RegionKind,
    /// Payload base offset.
    pub base: u64,
    /// Payload size in bytes.
    pub size: u64,
    /// Alignment padding folded into the span.
    pub padding: u64,
    /// Access mask as an `rwx` triple.
    pub permissions: String,
}

impl RegionEntry {
    fn of(record: &RegionRecord) -> Self {
        Self {
            id: record.id().raw(),
            kind: record.kind(),
            base: record.base(),
            size: record.size(),
            padding: record.padding(),
            permissions: prot::describe(record.permissions()),
        }
    }
}

/// Snapshot of one allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocatorState {
    /// Base offset of the managed range.
    pub base: u64,
    /// Size of the managed range in bytes.
    pub size: u64,
    /// Free bytes (fragmented).
    pub free_bytes: u64,
    /// Free spans in ascending base order.
    pub free: Vec<FreeEntry>,
    /// Front-allocated regions in ascending address order. For a
    /// single-direction allocator this is the only set.
    pub front: Vec<RegionEntry>,
    /// Back-allocated regions in ascending address order. Empty for a
    /// single-direction allocator.
    pub back: Vec<RegionEntry>,
}

impl AllocatorState {
    pub(crate) fn of_linear(alloc: &LinearAllocator) -> Self {
        Self {
            base: alloc.base(),
            size: alloc.size(),
            free_bytes: alloc.free_memory(),
            free: alloc
                .free_spans()
                .map(|(base, size)| FreeEntry { base, size })
                .collect(),
            front: alloc.regions().map(RegionEntry::of).collect(),
            back: Vec::new(),
        }
    }

    pub(crate) fn of_bidir(alloc: &BidirAllocator) -> Self {
        Self {
            base: alloc.base(),
            size: alloc.size(),
            free_bytes: alloc.free_memory(),
            free: alloc
                .free_spans()
                .map(|(base, size)| FreeEntry { base, size })
                .collect(),
            front: alloc.regions(Direction::Front).map(RegionEntry::of).collect(),
            back: alloc.regions(Direction::Back).map(RegionEntry::of).collect(),
        }
    }
}

/// Snapshot of the whole manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerState {
    /// Code-region allocator.
    pub code: AllocatorState,
    /// Data-region allocator.
    pub data: AllocatorState,
}

impl ManagerState {
    /// Machine-readable rendering.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` serialisation failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn write_allocator(f: &mut fmt::Formatter<'_>, name: &str, state: &AllocatorState) -> fmt::Result {
    writeln!(
        f,
        "{name} [{:#x}, {:#x}) — {} bytes free in {} spans",
        state.base,
        state.base + state.size,
        state.free_bytes,
        state.free.len()
    )?;
    for entry in state.front.iter().chain(&state.back) {
        writeln!(
            f,
            "  #{:<6} {:<12} {} {:#012x} +{:<10} pad {}",
            entry.id, entry.kind, entry.permissions, entry.base, entry.size, entry.padding
        )?;
    }
    for span in &state.free {
        writeln!(f, "  free   {:#012x} +{}", span.base, span.size)?;
    }
    Ok(())
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_allocator(f, "code", &self.code)?;
        write_allocator(f, "data", &self.data)
    }
}
