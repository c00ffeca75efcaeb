//! Device memory manager façade.
//!
//! The single entry point the rest of the runtime uses. Owns one
//! [`LinearAllocator`] for the code region and one [`BidirAllocator`] for
//! the data region, both carved from one base address at construction:
//!
//! ```text
//! base            base + code_size                 base + code + data
//!  ┌───────────────┬────────────────────────────────────────┐
//!  │  code region  │               data region              │
//!  └───────────────┴────────────────────────────────────────┘
//!     kernels         constants ─▶      free      ◀─ scratch
//! ```
//!
//! There is no torn-down-but-reusable state: the manager is built once
//! per device session and dropped when the session ends.

use tracing::{debug, info};

use crate::bidir::{BidirAllocator, Direction};
use crate::error::Result;
use crate::linear::LinearAllocator;
use crate::region::{Allocation, RegionId, RegionKind, RegionRecord};
use crate::state::{AllocatorState, ManagerState};

/// Owner of one device session's memory carve.
#[derive(Debug)]
pub struct MemoryManager {
    code: LinearAllocator,
    data: BidirAllocator,
}

impl MemoryManager {
    /// Build a manager over `[base, base + code_size + data_size)`.
    ///
    /// The code allocator spans `[base, base + code_size)`; the data
    /// allocator spans the `data_size` bytes above it.
    ///
    /// # Errors
    ///
    /// Returns [`DevMemError::RangeOverflow`](crate::DevMemError::RangeOverflow)
    /// if the combined carve overflows the offset space.
    pub fn new(base: u64, code_size: u64, data_size: u64) -> Result<Self> {
        let code = LinearAllocator::new(base, code_size)?;
        let data = BidirAllocator::new(base + code_size, data_size)?;
        info!(base, code_size, data_size, "device memory manager initialised");
        Ok(Self { code, data })
    }

    /// Allocate a code region for a compiled kernel.
    ///
    /// # Errors
    ///
    /// See [`LinearAllocator::allocate`].
    pub fn malloc_code(&mut self, size: u64, align: u64) -> Result<Allocation> {
        self.code.allocate(RegionKind::Code, size, align)
    }

    /// Register firmware the loader already placed at `offset` in the
    /// code region. Called once at bring-up, before other allocations.
    ///
    /// # Errors
    ///
    /// See [`LinearAllocator::emplace`].
    pub fn emplace_code(&mut self, offset: u64, size: u64) -> Result<Allocation> {
        debug!(offset, size, "registering resident firmware");
        self.code.emplace(RegionKind::Code, offset, size)
    }

    /// Allocate a constant region (model weights). Front-allocated:
    /// constants live for the whole loaded program.
    ///
    /// # Errors
    ///
    /// See [`BidirAllocator::allocate_front`].
    pub fn malloc_constant(&mut self, size: u64, align: u64) -> Result<Allocation> {
        self.data.allocate_front(RegionKind::Constant, size, align)
    }

    /// Allocate a placeholder region (per-inference scratch).
    /// Back-allocated: allocated and freed every invocation, so the churn
    /// stays at the top of the data region.
    ///
    /// # Errors
    ///
    /// See [`BidirAllocator::allocate_back`].
    pub fn malloc_placeholder(&mut self, size: u64, align: u64) -> Result<Allocation> {
        self.data.allocate_back(RegionKind::Placeholder, size, align)
    }

    /// Allocate a trace ring buffer for the device-side logging service.
    /// Front-allocated: the ring lives for the whole session, like
    /// constants.
    ///
    /// # Errors
    ///
    /// See [`BidirAllocator::allocate_front`].
    pub fn malloc_logging(&mut self, size: u64, align: u64) -> Result<Allocation> {
        self.data.allocate_front(RegionKind::Logging, size, align)
    }

    /// Free a code-region identifier.
    ///
    /// # Errors
    ///
    /// [`DevMemError::UnknownRegion`](crate::DevMemError::UnknownRegion)
    /// if the identifier names no live code region.
    pub fn free_code(&mut self, id: RegionId) -> Result<()> {
        self.code.free(id)
    }

    /// Free a data-region identifier, whichever direction owns it.
    ///
    /// # Errors
    ///
    /// [`DevMemError::UnknownRegion`](crate::DevMemError::UnknownRegion)
    /// if the identifier names no live data region.
    pub fn free_data(&mut self, id: RegionId) -> Result<()> {
        self.data.free(id)
    }

    /// Free bytes across both allocators.
    #[must_use]
    pub fn free_memory(&self) -> u64 {
        self.code.free_memory() + self.data.free_memory()
    }

    /// True if `id` names a live data-region record. The runtime uses
    /// this to validate buffer handles echoed back by device commands.
    #[must_use]
    pub fn buffer_exists(&self, id: RegionId) -> bool {
        self.data.contains(id)
    }

    /// Kind/base/size of the live data region named by `id`, if any.
    #[must_use]
    pub fn region_info(&self, id: RegionId) -> Option<&RegionRecord> {
        self.data.get(id)
    }

    /// Recompute both allocators' invariants.
    #[must_use]
    pub fn sanity_check(&self) -> bool {
        self.code.sanity_check() && self.data.sanity_check()
    }

    /// Snapshot of both allocators' free and allocated entries, for
    /// diagnostics dumps and regression baselines.
    #[must_use]
    pub fn state(&self) -> ManagerState {
        ManagerState {
            code: AllocatorState::of_linear(&self.code),
            data: AllocatorState::of_bidir(&self.data),
        }
    }

    /// The code-region allocator.
    #[must_use]
    pub const fn code_allocator(&self) -> &LinearAllocator {
        &self.code
    }

    /// The data-region allocator.
    #[must_use]
    pub const fn data_allocator(&self) -> &BidirAllocator {
        &self.data
    }
}

impl Drop for MemoryManager {
    fn drop(&mut self) {
        debug!(
            live_code = self.code.region_count(),
            live_front = self.data.region_count(Direction::Front),
            live_back = self.data.region_count(Direction::Back),
            "device memory manager torn down"
        );
    }
}
