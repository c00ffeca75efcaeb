//! Device memory manager for the Kestrel K1 accelerator.
//!
//! The host runtime carves the K1's DDR window into a code region and a
//! data region at session start. This crate owns that carve: a pair of
//! region allocators plus the metadata model they operate on.
//!
//! ```text
//! base          base + code_size                      base + code + data
//!  ┌──────────────┬──────────────────────────────────────────┐
//!  │ code region  │                data region               │
//!  │ (first-fit)  │  constants ──▶     free    ◀── scratch   │
//!  └──────────────┴──────────────────────────────────────────┘
//! ```
//!
//! Constants (model weights, fixed for a loaded program) grow from the
//! front of the data region; placeholders (per-inference scratch) grow
//! from the back, so the churn-heavy traffic stays physically segregated
//! and fragmentation is confined to the top half.
//!
//! # Quick start
//!
//! ```
//! use kestrel_devmem::MemoryManager;
//!
//! # fn main() -> kestrel_devmem::Result<()> {
//! let mut mem = MemoryManager::new(0x4000_0000, 0x100_0000, 0x400_0000)?;
//!
//! let weights = mem.malloc_constant(1 << 20, 64)?;
//! let scratch = mem.malloc_placeholder(1 << 16, 64)?;
//! assert!(mem.buffer_exists(weights.id));
//!
//! mem.free_data(scratch.id)?;
//! mem.free_data(weights.id)?;
//! assert!(mem.sanity_check());
//! # Ok(())
//! # }
//! ```
//!
//! # Contract
//!
//! One manager per device session, accessed under the caller's own
//! serialisation discipline — no operation blocks, suspends, or performs
//! I/O, and none is internally synchronised. Identifiers are the only
//! values meant to cross into the rest of the system; they are lookup
//! keys, not capabilities.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod bidir;
pub mod directory;
mod error;
mod freelist;
mod linear;
mod manager;
mod region;
mod state;

pub use bidir::{BidirAllocator, Direction};
pub use error::{DevMemError, Result};
pub use linear::LinearAllocator;
pub use manager::MemoryManager;
pub use region::{Allocation, RegionId, RegionKind, RegionRecord, MIN_ALIGN};
pub use state::{AllocatorState, FreeEntry, ManagerState, RegionEntry};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        Allocation, BidirAllocator, DevMemError, Direction, LinearAllocator, ManagerState,
        MemoryManager, RegionId, RegionKind, Result,
    };
}
