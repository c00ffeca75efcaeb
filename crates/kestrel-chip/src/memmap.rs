//! Device-side DDR memory map for the Kestrel K1.
//!
//! The K1 exposes one contiguous LPDDR window to both the RISC-V mesh and
//! the host DMA engines. The boot ROM fixes the carve below; the host
//! memory manager is handed the carve at session start and never derives
//! it on its own.
//!
//! ```text
//! device address
//! 0x40_0000_0000 ┌────────────────────────────┐
//!                │ code region      (512 MB)  │  firmware text + kernels
//!                │   0x10_0000: firmware text │
//! 0x40_2000_0000 ├────────────────────────────┤
//!                │ data region    (15.5 GB)   │  constants grow up,
//!                │                            │  placeholders grow down
//! 0x44_0000_0000 └────────────────────────────┘
//! ```

/// Device DDR window.
pub mod ddr {
    /// Device-side base address of the DDR window.
    pub const BASE: u64 = 0x40_0000_0000;
    /// Window size in bytes.
    pub const SIZE: u64 = 16 * 1024 * 1024 * 1024; // 16 GB
}

/// Boot-ROM carve of the DDR window.
pub mod carve {
    /// Code region size. Holds firmware text and compiled kernels.
    pub const CODE_SIZE: u64 = 512 * 1024 * 1024; // 512 MB
    /// Data region size. Everything above the code region.
    pub const DATA_SIZE: u64 = super::ddr::SIZE - CODE_SIZE;
}

/// Firmware reservation inside the code region.
///
/// The secondary loader places the firmware text before the host runtime
/// attaches, so the memory manager registers it as a pre-existing
/// reservation rather than allocating it.
pub mod fw {
    /// Offset of the firmware text payload from [`super::ddr::BASE`].
    pub const TEXT_OFFSET: u64 = 0x10_0000; // 1 MB in
    /// Maximum firmware text size the loader will place.
    pub const TEXT_MAX: u64 = 4 * 1024 * 1024; // 4 MB
}

/// Alignment rules of the DDR fabric.
pub mod align {
    /// Minimum alignment of any host-visible buffer. The DMA engines
    /// issue word-granular bursts; sub-word buffers fault.
    pub const MIN: u64 = 4;
    /// Mesh cache-line size. Kernels ask for this when they want
    /// line-aligned tensors.
    pub const CACHE_LINE: u64 = 64;
}

/// One session's carve of the DDR window, as handed to the memory manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceMemoryLayout {
    /// Device-side base address of the managed window.
    pub base: u64,
    /// Bytes assigned to the code region, starting at `base`.
    pub code_size: u64,
    /// Bytes assigned to the data region, starting at `base + code_size`.
    pub data_size: u64,
}

impl DeviceMemoryLayout {
    /// The K1 production carve fixed by the boot ROM.
    #[must_use]
    pub const fn k1() -> Self {
        Self {
            base: ddr::BASE,
            code_size: carve::CODE_SIZE,
            data_size: carve::DATA_SIZE,
        }
    }

    /// First address past the managed window.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.base + self.code_size + self.data_size
    }
}
