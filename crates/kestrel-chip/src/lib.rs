//! Silicon model for the Kestrel K1 RISC-V inference accelerator.
//!
//! This crate has **no dependencies** and **no hardware access** — it is a
//! pure model of the K1 as seen from the host: the device-side DDR memory
//! map, the bus alignment rules, and the protection-bit encodings the
//! memory-protection fabric applies to carved memory regions.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`memmap`] | Device DDR window, firmware reservation, code/data carve |
//! | [`prot`] | Protection-bit encodings (read / write / execute) |
//!
//! Everything the host runtime needs to reason about device memory without
//! touching the device lives here; anything that issues bus traffic lives
//! in the runtime crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod memmap;
pub mod prot;

pub use memmap::DeviceMemoryLayout;
