//! Session walk-through with state dumps
//!
//! Builds a memory manager over the K1 production carve, registers the
//! resident firmware, loads a small model, and prints the resulting
//! memory state in both human and JSON form.

use kestrel_chip::memmap::{align, fw};
use kestrel_chip::DeviceMemoryLayout;
use kestrel_devmem::{MemoryManager, Result};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter("kestrel_devmem=debug")
        .init();

    println!("🗺️  Kestrel K1 device memory walk-through\n");

    let layout = DeviceMemoryLayout::k1();
    let mut mem = MemoryManager::new(layout.base, layout.code_size, layout.data_size)?;
    println!(
        "Managing [{:#x}, {:#x}) — {} MB",
        layout.base,
        layout.end(),
        (layout.code_size + layout.data_size) >> 20
    );

    // The secondary loader already placed the firmware text; register it.
    let firmware = mem.emplace_code(layout.base + fw::TEXT_OFFSET, 2 << 20)?;
    println!("✅ Firmware resident at {:#x}", firmware.offset);

    // Session-lifetime trace ring for the device logging service.
    let ring = mem.malloc_logging(1 << 20, align::CACHE_LINE)?;
    println!("✅ Trace ring at {:#x}", ring.offset);

    // A small model: one kernel, two weight tensors, one scratch buffer.
    let kernel = mem.malloc_code(48 << 10, align::CACHE_LINE)?;
    let weights_a = mem.malloc_constant(4 << 20, align::CACHE_LINE)?;
    let weights_b = mem.malloc_constant(1 << 20, align::CACHE_LINE)?;
    let scratch = mem.malloc_placeholder(256 << 10, align::CACHE_LINE)?;
    println!(
        "✅ Model loaded: kernel {} / weights {} {} / scratch {}\n",
        kernel.id, weights_a.id, weights_b.id, scratch.id
    );

    let state = mem.state();
    println!("{state}");

    println!("--- JSON ---");
    match state.to_json() {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("serialisation failed: {err}"),
    }

    assert!(mem.sanity_check());
    println!("\n✅ Sanity check passed");

    Ok(())
}
