//! Protection-bit encodings for carved memory regions.
//!
//! The K1's memory-protection fabric tags each carved region with an
//! access mask checked on every mesh-side and DMA access. The encodings
//! match the PMP-style R/W/X ordering of the RISC-V privileged spec, so
//! firmware can forward them into PMP configuration words unchanged.

/// Region is readable.
pub const READ: u8 = 1 << 0;
/// Region is writable.
pub const WRITE: u8 = 1 << 1;
/// Region is executable by the mesh cores.
pub const EXEC: u8 = 1 << 2;

/// No access. Used for free space and poisoned regions.
pub const NONE: u8 = 0;
/// Read + execute — code regions.
pub const RX: u8 = READ | EXEC;
/// Read only — constant regions.
pub const RO: u8 = READ;
/// Read + write — scratch and logging regions.
pub const RW: u8 = READ | WRITE;

/// Render an access mask as the conventional `rwx` triple.
#[must_use]
pub fn describe(mask: u8) -> String {
    let mut s = String::with_capacity(3);
    s.push(if mask & READ != 0 { 'r' } else { '-' });
    s.push(if mask & WRITE != 0 { 'w' } else { '-' });
    s.push(if mask & EXEC != 0 { 'x' } else { '-' });
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_do_not_overlap() {
        assert_eq!(READ & WRITE, 0);
        assert_eq!(READ & EXEC, 0);
        assert_eq!(WRITE & EXEC, 0);
    }

    #[test]
    fn describe_renders_triples() {
        assert_eq!(describe(NONE), "---");
        assert_eq!(describe(RX), "r-x");
        assert_eq!(describe(RO), "r--");
        assert_eq!(describe(RW), "rw-");
    }
}
