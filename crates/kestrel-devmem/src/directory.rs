//! Region directory: per-kind sizing and record construction.
//!
//! The one place fresh identifiers are drawn. Allocators never build a
//! [`RegionRecord`] by hand; they describe the payload they carved and the
//! directory stamps kind, permissions, and a process-unique identifier.

use crate::error::{DevMemError, Result};
use crate::region::{next_region_id, RegionKind, RegionRecord};

/// Metadata footprint of `kind`, in bytes.
///
/// Zero for [`RegionKind::Free`], a fixed word-aligned constant for every
/// other kind.
#[must_use]
pub fn footprint(kind: RegionKind) -> u64 {
    kind.footprint()
}

/// Access mask the protection fabric applies to `kind`.
#[must_use]
pub fn permissions(kind: RegionKind) -> u8 {
    kind.permissions()
}

/// Construct a fresh in-use record of `kind` with payload at `base`.
///
/// Assigns the next process-wide identifier. The record's span initially
/// covers exactly the metadata footprint plus the payload; the caller
/// widens it if alignment padding was consumed.
///
/// # Errors
///
/// Returns [`DevMemError::ZeroSizeRegion`] if `size` is zero. Callers
/// guarantee a positive size in practice.
pub fn create(kind: RegionKind, base: u64, size: u64) -> Result<RegionRecord> {
    if size == 0 {
        return Err(DevMemError::ZeroSizeRegion { kind });
    }
    Ok(RegionRecord::new(kind, next_region_id(), base, size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_stamps_fresh_ids() {
        let a = create(RegionKind::Constant, 48, 16).unwrap();
        let b = create(RegionKind::Constant, 112, 16).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.kind(), RegionKind::Constant);
        assert_eq!(a.base(), 48);
        assert_eq!(a.size(), 16);
    }

    #[test]
    fn create_rejects_zero_size() {
        let err = create(RegionKind::Code, 64, 0).unwrap_err();
        assert_eq!(err, DevMemError::ZeroSizeRegion { kind: RegionKind::Code });
    }

    #[test]
    fn footprint_matches_kind() {
        assert_eq!(footprint(RegionKind::Free), 0);
        assert_eq!(footprint(RegionKind::Code), RegionKind::Code.footprint());
        assert_eq!(permissions(RegionKind::Free), 0);
        assert_eq!(permissions(RegionKind::Code), RegionKind::Code.permissions());
    }
}
