//! Strand-aware region extension
//!
//! Upstream and downstream follow 5'->3' direction, not raw coordinate
//! direction:
//!
//! | strand  | upstream     | downstream   |
//! |---------|--------------|--------------|
//! | forward | start - up   | end + down   |
//! | reverse | end + up     | start - down |
//!
//! `start` is clamped to 1. No upper bound is applied locally, the service
//! rejects regions running past the end of a chromosome.

use crate::core::region::{RegionRecord, Strand};

/// Extension deltas in base pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extension {
    pub upstream: u64,
    pub downstream: u64,
}

impl Extension {
    pub fn new(upstream: u64, downstream: u64) -> Self {
        Self { upstream, downstream }
    }

    pub fn is_noop(&self) -> bool {
        self.upstream == 0 && self.downstream == 0
    }
}

/// Extend a region, returning a new record
///
/// # Examples
/// ```
/// use getseq::core::{extend, RegionRecord, Strand};
///
/// let fwd = RegionRecord::new("1", 100, 200, Strand::Forward, None, 1).unwrap();
/// let out = extend(&fwd, 10, 5);
/// assert_eq!((out.start, out.end), (90, 205));
///
/// let rev = RegionRecord::new("2", 50, 60, Strand::Reverse, None, 2).unwrap();
/// let out = extend(&rev, 10, 5);
/// assert_eq!((out.start, out.end), (45, 70));
/// ```
pub fn extend(region: &RegionRecord, upstream_bp: u64, downstream_bp: u64) -> RegionRecord {
    let (before, after) = match region.strand {
        Strand::Forward => (upstream_bp, downstream_bp),
        Strand::Reverse => (downstream_bp, upstream_bp),
    };

    RegionRecord {
        start: region.start.saturating_sub(before).max(1),
        end: region.end.saturating_add(after),
        ..region.clone()
    }
}

/// Apply one extension to every region
///
/// A no-op extension hands the input back untouched.
pub fn extend_all(regions: Vec<RegionRecord>, extension: Extension) -> Vec<RegionRecord> {
    if extension.is_noop() {
        return regions;
    }
    regions
        .iter()
        .map(|r| extend(r, extension.upstream, extension.downstream))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(start: u64, end: u64, strand: Strand) -> RegionRecord {
        RegionRecord::new("chr1", start, end, strand, Some("x".into()), 3).unwrap()
    }

    #[test]
    fn test_zero_extension_is_identity() {
        let r = region(100, 200, Strand::Reverse);
        assert_eq!(extend(&r, 0, 0), r);
    }

    #[test]
    fn test_forward_extension() {
        let r = extend(&region(100, 200, Strand::Forward), 10, 5);
        assert_eq!((r.start, r.end), (90, 205));
    }

    #[test]
    fn test_reverse_extension_swaps_roles() {
        let r = extend(&region(100, 200, Strand::Reverse), 10, 5);
        assert_eq!((r.start, r.end), (95, 210));
    }

    #[test]
    fn test_start_clamped_to_one() {
        let r = extend(&region(5, 10, Strand::Forward), 1_000, 0);
        assert_eq!(r.start, 1);
        assert_eq!(r.end, 10);

        let r = extend(&region(5, 10, Strand::Reverse), 0, u64::MAX);
        assert_eq!(r.start, 1);
    }

    #[test]
    fn test_end_saturates() {
        let r = extend(&region(5, u64::MAX - 1, Strand::Forward), 0, 10);
        assert_eq!(r.end, u64::MAX);
    }

    #[test]
    fn test_identity_fields_preserved() {
        let original = region(100, 200, Strand::Forward);
        let r = extend(&original, 3, 4);
        assert_eq!(r.chromosome, original.chromosome);
        assert_eq!(r.label, original.label);
        assert_eq!(r.original_chromosome, "chr1");
        assert_eq!(r.row, 3);
    }

    #[test]
    fn test_extend_all_noop_returns_input() {
        let regions = vec![region(1, 2, Strand::Forward), region(3, 4, Strand::Reverse)];
        let out = extend_all(regions.clone(), Extension::default());
        assert_eq!(out, regions);
    }

    #[test]
    fn test_extend_all() {
        let regions = vec![region(100, 200, Strand::Forward), region(100, 200, Strand::Reverse)];
        let out = extend_all(regions, Extension::new(10, 5));
        assert_eq!((out[0].start, out[0].end), (90, 205));
        assert_eq!((out[1].start, out[1].end), (95, 210));
    }
}
