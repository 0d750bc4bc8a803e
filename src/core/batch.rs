//! Batch planning
//!
//! Splits the ordered region list into request batches that respect the
//! service's limits on region count and aggregate span.

use crate::core::error::{PlanningError, PlanningResult};
use crate::core::region::RegionRecord;

/// Ensembl `POST sequence/region` accepts at most 50 regions per request
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;

/// Ensembl caps the sequence returned by one request at 10 Mb
pub const DEFAULT_MAX_TOTAL_SPAN: u64 = 10_000_000;

/// Per-request limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_batch_size: usize,
    pub max_total_span: u64,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_total_span: DEFAULT_MAX_TOTAL_SPAN,
        }
    }
}

impl BatchLimits {
    pub fn new(max_batch_size: usize, max_total_span: u64) -> PlanningResult<Self> {
        let limits = Self {
            max_batch_size,
            max_total_span,
        };
        limits.validate()?;
        Ok(limits)
    }

    pub fn validate(&self) -> PlanningResult<()> {
        if self.max_batch_size < 1 {
            return Err(PlanningError::InvalidBatchSize(self.max_batch_size));
        }
        if self.max_total_span < 1 {
            return Err(PlanningError::InvalidTotalSpan(self.max_total_span));
        }
        Ok(())
    }
}

/// A region inside a batch, tagged with its position in the input
#[derive(Debug, Clone, Copy)]
pub struct BatchEntry<'a> {
    pub index: usize,
    pub region: &'a RegionRecord,
}

/// Regions submitted together in one request
#[derive(Debug, Clone, Default)]
pub struct Batch<'a> {
    entries: Vec<BatchEntry<'a>>,
    total_span: u64,
    oversized: bool,
}

impl<'a> Batch<'a> {
    fn push(&mut self, index: usize, region: &'a RegionRecord) {
        self.total_span = self.total_span.saturating_add(region.len());
        self.entries.push(BatchEntry { index, region });
    }

    fn fits(&self, region: &RegionRecord, limits: &BatchLimits) -> bool {
        self.entries.len() < limits.max_batch_size
            && self.total_span.saturating_add(region.len()) <= limits.max_total_span
    }

    pub fn entries(&self) -> &[BatchEntry<'a>] {
        &self.entries
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of region lengths
    pub fn total_span(&self) -> u64 {
        self.total_span
    }

    /// Set for a lone region longer than `max_total_span`. It is still sent
    /// so the rejection surfaces against that region only.
    pub fn is_oversized(&self) -> bool {
        self.oversized
    }
}

/// Greedily group regions into batches, preserving input order
///
/// # Examples
/// ```
/// use getseq::core::{plan_batches, BatchLimits, RegionRecord, Strand};
///
/// let regions: Vec<_> = (0..5)
///     .map(|i| RegionRecord::new("1", 1 + i * 10, 10 + i * 10, Strand::Forward, None, 1).unwrap())
///     .collect();
/// let batches = plan_batches(&regions, &BatchLimits::new(2, 1_000).unwrap()).unwrap();
/// let sizes: Vec<_> = batches.iter().map(|b| b.size()).collect();
/// assert_eq!(sizes, vec![2, 2, 1]);
/// ```
pub fn plan_batches<'a>(
    regions: &'a [RegionRecord],
    limits: &BatchLimits,
) -> PlanningResult<Vec<Batch<'a>>> {
    limits.validate()?;

    let mut batches = Vec::new();
    let mut current = Batch::default();

    for (index, region) in regions.iter().enumerate() {
        if region.len() > limits.max_total_span {
            if !current.is_empty() {
                batches.push(std::mem::take(&mut current));
            }
            log::warn!(
                "Region {} (row {}) spans {} bp, above the {} bp request limit; sending it alone",
                region.locus(),
                region.row,
                region.len(),
                limits.max_total_span
            );
            let mut alone = Batch::default();
            alone.push(index, region);
            alone.oversized = true;
            batches.push(alone);
            continue;
        }

        if !current.fits(region, limits) {
            batches.push(std::mem::take(&mut current));
        }
        current.push(index, region);
    }

    if !current.is_empty() {
        batches.push(current);
    }

    log::debug!("Planned {} batches for {} regions", batches.len(), regions.len());
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::region::Strand;

    fn region_of_len(len: u64) -> RegionRecord {
        RegionRecord::new("1", 1, len, Strand::Forward, None, 1).unwrap()
    }

    fn sizes(batches: &[Batch<'_>]) -> Vec<usize> {
        batches.iter().map(|b| b.size()).collect()
    }

    #[test]
    fn test_default_limits() {
        let limits = BatchLimits::default();
        assert_eq!(limits.max_batch_size, 50);
        assert_eq!(limits.max_total_span, 10_000_000);
    }

    #[test]
    fn test_invalid_limits() {
        assert_eq!(BatchLimits::new(0, 10), Err(PlanningError::InvalidBatchSize(0)));
        assert_eq!(BatchLimits::new(1, 0), Err(PlanningError::InvalidTotalSpan(0)));

        let regions = vec![region_of_len(5)];
        let bad = BatchLimits {
            max_batch_size: 0,
            max_total_span: 10,
        };
        assert!(plan_batches(&regions, &bad).is_err());
    }

    #[test]
    fn test_empty_input() {
        let batches = plan_batches(&[], &BatchLimits::default()).unwrap();
        assert!(batches.is_empty());
    }

    #[test]
    fn test_size_limit() {
        let regions: Vec<_> = (0..7).map(|_| region_of_len(1)).collect();
        let batches = plan_batches(&regions, &BatchLimits::new(3, 1_000).unwrap()).unwrap();
        assert_eq!(sizes(&batches), vec![3, 3, 1]);
    }

    #[test]
    fn test_span_overflow_starts_new_batch() {
        // 40 + 40 fits in 100, the third region would make 120
        let regions = vec![region_of_len(40), region_of_len(40), region_of_len(40)];
        let batches = plan_batches(&regions, &BatchLimits::new(10, 100).unwrap()).unwrap();
        assert_eq!(sizes(&batches), vec![2, 1]);
        assert_eq!(batches[0].total_span(), 80);
        assert_eq!(batches[1].entries()[0].index, 2);
    }

    #[test]
    fn test_exact_span_fits() {
        let regions = vec![region_of_len(50), region_of_len(50)];
        let batches = plan_batches(&regions, &BatchLimits::new(10, 100).unwrap()).unwrap();
        assert_eq!(sizes(&batches), vec![2]);
    }

    #[test]
    fn test_oversized_region_isolated() {
        let regions = vec![region_of_len(10), region_of_len(500), region_of_len(10)];
        let batches = plan_batches(&regions, &BatchLimits::new(10, 100).unwrap()).unwrap();
        assert_eq!(sizes(&batches), vec![1, 1, 1]);
        assert!(!batches[0].is_oversized());
        assert!(batches[1].is_oversized());
        assert!(!batches[2].is_oversized());
        assert_eq!(batches[1].entries()[0].index, 1);
    }

    #[test]
    fn test_order_preserved() {
        let regions: Vec<_> = (1..=20).map(region_of_len).collect();
        let batches = plan_batches(&regions, &BatchLimits::new(4, 30).unwrap()).unwrap();
        let indices: Vec<_> = batches
            .iter()
            .flat_map(|b| b.entries().iter().map(|e| e.index))
            .collect();
        assert_eq!(indices, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_entries_reference_input() {
        let regions = vec![region_of_len(3)];
        let batches = plan_batches(&regions, &BatchLimits::default()).unwrap();
        assert!(std::ptr::eq(batches[0].entries()[0].region, &regions[0]));
    }
}
