//! Result assembly
//!
//! Puts per-batch results back into input order, turns successes into
//! labeled sequence records and routes failures to [`Diagnostics`].

use crate::core::error::{RegionError, RetrievalError};
use crate::core::region::RegionRecord;
use log::warn;

/// Retrieval outcome for one region
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceResult<'a> {
    /// Position of the region in the parsed input
    pub index: usize,
    pub region: &'a RegionRecord,
    pub outcome: Result<String, RetrievalError>,
}

impl<'a> SequenceResult<'a> {
    pub fn new(
        index: usize,
        region: &'a RegionRecord,
        outcome: Result<String, RetrievalError>,
    ) -> Self {
        Self {
            index,
            region,
            outcome,
        }
    }

    pub fn sequence(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    pub fn error(&self) -> Option<&RetrievalError> {
        self.outcome.as_ref().err()
    }
}

/// Labeled sequence ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub header: String,
    pub sequence: String,
}

/// A row or region that did not make it into the output
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Input row rejected by the parser
    SkippedRow { row: usize, error: RegionError },
    /// Region parsed but its sequence could not be retrieved
    RegionFailed {
        row: usize,
        locus: String,
        label: Option<String>,
        error: RetrievalError,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::SkippedRow { row, error } => {
                write!(f, "row {}: skipped, invalid region: {}", row, error)
            }
            Diagnostic::RegionFailed {
                row,
                locus,
                label,
                error,
            } => {
                write!(f, "row {}: {}", row, locus)?;
                if let Some(label) = label {
                    write!(f, " ({})", label)?;
                }
                write!(f, ": retrieval failed: {}", error)
            }
        }
    }
}

/// Failures collected over one run
///
/// Every entry is also logged at `warn` level when recorded.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_row_error(&mut self, row: usize, error: RegionError) {
        let entry = Diagnostic::SkippedRow { row, error };
        warn!("{}", entry);
        self.entries.push(entry);
    }

    pub fn record_region_failure(&mut self, region: &RegionRecord, error: RetrievalError) {
        let entry = Diagnostic::RegionFailed {
            row: region.row,
            locus: region.locus(),
            label: region.label.clone(),
            error,
        };
        warn!("{}", entry);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn skipped_rows(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| matches!(d, Diagnostic::SkippedRow { .. }))
            .count()
    }

    pub fn failed_regions(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| matches!(d, Diagnostic::RegionFailed { .. }))
            .count()
    }
}

/// Overall verdict of a `sequences` run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every parsed region was retrieved
    Complete,
    /// At least one region was retrieved, some failed
    Partial,
    /// Nothing parsed, or every region failed
    Failed,
}

impl RunStatus {
    pub fn from_counts(retrieved: usize, failed: usize) -> Self {
        match (retrieved, failed) {
            (0, _) => RunStatus::Failed,
            (_, 0) => RunStatus::Complete,
            _ => RunStatus::Partial,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, RunStatus::Failed)
    }
}

/// Assembled output of one run
#[derive(Debug, Clone)]
pub struct Assembly {
    pub records: Vec<SequenceRecord>,
    pub retrieved: usize,
    pub failed: usize,
}

impl Assembly {
    pub fn status(&self) -> RunStatus {
        RunStatus::from_counts(self.retrieved, self.failed)
    }
}

/// Reorder results to input order and split successes from failures
///
/// Results may arrive in any batch order. The sort is stable on the input
/// index, so the output never depends on how regions were grouped.
pub fn assemble(mut results: Vec<SequenceResult<'_>>, diagnostics: &mut Diagnostics) -> Assembly {
    results.sort_by_key(|r| r.index);

    let mut records = Vec::with_capacity(results.len());
    let mut failed = 0;
    for result in results {
        match result.outcome {
            Ok(sequence) => records.push(SequenceRecord {
                header: result.region.display_name(),
                sequence,
            }),
            Err(error) => {
                diagnostics.record_region_failure(result.region, error);
                failed += 1;
            }
        }
    }

    Assembly {
        retrieved: records.len(),
        records,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::region::Strand;

    fn regions() -> Vec<RegionRecord> {
        vec![
            RegionRecord::new("1", 90, 205, Strand::Forward, Some("geneA".into()), 1).unwrap(),
            RegionRecord::new("2", 45, 70, Strand::Reverse, None, 2).unwrap(),
            RegionRecord::new("3", 1, 10, Strand::Forward, None, 4).unwrap(),
        ]
    }

    #[test]
    fn test_assemble_restores_input_order() {
        let regions = regions();
        let results = vec![
            SequenceResult::new(2, &regions[2], Ok("CCC".into())),
            SequenceResult::new(0, &regions[0], Ok("AAA".into())),
            SequenceResult::new(1, &regions[1], Ok("GGG".into())),
        ];
        let mut diagnostics = Diagnostics::new();
        let assembly = assemble(results, &mut diagnostics);

        let headers: Vec<_> = assembly.records.iter().map(|r| r.header.as_str()).collect();
        assert_eq!(headers, vec!["geneA", "2:45-70:-", "3:1-10:+"]);
        assert_eq!(assembly.status(), RunStatus::Complete);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_assemble_routes_failures_to_diagnostics() {
        let regions = regions();
        let results = vec![
            SequenceResult::new(0, &regions[0], Ok("AAA".into())),
            SequenceResult::new(1, &regions[1], Err(RetrievalError::NoData)),
            SequenceResult::new(2, &regions[2], Err(RetrievalError::Timeout)),
        ];
        let mut diagnostics = Diagnostics::new();
        let assembly = assemble(results, &mut diagnostics);

        assert_eq!(assembly.records.len(), 1);
        assert_eq!(assembly.retrieved, 1);
        assert_eq!(assembly.failed, 2);
        assert_eq!(assembly.status(), RunStatus::Partial);
        assert_eq!(diagnostics.failed_regions(), 2);
        assert_eq!(
            diagnostics.entries()[0].to_string(),
            "row 2: 2:45-70:-: retrieval failed: no data"
        );
        assert_eq!(
            diagnostics.entries()[1].to_string(),
            "row 4: 3:1-10:+: retrieval failed: request timed out"
        );
    }

    #[test]
    fn test_all_failed_is_failure() {
        let regions = regions();
        let results = vec![SequenceResult::new(0, &regions[0], Err(RetrievalError::NoData))];
        let mut diagnostics = Diagnostics::new();
        let assembly = assemble(results, &mut diagnostics);
        assert_eq!(assembly.status(), RunStatus::Failed);
        assert!(!assembly.status().is_success());
        assert_eq!(
            diagnostics.entries()[0].to_string(),
            "row 1: 1:90-205:+ (geneA): retrieval failed: no data"
        );
    }

    #[test]
    fn test_run_status_from_counts() {
        assert_eq!(RunStatus::from_counts(0, 0), RunStatus::Failed);
        assert_eq!(RunStatus::from_counts(3, 0), RunStatus::Complete);
        assert_eq!(RunStatus::from_counts(1, 2), RunStatus::Partial);
        assert!(RunStatus::Partial.is_success());
    }

    #[test]
    fn test_skipped_row_display() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record_row_error(7, RegionError::InvalidRange { start: 9, end: 3 });
        assert_eq!(diagnostics.skipped_rows(), 1);
        assert_eq!(
            diagnostics.entries()[0].to_string(),
            "row 7: skipped, invalid region: end (3) is smaller than start (9)"
        );
    }
}
