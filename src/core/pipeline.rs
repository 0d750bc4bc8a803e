//! The `sequences` workflow
//!
//! rows -> parse -> extend -> plan -> fetch (one batch at a time) -> assemble
//!
//! Batches are fetched strictly one after another. A failed batch only
//! affects its own regions. Cancellation is checked before each request;
//! regions whose batch was never sent are reported as cancelled and
//! everything already retrieved is kept.

use crate::core::assemble::{assemble, Diagnostics, RunStatus, SequenceRecord, SequenceResult};
use crate::core::batch::{plan_batches, BatchLimits};
use crate::core::client::{fetch_batch, GenomeRef, SequenceService};
use crate::core::error::{Result, RetrievalError};
use crate::core::extend::{extend_all, Extension};
use crate::core::region::{parse_row, ParsedRow, RawRow, RegionRecord};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};

/// Settings for one `sequences` run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceConfig {
    pub upstream_bp: u64,
    pub downstream_bp: u64,
    pub limits: BatchLimits,
}

impl SequenceConfig {
    pub fn extension(&self) -> Extension {
        Extension::new(self.upstream_bp, self.downstream_bp)
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total_rows: usize,
    pub header_skipped: bool,
    pub parsed: usize,
    pub skipped: usize,
    pub batches: usize,
    pub batches_sent: usize,
    pub oversized: usize,
    pub retrieved: usize,
    pub failed: usize,
}

/// Everything a `sequences` run produced
#[derive(Debug, Clone)]
pub struct SequencesReport {
    pub records: Vec<SequenceRecord>,
    pub diagnostics: Diagnostics,
    pub stats: RunStats,
    pub status: RunStatus,
}

/// Parse rows into regions, recording rejected rows
///
/// Returns the regions, the number of rows seen and whether a header row
/// was skipped.
pub fn parse_rows<I>(rows: I, diagnostics: &mut Diagnostics) -> (Vec<RegionRecord>, usize, bool)
where
    I: IntoIterator<Item = RawRow>,
{
    let mut regions = Vec::new();
    let mut total = 0;
    let mut header = false;

    for row in rows {
        let is_first = total == 0;
        total += 1;
        match parse_row(&row, is_first) {
            Ok(ParsedRow::Region(region)) => regions.push(region),
            Ok(ParsedRow::Header) => {
                info!("Header detected on row {}, skipping it", row.line);
                header = true;
            }
            Err(e) => diagnostics.record_row_error(row.line, e),
        }
    }

    if !header && total > 0 {
        info!("No header detected, proceeding");
    }
    (regions, total, header)
}

/// Run the whole workflow against `service`
///
/// Only an invalid batching configuration is an error, and it is raised
/// before any row is parsed or request sent. Every other failure ends up
/// in the report's diagnostics.
pub fn run_sequences<I, S>(
    rows: I,
    genome: &GenomeRef,
    config: &SequenceConfig,
    service: &mut S,
    cancel: &AtomicBool,
) -> Result<SequencesReport>
where
    I: IntoIterator<Item = RawRow>,
    S: SequenceService + ?Sized,
{
    config.limits.validate()?;

    let mut diagnostics = Diagnostics::new();
    let (regions, total_rows, header_skipped) = parse_rows(rows, &mut diagnostics);
    let mut stats = RunStats {
        total_rows,
        header_skipped,
        parsed: regions.len(),
        skipped: diagnostics.skipped_rows(),
        ..RunStats::default()
    };

    if regions.is_empty() {
        warn!("No valid regions in input, nothing to retrieve");
        return Ok(SequencesReport {
            records: Vec::new(),
            diagnostics,
            stats,
            status: RunStatus::Failed,
        });
    }

    for region in regions.iter().take(10) {
        debug!("Parsed region {} (row {})", region.locus(), region.row);
    }

    let extension = config.extension();
    if !extension.is_noop() {
        info!(
            "Extending regions by {} bp upstream and {} bp downstream",
            extension.upstream, extension.downstream
        );
    }
    let regions = extend_all(regions, extension);

    let batches = plan_batches(&regions, &config.limits)?;
    stats.batches = batches.len();
    stats.oversized = batches.iter().filter(|b| b.is_oversized()).count();

    info!(
        "Retrieving {} DNA sequences from Ensembl ({}/{}) in {} batches",
        regions.len(),
        genome.species,
        genome.assembly,
        batches.len()
    );

    let mut results: Vec<SequenceResult<'_>> = Vec::with_capacity(regions.len());
    for (n, batch) in batches.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            warn!(
                "Cancelled before batch {}/{}, keeping results collected so far",
                n + 1,
                batches.len()
            );
            results.extend(batch.entries().iter().map(|e| {
                SequenceResult::new(e.index, e.region, Err(RetrievalError::Cancelled))
            }));
            continue;
        }

        debug!(
            "Sending batch {}/{} ({} regions, {} bp)",
            n + 1,
            batches.len(),
            batch.size(),
            batch.total_span()
        );
        results.extend(fetch_batch(service, genome, batch));
        stats.batches_sent += 1;
    }

    let assembly = assemble(results, &mut diagnostics);
    stats.retrieved = assembly.retrieved;
    stats.failed = assembly.failed;
    let status = assembly.status();

    info!(
        "Retrieved {} of {} regions ({} failed)",
        assembly.retrieved,
        regions.len(),
        assembly.failed
    );

    Ok(SequencesReport {
        records: assembly.records,
        diagnostics,
        stats,
        status,
    })
}
