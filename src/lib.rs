//! getseq - DNA sequences for genomic regions from Ensembl
//!
//! Reads regions from a BED-like file, normalizes chromosome names,
//! optionally extends each region upstream/downstream and retrieves the
//! sequences from the Ensembl REST API in rate-limited batches.
//!
//! # Features
//!
//! - `chr1`/`CHR1`/`1` naming styles accepted, `chrM` mapped to `MT`
//! - Strand-aware extension clamped at position 1
//! - Batches respect the service's region-count and span limits
//! - A failed batch never aborts the run; failures are reported per region
//!
//! # Example
//!
//! ```ignore
//! use getseq::core::{run_sequences, ClientConfig, EnsemblClient, GenomeRef, RawRow, SequenceConfig};
//! use std::sync::atomic::AtomicBool;
//!
//! let rows = vec![RawRow::new(1, ["chr1", "100", "200", "+", "geneA"])];
//! let mut client = EnsemblClient::new(&ClientConfig::default())?;
//! let report = run_sequences(
//!     rows,
//!     &GenomeRef::new("human", "GRCh38"),
//!     &SequenceConfig::default(),
//!     &mut client,
//!     &AtomicBool::new(false),
//! )?;
//! ```

pub mod core;
pub mod formats;

// Re-export commonly used types
pub use self::core::{
    extend, normalize_chrom, parse_row, plan_batches, run_sequences, BatchLimits, ClientConfig,
    Diagnostics, EnsemblClient, GenomeRef, GetseqError, RawRow, RegionRecord, RetrievalError,
    RunStatus, SequenceConfig, SequenceRecord, SequenceService, SequencesReport, Strand,
};
pub use self::formats::{bed, fasta};
