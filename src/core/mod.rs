//! Core region and retrieval functionality
//!
//! This module contains the region model, strand-aware extension, batch
//! planning, the sequence client and result assembly.

pub mod assemble;
pub mod batch;
pub mod client;
pub mod dna;
mod error;
pub mod extend;
pub mod io;
pub mod pipeline;
pub mod region;

pub use assemble::{
    assemble, Assembly, Diagnostic, Diagnostics, RunStatus, SequenceRecord, SequenceResult,
};
pub use batch::{
    plan_batches, Batch, BatchEntry, BatchLimits, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_TOTAL_SPAN,
};
pub use client::{
    fetch_batch, format_region_query, parse_region_query, parse_sequence_id, ClientConfig,
    EnsemblClient, GenomeRef, RateLimiter, SequenceService, ServiceSequence, SpeciesInfo,
    DEFAULT_REQUESTS_PER_SECOND, DEFAULT_SERVER, DEFAULT_TIMEOUT_SECS,
};
pub use error::{
    GetseqError, PlanningError, PlanningResult, RegionError, RegionResult, Result,
    RetrievalError, RetrievalResult,
};
pub use extend::{extend, extend_all, Extension};
pub use io::{CompressionFormat, LineIterator, TeeWriter, DEFAULT_BUFFER_SIZE};
pub use pipeline::{parse_rows, run_sequences, RunStats, SequenceConfig, SequencesReport};
pub use region::{normalize_chrom, parse_row, ParsedRow, RawRow, RegionKey, RegionRecord, Strand};
