//! Error types for getseq
//!
//! Defines all error types used throughout the library.

use thiserror::Error;

/// Main error type for getseq operations
#[derive(Debug, Error)]
pub enum GetseqError {
    /// Malformed input row
    #[error("Invalid region: {0}")]
    Region(#[from] RegionError),

    /// Batching configuration rejected before any request was issued
    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),

    /// Remote service failure
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while turning an input row into a region (`InvalidRegion`)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegionError {
    /// Row has fewer than the three mandatory columns
    #[error("expected at least 3 fields (chromosome, start, end), found {found}")]
    TooFewFields { found: usize },

    /// Chromosome is empty once the `chr` prefix is removed
    #[error("empty chromosome name (input '{raw}')")]
    EmptyChromosome { raw: String },

    /// Start or end is not a non-negative integer
    #[error("invalid {field} coordinate '{value}'")]
    InvalidCoordinate { field: &'static str, value: String },

    /// Coordinates are 1-based
    #[error("start must be >= 1, got {start}")]
    StartBelowOne { start: u64 },

    /// End before start
    #[error("end ({end}) is smaller than start ({start})")]
    InvalidRange { start: u64, end: u64 },

    /// Line bytes are not valid UTF-8
    #[error("line is not valid UTF-8")]
    InvalidEncoding,

    /// Strand token not understood
    #[error("unrecognized strand '{0}' (expected '+', '-', 'forward' or 'reverse')")]
    InvalidStrand(String),
}

/// Errors in the batching configuration. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    #[error("maximum batch size must be at least 1, got {0}")]
    InvalidBatchSize(usize),

    #[error("maximum total span must be at least 1, got {0}")]
    InvalidTotalSpan(u64),
}

/// Failure to retrieve a region's sequence.
///
/// Whole-batch failures are copied onto every region of the batch, so the
/// type is `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    /// The service answered with a non-success HTTP status, with the
    /// service's own explanation when it sent one
    #[error("HTTP {status}{}", detail(.message))]
    Http {
        status: u16,
        message: Option<String>,
    },

    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),

    /// Request exceeded the configured timeout
    #[error("request timed out")]
    Timeout,

    /// The service replied but did not include this region
    #[error("no data")]
    NoData,

    /// The service replied with a payload that could not be interpreted
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The run was interrupted before this region's batch was sent
    #[error("cancelled")]
    Cancelled,
}

fn detail(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {}", m),
        None => String::new(),
    }
}

impl RetrievalError {
    /// True for the `MalformedResponse` sub-kind
    pub fn is_malformed(&self) -> bool {
        matches!(self, RetrievalError::MalformedResponse(_))
    }
}

/// Result type alias for getseq operations
pub type Result<T> = std::result::Result<T, GetseqError>;

/// Result type alias for row parsing
pub type RegionResult<T> = std::result::Result<T, RegionError>;

/// Result type alias for batch planning
pub type PlanningResult<T> = std::result::Result<T, PlanningError>;

/// Result type alias for remote retrieval
pub type RetrievalResult<T> = std::result::Result<T, RetrievalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_display() {
        assert_eq!(RetrievalError::NoData.to_string(), "no data");
    }

    #[test]
    fn test_malformed_display_and_kind() {
        let err = RetrievalError::MalformedResponse("sequence field is not a string".into());
        assert_eq!(err.to_string(), "malformed response: sequence field is not a string");
        assert!(err.is_malformed());
        assert!(!RetrievalError::Timeout.is_malformed());
    }

    #[test]
    fn test_http_display_carries_service_message() {
        let bare = RetrievalError::Http {
            status: 503,
            message: None,
        };
        assert_eq!(bare.to_string(), "HTTP 503");

        let explained = RetrievalError::Http {
            status: 400,
            message: Some("Cannot request a slice whose end is greater than 248956422".into()),
        };
        assert_eq!(
            explained.to_string(),
            "HTTP 400: Cannot request a slice whose end is greater than 248956422"
        );
    }

    #[test]
    fn test_from_conversions() {
        let err: GetseqError = PlanningError::InvalidBatchSize(0).into();
        assert!(matches!(err, GetseqError::Planning(_)));

        let err: GetseqError = RegionError::InvalidStrand("x".into()).into();
        assert_eq!(
            err.to_string(),
            "Invalid region: unrecognized strand 'x' (expected '+', '-', 'forward' or 'reverse')"
        );
    }
}
