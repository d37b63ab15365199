//! Error types for the fear index pipeline
//!
//! Per-image failures ([`DecodeFailure`], [`ScoreFailure`]) are recovered inside
//! the batch runner. Stage-level failures ([`BatchError`], [`MarketDataError`],
//! [`TableError`], [`MergeError`]) abort the current stage and are reported to
//! the operator without touching previously persisted artifacts.

use std::path::PathBuf;

/// Errors raised by an emotion classification capability
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassifierError {
    /// Image could not be prepared for the classifier
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Transport or HTTP status failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response did not match the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// An image file that could not be decoded
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("failed to decode {image}: {message}")]
pub struct DecodeFailure {
    /// File name of the image
    pub image: String,
    /// Decoder message
    pub message: String,
}

/// An image that decoded but could not be scored
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("failed to score {image}: {message}")]
pub struct ScoreFailure {
    /// File name of the image
    pub image: String,
    /// Explanation of the failure
    pub message: String,
}

/// Per-image failure recorded by the batch runner
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImageFailure {
    /// The file could not be decoded as a raster image
    #[error(transparent)]
    Decode(#[from] DecodeFailure),

    /// The classifier rejected the image or returned an unusable answer
    #[error(transparent)]
    Score(#[from] ScoreFailure),
}

impl ImageFailure {
    /// File name of the failed image
    pub fn image(&self) -> &str {
        match self {
            ImageFailure::Decode(failure) => &failure.image,
            ImageFailure::Score(failure) => &failure.image,
        }
    }
}

/// Errors that stop a batch run
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The image directory could not be listed
    #[error("cannot read image directory {path}: {source}")]
    ReadDir {
        /// Directory that was scanned
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The worker pool could not be created
    #[error("cannot start worker pool: {0}")]
    ThreadPool(String),

    /// The emotion table could not be written
    #[error("cannot write emotion table {path}: {source}")]
    Write {
        /// Destination of the table
        path: PathBuf,
        /// Underlying error
        source: TableError,
    },
}

/// Errors raised while retrieving or normalizing market data
#[derive(Debug, Clone, thiserror::Error)]
pub enum MarketDataError {
    /// Transport failure, timeout or HTTP status error
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider answered with an explicit error
    #[error("provider error {code}: {description}")]
    Provider {
        /// Provider error code
        code: String,
        /// Provider error description
        description: String,
    },

    /// The payload could not be normalized to (date, value) rows
    #[error("malformed market data: {0}")]
    Malformed(String),

    /// The series has no rows
    #[error("volatility series is empty")]
    EmptySeries,
}

/// Errors raised while reading or writing tabular artifacts
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// The table file does not exist
    #[error("{path} not found")]
    MissingInput {
        /// Expected location of the table
        path: PathBuf,
    },

    /// Required columns are absent
    #[error("missing required columns in {path}: {}", missing.join(", "))]
    SchemaViolation {
        /// Table that failed validation
        path: PathBuf,
        /// Names of the absent columns, sorted
        missing: Vec<String>,
    },

    /// A row holds a value that cannot be interpreted
    #[error("invalid row {row} in {path}: {message}")]
    InvalidRow {
        /// Table containing the row
        path: PathBuf,
        /// One-based data row number (header excluded)
        row: usize,
        /// What was wrong with the row
        message: String,
    },

    /// CSV encoding or decoding failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort a merge; the final dataset on disk is left untouched
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The emotion table is missing or malformed
    #[error(transparent)]
    Input(#[from] TableError),

    /// No volatility data could be retrieved for the period
    #[error("no VIX data available for period {period}")]
    MarketDataUnavailable {
        /// Requested provider period
        period: String,
    },

    /// The merged dataset could not be written
    #[error("cannot write merged dataset {path}: {source}")]
    Write {
        /// Destination of the dataset
        path: PathBuf,
        /// Underlying error
        source: TableError,
    },
}

/// Errors of a full batch-then-merge run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The batch stage failed
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// The merge stage failed
    #[error(transparent)]
    Merge(#[from] MergeError),
}
