//! Error types for the tickbar system.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the tickbar system.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (malformed partition contents).
    #[error("Data error: {0}")]
    Data(String),

    /// The configured root directory does not exist.
    #[error("Root directory {} doesn't exist!", .0.display())]
    RootMissing(PathBuf),

    /// The data directory under the root does not exist.
    #[error("Data directory {} doesn't exist!", .0.display())]
    DataDirMissing(PathBuf),

    /// A product's data directory does not exist.
    #[error("Directory {} doesn't exist", .0.display())]
    DirectoryMissing(PathBuf),

    /// A product id that can't be used as a directory name.
    #[error("Invalid product id '{0}'")]
    InvalidProduct(String),

    /// The resampler was handed a series that violates its preconditions.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading/writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }
}

/// Why a product was left out of a dataset run.
///
/// Every per-product failure ends up here instead of aborting the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The product's data directory does not exist.
    DirectoryMissing,
    /// The product id is not a plain directory name.
    InvalidProduct,
    /// The merged series has no records.
    EmptySeries,
    /// A required field is absent across the whole series.
    MissingField(&'static str),
    /// Partition files exist but could not be read or parsed.
    LoadFailed(String),
    /// The resampler rejected the series.
    InvalidInput(String),
}

impl SkipReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::DirectoryMissing => "directory_missing",
            SkipReason::InvalidProduct => "invalid_product",
            SkipReason::EmptySeries => "empty_series",
            SkipReason::MissingField(_) => "missing_field",
            SkipReason::LoadFailed(_) => "load_failed",
            SkipReason::InvalidInput(_) => "invalid_input",
        }
    }

    /// True when the product simply has no data, as opposed to bad data.
    pub fn is_no_data(&self) -> bool {
        matches!(self, SkipReason::DirectoryMissing | SkipReason::EmptySeries)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DirectoryMissing => write!(f, "data directory doesn't exist"),
            SkipReason::InvalidProduct => write!(f, "is not a valid product id"),
            SkipReason::EmptySeries => write!(f, "doesn't have data"),
            SkipReason::MissingField(name) => write!(f, "data doesn't have a {name} column"),
            SkipReason::LoadFailed(msg) => write!(f, "failed to load: {msg}"),
            SkipReason::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl From<Error> for SkipReason {
    fn from(err: Error) -> Self {
        match err {
            Error::DirectoryMissing(_) => SkipReason::DirectoryMissing,
            Error::InvalidProduct(_) => SkipReason::InvalidProduct,
            Error::InvalidInput(msg) => SkipReason::InvalidInput(msg),
            other => SkipReason::LoadFailed(other.to_string()),
        }
    }
}
