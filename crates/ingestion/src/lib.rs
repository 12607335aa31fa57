//! Data ingestion and aggregation for the tickbar system.
//!
//! This crate handles:
//! - Loading per-product tick partitions
//! - Series validation (required fields, non-empty)
//! - Fixed-width OHLCV resampling
//! - Run event reporting

pub mod loader;
pub mod reporter;
pub mod resampler;
pub mod validator;

pub use loader::{CsvPartitionLoader, SeriesLoader};
pub use reporter::{Event, NullReporter, RecordingReporter, Reporter, TracingReporter};
pub use resampler::Resampler;
pub use validator::SeriesValidator;
