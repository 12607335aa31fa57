//! Dataset assembly for the tickbar system.
//!
//! This crate provides:
//! - Multi-product orchestration (load, validate, resample)
//! - Bounded worker pool across products
//! - Result maps with per-product skip reasons
//! - CSV output of resampled bars

pub mod orchestrator;
pub mod result;
pub mod writer;

pub use orchestrator::DatasetOrchestrator;
pub use result::{DatasetResult, LoadedDataset};
pub use writer::{write_bar_series, write_bars};
