//! Core types and configuration for the tickbar system.
//!
//! This crate provides shared types used across all other crates:
//! - Market data types (ticks, product series, bars)
//! - Bar resolutions and window alignment
//! - Configuration structures
//! - Common error types and skip reasons

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result, SkipReason};
pub use types::*;
