//! Diagnostic sink for dataset runs.
//!
//! Components report progress and per-product failures through an injected
//! [`Reporter`] rather than a process-wide logger.

use std::sync::{Mutex, PoisonError};

use tickbar_core::{Resolution, SkipReason};

/// Something worth telling the operator about during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A partition file is being read.
    Loading { product: String, file: String },
    /// A validated series is about to be resampled.
    Resampling {
        product: String,
        resolution: Resolution,
    },
    /// Resampling finished.
    Resampled { product: String, bars: usize },
    /// The product was left out of the result.
    Skipped { product: String, reason: SkipReason },
}

impl Event {
    pub fn product(&self) -> &str {
        match self {
            Event::Loading { product, .. }
            | Event::Resampling { product, .. }
            | Event::Resampled { product, .. }
            | Event::Skipped { product, .. } => product,
        }
    }
}

/// Receives run events. Shared across worker threads.
pub trait Reporter: Sync {
    fn report(&self, event: &Event);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: &Event) {
        match event {
            Event::Loading { product, file } => {
                tracing::info!(product = %product, "Loading {file} ...");
            }
            Event::Resampling {
                product,
                resolution,
            } => {
                tracing::info!(product = %product, "Resampling {product} data to {resolution} ...");
            }
            Event::Resampled { product, bars } => {
                tracing::debug!(product = %product, bars, "Resampled");
            }
            Event::Skipped { product, reason } => {
                tracing::error!(product = %product, code = reason.code(), "{product} {reason}");
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<Event>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Skip events only.
    pub fn skips(&self) -> Vec<(String, SkipReason)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Skipped { product, reason } => Some((product, reason)),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _event: &Event) {}
}
