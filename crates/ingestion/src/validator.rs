//! Pre-aggregation checks on loaded product series.

use tickbar_core::{ProductSeries, SkipReason};

/// Gate between loading and resampling.
///
/// A series passes when it has at least one tick and the upstream data
/// supplied both the price and amount columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesValidator;

impl SeriesValidator {
    pub fn new() -> Self {
        Self
    }

    /// Accept the series or say why it can't be aggregated.
    pub fn validate(&self, series: ProductSeries) -> Result<ProductSeries, SkipReason> {
        if series.is_empty() {
            return Err(SkipReason::EmptySeries);
        }
        if !series.fields.price {
            return Err(SkipReason::MissingField("price"));
        }
        if !series.fields.amount {
            return Err(SkipReason::MissingField("amount"));
        }
        Ok(series)
    }
}
