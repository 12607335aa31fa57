//! CSV output for resampled bars.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;
use tickbar_core::{is_valid_product, BarSeries, Error, Result};

use crate::result::DatasetResult;

const HEADER: [&str; 7] = [
    "timestamp",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "trade_count",
];

/// Write one bar series to `path`. Empty prices become empty cells.
pub fn write_bar_series(path: &Path, series: &BarSeries) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADER)?;

    for bar in series {
        let timestamp = bar
            .datetime()
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_else(|| bar.ts_ms.to_string());
        writer.write_record([
            timestamp,
            price_cell(bar.open),
            price_cell(bar.high),
            price_cell(bar.low),
            price_cell(bar.close),
            bar.volume.to_string(),
            bar.trade_count.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write `<dir>/<product>.csv` for every product in the result.
///
/// Returns the written paths in product order. Fails with
/// [`Error::InvalidProduct`] before writing a file outside `dir`.
pub fn write_bars(dir: &Path, result: &DatasetResult) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(result.len());
    for (product, series) in result.iter() {
        if !is_valid_product(product) {
            return Err(Error::InvalidProduct(product.clone()));
        }
        let path = dir.join(format!("{product}.csv"));
        write_bar_series(&path, series)?;
        tracing::debug!(product = %product, path = %path.display(), "Wrote bars");
        written.push(path);
    }
    Ok(written)
}

fn price_cell(price: Option<f64>) -> String {
    price.map(|p| p.to_string()).unwrap_or_default()
}
