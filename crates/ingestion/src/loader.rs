//! Tick series loading from per-product partition files.
//!
//! Layout: `<datadir>/<freq>/<product>/<partition>`, where each partition is
//! a delimited table whose first column is the timestamp and which carries
//! `price` and `amount` columns by header name.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tickbar_core::{
    is_valid_product, ts_to_datetime, Error, Fields, ProductSeries, Result, Tick, TimestampMs,
};

use crate::reporter::{Event, Reporter};

/// Source of per-product tick series.
pub trait SeriesLoader: Sync {
    /// Every product available, sorted.
    fn products(&self) -> Result<Vec<String>>;

    /// Load one product's merged, time-ordered series.
    ///
    /// Fails with [`Error::DirectoryMissing`] when the product has no data
    /// directory and [`Error::InvalidProduct`] when the id is not a plain
    /// directory name.
    fn load(&self, product: &str, reporter: &dyn Reporter) -> Result<ProductSeries>;
}

/// Loader for CSV partitions on the local filesystem.
#[derive(Debug, Clone)]
pub struct CsvPartitionLoader {
    /// `<datadir>/<freq>`.
    root: PathBuf,
    delimiter: u8,
}

/// Rows and columns read from a single partition file.
#[derive(Debug, Default)]
struct Partition {
    fields: Fields,
    ticks: Vec<Tick>,
}

impl CsvPartitionLoader {
    /// Create a loader over `<datadir>/<freq>`.
    pub fn new(datadir: impl AsRef<Path>, freq: &str) -> Self {
        Self {
            root: datadir.as_ref().join(freq),
            delimiter: b',',
        }
    }

    /// Use a different field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a product's partitions.
    pub fn product_dir(&self, product: &str) -> PathBuf {
        self.root.join(product)
    }

    fn read_partition(&self, path: &Path) -> Result<Partition> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Ok(Partition::default());
        }
        let price_idx = headers.iter().position(|h| h == "price");
        let amount_idx = headers.iter().position(|h| h == "amount");

        let mut ticks = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            // Header is line 1
            let line = i + 2;
            let raw_ts = record.get(0).unwrap_or("");
            let ts_ms = parse_timestamp(raw_ts).ok_or_else(|| {
                Error::data(format!(
                    "{}:{line}: invalid timestamp '{raw_ts}'",
                    path.display()
                ))
            })?;
            let price = parse_cell(&record, price_idx, path, line)?;
            let amount = parse_cell(&record, amount_idx, path, line)?;
            ticks.push(Tick::new(ts_ms, price, amount));
        }

        Ok(Partition {
            fields: Fields {
                price: price_idx.is_some(),
                amount: amount_idx.is_some(),
            },
            ticks,
        })
    }
}

impl SeriesLoader for CsvPartitionLoader {
    fn products(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Err(Error::DirectoryMissing(self.root.clone()));
        }
        let mut products = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') {
                products.push(name);
            }
        }
        products.sort();
        Ok(products)
    }

    fn load(&self, product: &str, reporter: &dyn Reporter) -> Result<ProductSeries> {
        if !is_valid_product(product) {
            return Err(Error::InvalidProduct(product.to_string()));
        }
        let dir = self.product_dir(product);
        if !dir.is_dir() {
            return Err(Error::DirectoryMissing(dir));
        }

        let files = partition_files(&dir)?;
        let mut fields = Fields::default();
        let mut ticks = Vec::new();

        for path in &files {
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            reporter.report(&Event::Loading {
                product: product.to_string(),
                file,
            });
            let partition = self.read_partition(path)?;
            fields = fields.union(partition.fields);
            ticks.extend(partition.ticks);
        }

        // Stable: equal timestamps keep file order, then row order
        ticks.sort_by_key(|t| t.ts_ms);
        tracing::debug!(product, files = files.len(), ticks = ticks.len(), "Merged partitions");

        Ok(ProductSeries {
            product: product.to_string(),
            fields,
            ticks,
        })
    }
}

/// Regular, non-hidden files in `dir`, sorted by name.
fn partition_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}

fn parse_cell(
    record: &csv::StringRecord,
    idx: Option<usize>,
    path: &Path,
    line: usize,
) -> Result<f64> {
    let Some(idx) = idx else {
        return Ok(f64::NAN);
    };
    let raw = record.get(idx).unwrap_or("");
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>().map_err(|_| {
        Error::data(format!(
            "{}:{line}: invalid number '{raw}'",
            path.display()
        ))
    })
}

/// Parse a partition timestamp into epoch milliseconds.
///
/// Accepts RFC 3339, naive `YYYY-MM-DD HH:MM:SS[.f]` (with a space or
/// `T`, read as UTC), a bare date, or integer epoch milliseconds within
/// the range a UTC datetime can hold.
pub fn parse_timestamp(raw: &str) -> Option<TimestampMs> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ms) = raw.parse::<i64>() {
        return ts_to_datetime(ms).map(|_| ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}
