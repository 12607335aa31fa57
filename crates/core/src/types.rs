//! Core data types for the tickbar system.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Convert a millisecond timestamp to a UTC datetime.
#[inline]
pub fn ts_to_datetime(ts_ms: TimestampMs) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts_ms)
}

/// A single trade (print) from a product's tick partitions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Timestamp in milliseconds.
    pub ts_ms: TimestampMs,
    /// Trade price, `NaN` when the source row had none.
    pub price: f64,
    /// Signed trade amount; the sign encodes direction.
    pub amount: f64,
}

impl Tick {
    pub fn new(ts_ms: TimestampMs, price: f64, amount: f64) -> Self {
        Self { ts_ms, price, amount }
    }

    /// Traded quantity regardless of direction.
    #[inline]
    pub fn size(&self) -> f64 {
        self.amount.abs()
    }
}

/// Which required columns the upstream data supplied for a product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fields {
    pub price: bool,
    pub amount: bool,
}

impl Fields {
    /// Both price and amount present.
    pub const ALL: Fields = Fields {
        price: true,
        amount: true,
    };

    /// Union of two field sets (a column present in any partition counts).
    pub fn union(self, other: Fields) -> Fields {
        Fields {
            price: self.price || other.price,
            amount: self.amount || other.amount,
        }
    }
}

/// Check that a product id names a single directory entry.
///
/// Ids are joined onto data and output directories, so separators, drive
/// prefixes and the `.`/`..` entries are refused.
pub fn is_valid_product(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\', ':', '\0'])
}

/// Time-ordered ticks for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSeries {
    /// Product identifier (e.g. "BTCUSD").
    pub product: String,
    /// Columns present upstream.
    pub fields: Fields,
    /// Ticks sorted by timestamp, ties in arrival order.
    pub ticks: Vec<Tick>,
}

impl ProductSeries {
    /// Build a series from ticks that carry both price and amount.
    pub fn new(product: impl Into<String>, ticks: Vec<Tick>) -> Self {
        Self {
            product: product.into(),
            fields: Fields::ALL,
            ticks,
        }
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Check the non-decreasing timestamp invariant.
    pub fn is_sorted(&self) -> bool {
        self.ticks.windows(2).all(|w| w[0].ts_ms <= w[1].ts_ms)
    }
}

/// Width of a bar window.
///
/// Parsed from strings such as `"1min"`, `"30s"`, `"4h"` or the pandas
/// aliases `"1T"`, `"T"`, `"500L"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    width_ms: i64,
}

impl Resolution {
    /// One-minute bars.
    pub const MINUTE: Resolution = Resolution {
        width_ms: MS_PER_MINUTE,
    };

    /// Create a resolution from a width in milliseconds.
    pub fn from_millis(width_ms: i64) -> Result<Self> {
        if width_ms <= 0 {
            return Err(Error::config(format!(
                "resolution must be positive, got {width_ms}ms"
            )));
        }
        Ok(Self { width_ms })
    }

    pub fn from_secs(secs: i64) -> Result<Self> {
        Self::from_millis(secs.saturating_mul(MS_PER_SECOND))
    }

    pub fn from_minutes(minutes: i64) -> Result<Self> {
        Self::from_millis(minutes.saturating_mul(MS_PER_MINUTE))
    }

    /// Window width in milliseconds.
    #[inline]
    pub fn width_ms(&self) -> i64 {
        self.width_ms
    }

    /// Start of the window containing `ts_ms`, aligned to the epoch.
    #[inline]
    pub fn floor(&self, ts_ms: TimestampMs) -> TimestampMs {
        ts_ms - ts_ms.rem_euclid(self.width_ms)
    }

    /// Number of windows from `first` to `last` inclusive (both aligned).
    #[inline]
    pub fn window_count(&self, first: TimestampMs, last: TimestampMs) -> usize {
        ((last - first) / self.width_ms) as usize + 1
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| Error::config(format!("resolution '{s}' has no unit")))?;
        let (digits, unit) = s.split_at(split);

        let count: i64 = if digits.is_empty() {
            1
        } else {
            digits
                .parse()
                .map_err(|_| Error::config(format!("invalid resolution count in '{s}'")))?
        };

        let unit_ms = match unit {
            "ms" | "L" => 1,
            "s" | "S" => MS_PER_SECOND,
            "min" | "T" | "m" => MS_PER_MINUTE,
            "h" | "H" => MS_PER_HOUR,
            "d" | "D" => MS_PER_DAY,
            _ => return Err(Error::config(format!("unknown resolution unit in '{s}'"))),
        };

        let width_ms = count
            .checked_mul(unit_ms)
            .ok_or_else(|| Error::config(format!("resolution '{s}' is too large")))?;
        Self::from_millis(width_ms)
    }
}

impl TryFrom<String> for Resolution {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(r: Resolution) -> Self {
        r.to_string()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = self.width_ms;
        if w % MS_PER_DAY == 0 {
            write!(f, "{}d", w / MS_PER_DAY)
        } else if w % MS_PER_HOUR == 0 {
            write!(f, "{}h", w / MS_PER_HOUR)
        } else if w % MS_PER_MINUTE == 0 {
            write!(f, "{}min", w / MS_PER_MINUTE)
        } else if w % MS_PER_SECOND == 0 {
            write!(f, "{}s", w / MS_PER_SECOND)
        } else {
            write!(f, "{w}ms")
        }
    }
}

/// OHLCV bar for one window `[ts_ms, ts_ms + width)`.
///
/// Prices are `None` when no priced tick fell inside the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Window start timestamp (ms).
    pub ts_ms: TimestampMs,
    /// Open price.
    pub open: Option<f64>,
    /// High price.
    pub high: Option<f64>,
    /// Low price.
    pub low: Option<f64>,
    /// Close price.
    pub close: Option<f64>,
    /// Sum of absolute amounts.
    pub volume: f64,
    /// Number of ticks assigned to the window.
    pub trade_count: u32,
}

impl Bar {
    /// A window with no ticks.
    pub fn empty(ts_ms: TimestampMs) -> Self {
        Self {
            ts_ms,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: 0.0,
            trade_count: 0,
        }
    }

    /// True when the window has no price.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.open.is_none()
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        ts_to_datetime(self.ts_ms)
    }
}

/// Contiguous bars at a fixed resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    pub resolution: Resolution,
    pub bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(resolution: Resolution, bars: Vec<Bar>) -> Self {
        Self { resolution, bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }

    pub fn first_ts(&self) -> Option<TimestampMs> {
        self.bars.first().map(|b| b.ts_ms)
    }

    pub fn last_ts(&self) -> Option<TimestampMs> {
        self.bars.last().map(|b| b.ts_ms)
    }

    /// Total volume across all bars.
    pub fn total_volume(&self) -> f64 {
        self.bars.iter().map(|b| b.volume).sum()
    }

    /// Number of windows with no price.
    pub fn empty_count(&self) -> usize {
        self.bars.iter().filter(|b| b.is_empty()).count()
    }

    /// View each bar as a tick: window start, close price (`NaN` when
    /// unpriced), volume as amount.
    ///
    /// Windows that received no ticks are dropped; resampling refills them
    /// as empty windows.
    pub fn to_ticks(&self) -> Vec<Tick> {
        self.bars
            .iter()
            .filter(|b| b.trade_count > 0 || b.close.is_some() || b.volume > 0.0)
            .map(|b| Tick::new(b.ts_ms, b.close.unwrap_or(f64::NAN), b.volume))
            .collect()
    }
}

impl<'a> IntoIterator for &'a BarSeries {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}
