//! Per-run dataset outputs.

use std::collections::btree_map::{self, Entry};
use std::collections::BTreeMap;

use tickbar_core::{BarSeries, ProductSeries, Resolution, SkipReason};

/// Bars for every product that made it through, plus why the rest didn't.
///
/// Each product appears at most once, either with bars or with a skip
/// reason.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetResult {
    resolution: Resolution,
    bars: BTreeMap<String, BarSeries>,
    skipped: BTreeMap<String, SkipReason>,
}

impl DatasetResult {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            bars: BTreeMap::new(),
            skipped: BTreeMap::new(),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Store bars for a product not seen before. Returns `false` and leaves
    /// the result untouched otherwise.
    pub fn insert_bars(&mut self, product: impl Into<String>, bars: BarSeries) -> bool {
        let product = product.into();
        if self.skipped.contains_key(&product) {
            return false;
        }
        match self.bars.entry(product) {
            Entry::Vacant(slot) => {
                slot.insert(bars);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Record a skip for a product not seen before. Same rules as
    /// [`insert_bars`](Self::insert_bars).
    pub fn insert_skip(&mut self, product: impl Into<String>, reason: SkipReason) -> bool {
        let product = product.into();
        if self.bars.contains_key(&product) {
            return false;
        }
        match self.skipped.entry(product) {
            Entry::Vacant(slot) => {
                slot.insert(reason);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, product: &str) -> Option<&BarSeries> {
        self.bars.get(product)
    }

    pub fn skip_reason(&self, product: &str) -> Option<&SkipReason> {
        self.skipped.get(product)
    }

    /// Products with bars, in order.
    pub fn products(&self) -> impl Iterator<Item = &str> {
        self.bars.keys().map(String::as_str)
    }

    /// Skipped products and their reasons, in order.
    pub fn skipped(&self) -> impl Iterator<Item = (&str, &SkipReason)> {
        self.skipped.iter().map(|(p, r)| (p.as_str(), r))
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, BarSeries> {
        self.bars.iter()
    }

    /// Number of products with bars.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn skipped_len(&self) -> usize {
        self.skipped.len()
    }

    pub fn into_bars(self) -> BTreeMap<String, BarSeries> {
        self.bars
    }
}

/// Loaded (not resampled) series per product.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedDataset {
    series: BTreeMap<String, ProductSeries>,
    skipped: BTreeMap<String, SkipReason>,
}

impl LoadedDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_series(&mut self, series: ProductSeries) -> bool {
        if self.skipped.contains_key(&series.product) {
            return false;
        }
        match self.series.entry(series.product.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(series);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn insert_skip(&mut self, product: impl Into<String>, reason: SkipReason) -> bool {
        let product = product.into();
        if self.series.contains_key(&product) {
            return false;
        }
        match self.skipped.entry(product) {
            Entry::Vacant(slot) => {
                slot.insert(reason);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, product: &str) -> Option<&ProductSeries> {
        self.series.get(product)
    }

    pub fn skip_reason(&self, product: &str) -> Option<&SkipReason> {
        self.skipped.get(product)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ProductSeries> {
        self.series.iter()
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, &SkipReason)> {
        self.skipped.iter().map(|(p, r)| (p.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Total ticks across all loaded products.
    pub fn tick_count(&self) -> usize {
        self.series.values().map(ProductSeries::len).sum()
    }
}
