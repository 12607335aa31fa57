//! PyO3 bindings for tickbar.
//!
//! Exposes to Python:
//! - Tick and bar types
//! - Fixed-width resampling of tick lists or parallel arrays
//! - Multi-product dataset runs over a partition directory

use std::collections::BTreeMap;
use std::path::PathBuf;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use tickbar_core::{
    Bar as RustBar, Error as RustError, Resolution, Tick as RustTick,
};
use tickbar_dataset::DatasetOrchestrator;
use tickbar_ingestion::{CsvPartitionLoader, NullReporter, Resampler, SeriesLoader};

fn to_py_err(err: RustError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn parse_width(width: &str) -> PyResult<Resolution> {
    width.parse().map_err(to_py_err)
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// A single trade.
#[pyclass]
#[derive(Clone)]
pub struct Tick {
    #[pyo3(get, set)]
    pub ts_ms: i64,
    #[pyo3(get, set)]
    pub price: f64,
    #[pyo3(get, set)]
    pub amount: f64,
}

#[pymethods]
impl Tick {
    #[new]
    fn new(ts_ms: i64, price: f64, amount: f64) -> Self {
        Tick { ts_ms, price, amount }
    }

    fn __repr__(&self) -> String {
        format!(
            "Tick(ts_ms={}, price={}, amount={})",
            self.ts_ms, self.price, self.amount
        )
    }
}

impl From<Tick> for RustTick {
    fn from(t: Tick) -> Self {
        RustTick::new(t.ts_ms, t.price, t.amount)
    }
}

/// OHLCV bar; prices are None for windows without trades.
#[pyclass]
#[derive(Clone)]
pub struct Bar {
    #[pyo3(get)]
    pub ts_ms: i64,
    #[pyo3(get)]
    pub open: Option<f64>,
    #[pyo3(get)]
    pub high: Option<f64>,
    #[pyo3(get)]
    pub low: Option<f64>,
    #[pyo3(get)]
    pub close: Option<f64>,
    #[pyo3(get)]
    pub volume: f64,
    #[pyo3(get)]
    pub trade_count: u32,
}

#[pymethods]
impl Bar {
    #[getter]
    fn is_empty(&self) -> bool {
        self.open.is_none()
    }

    fn __repr__(&self) -> String {
        fn px(p: Option<f64>) -> String {
            p.map_or_else(|| "None".to_string(), |v| v.to_string())
        }
        format!(
            "Bar(ts_ms={}, open={}, high={}, low={}, close={}, volume={})",
            self.ts_ms,
            px(self.open),
            px(self.high),
            px(self.low),
            px(self.close),
            self.volume
        )
    }
}

impl From<RustBar> for Bar {
    fn from(b: RustBar) -> Self {
        Bar {
            ts_ms: b.ts_ms,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
            trade_count: b.trade_count,
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Resample ticks into contiguous bars of the given width (e.g. "1min").
#[pyfunction]
fn resample(py: Python<'_>, ticks: Vec<Tick>, width: &str) -> PyResult<Vec<Bar>> {
    let resampler = Resampler::new(parse_width(width)?);
    let ticks: Vec<RustTick> = ticks.into_iter().map(Into::into).collect();
    let bars = py
        .allow_threads(|| resampler.resample_ticks(&ticks))
        .map_err(to_py_err)?;
    Ok(bars.into_iter().map(Into::into).collect())
}

/// Resample parallel timestamp/price/amount arrays.
#[pyfunction]
fn resample_arrays(
    py: Python<'_>,
    ts_ms: Vec<i64>,
    prices: Vec<f64>,
    amounts: Vec<f64>,
    width: &str,
) -> PyResult<Vec<Bar>> {
    if ts_ms.len() != prices.len() || ts_ms.len() != amounts.len() {
        return Err(PyValueError::new_err(format!(
            "array lengths differ: ts_ms={}, prices={}, amounts={}",
            ts_ms.len(),
            prices.len(),
            amounts.len()
        )));
    }
    let resampler = Resampler::new(parse_width(width)?);
    let ticks: Vec<RustTick> = ts_ms
        .into_iter()
        .zip(prices)
        .zip(amounts)
        .map(|((ts, price), amount)| RustTick::new(ts, price, amount))
        .collect();
    let bars = py
        .allow_threads(|| resampler.resample_ticks(&ticks))
        .map_err(to_py_err)?;
    Ok(bars.into_iter().map(Into::into).collect())
}

// ============================================================================
// Engine Classes
// ============================================================================

/// Partition directory reader and multi-product resampler.
#[pyclass]
pub struct PyDataset {
    datadir: PathBuf,
    freq: String,
    workers: usize,
}

#[pymethods]
impl PyDataset {
    #[new]
    #[pyo3(signature = (datadir, freq = "tick".to_string(), workers = 0))]
    fn new(datadir: PathBuf, freq: String, workers: usize) -> Self {
        PyDataset {
            datadir,
            freq,
            workers,
        }
    }

    /// Product directories available under `<datadir>/<freq>`.
    fn products(&self) -> PyResult<Vec<String>> {
        CsvPartitionLoader::new(&self.datadir, &self.freq)
            .products()
            .map_err(to_py_err)
    }

    /// Resample the given products (all when None).
    ///
    /// Returns `(bars_by_product, skip_reason_by_product)`.
    #[pyo3(signature = (products = None, width = "1min"))]
    fn run(
        &self,
        py: Python<'_>,
        products: Option<Vec<String>>,
        width: &str,
    ) -> PyResult<(BTreeMap<String, Vec<Bar>>, BTreeMap<String, String>)> {
        let resolution = parse_width(width)?;
        let loader = CsvPartitionLoader::new(&self.datadir, &self.freq);
        let products = match products {
            Some(products) => products,
            None => loader.products().map_err(to_py_err)?,
        };
        let orchestrator = DatasetOrchestrator::new(loader, NullReporter).with_workers(self.workers);

        let result = py.allow_threads(|| orchestrator.run(&products, resolution));

        let skipped = result
            .skipped()
            .map(|(product, reason)| (product.to_string(), reason.to_string()))
            .collect();
        let bars = result
            .into_bars()
            .into_iter()
            .map(|(product, series)| (product, series.bars.into_iter().map(Into::into).collect()))
            .collect();
        Ok((bars, skipped))
    }
}

// ============================================================================
// Module Definition
// ============================================================================

/// tickbar - tick to OHLCV bar resampling for Python.
#[pymodule]
fn tickbar(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Tick>()?;
    m.add_class::<Bar>()?;
    m.add_class::<PyDataset>()?;

    m.add_function(wrap_pyfunction!(resample, m)?)?;
    m.add_function(wrap_pyfunction!(resample_arrays, m)?)?;

    Ok(())
}
