//! Multi-product dataset runs.
//!
//! Each product goes through load, validation and resampling on its own.
//! A failing product is reported and recorded as a skip; the run carries
//! on with the rest.

use std::collections::BTreeSet;

use rayon::prelude::*;
use tickbar_core::{BarSeries, ProductSeries, Resolution, SkipReason};
use tickbar_ingestion::{Event, Reporter, Resampler, SeriesLoader, SeriesValidator};

use crate::result::{DatasetResult, LoadedDataset};

/// Drives load → validate → resample over a set of products.
pub struct DatasetOrchestrator<L, R> {
    loader: L,
    reporter: R,
    validator: SeriesValidator,
    /// Worker threads (0 = one per available core).
    workers: usize,
}

impl<L: SeriesLoader, R: Reporter> DatasetOrchestrator<L, R> {
    /// Create an orchestrator running products one at a time.
    pub fn new(loader: L, reporter: R) -> Self {
        Self {
            loader,
            reporter,
            validator: SeriesValidator::new(),
            workers: 1,
        }
    }

    /// Process products on up to `workers` threads (0 = auto).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Resample every requested product to `resolution`.
    ///
    /// Products are de-duplicated and handled in lexicographic order.
    pub fn run<I, S>(&self, products: I, resolution: Resolution) -> DatasetResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let products = normalize(products);
        let resampler = Resampler::new(resolution);
        tracing::debug!(
            products = products.len(),
            workers = self.worker_count(products.len()),
            %resolution,
            "Starting dataset run"
        );

        let outcomes = self.fan_out(&products, |product| self.process(product, &resampler));

        let mut result = DatasetResult::new(resolution);
        for (product, outcome) in outcomes {
            match outcome {
                Ok(bars) => result.insert_bars(product, bars),
                Err(reason) => result.insert_skip(product, reason),
            };
        }
        result
    }

    /// Load every requested product without resampling.
    pub fn load<I, S>(&self, products: I) -> LoadedDataset
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let products = normalize(products);
        let outcomes = self.fan_out(&products, |product| self.load_one(product));

        let mut loaded = LoadedDataset::new();
        for (product, outcome) in outcomes {
            match outcome {
                Ok(series) => loaded.insert_series(series),
                Err(reason) => loaded.insert_skip(product, reason),
            };
        }
        loaded
    }

    fn load_one(&self, product: &str) -> Result<ProductSeries, SkipReason> {
        self.loader
            .load(product, &self.reporter)
            .map_err(|err| self.skip(product, err.into()))
    }

    fn process(&self, product: &str, resampler: &Resampler) -> Result<BarSeries, SkipReason> {
        let series = self.load_one(product)?;
        let series = self
            .validator
            .validate(series)
            .map_err(|reason| self.skip(product, reason))?;

        self.reporter.report(&Event::Resampling {
            product: product.to_string(),
            resolution: resampler.resolution(),
        });
        let bars = resampler
            .resample(&series)
            .map_err(|err| self.skip(product, err.into()))?;
        self.reporter.report(&Event::Resampled {
            product: product.to_string(),
            bars: bars.len(),
        });
        Ok(bars)
    }

    fn skip(&self, product: &str, reason: SkipReason) -> SkipReason {
        self.reporter.report(&Event::Skipped {
            product: product.to_string(),
            reason: reason.clone(),
        });
        reason
    }

    fn worker_count(&self, jobs: usize) -> usize {
        let workers = match self.workers {
            0 => rayon::current_num_threads(),
            n => n,
        };
        workers.min(jobs).max(1)
    }

    /// Apply `job` to every product, returning outcomes in product order.
    fn fan_out<T, F>(&self, products: &[String], job: F) -> Vec<(String, T)>
    where
        T: Send,
        F: Fn(&str) -> T + Sync,
    {
        let run = || -> Vec<(String, T)> {
            products
                .par_iter()
                .map(|p| (p.clone(), job(p.as_str())))
                .collect()
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_count(products.len()))
            .thread_name(|i| format!("tickbar-worker-{i}"))
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(err) => {
                tracing::warn!("Falling back to the global thread pool: {err}");
                run()
            }
        }
    }
}

fn normalize<I, S>(products: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    products
        .into_iter()
        .map(|p| p.as_ref().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
