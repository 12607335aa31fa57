//! Command-line arguments.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tickbar_core::{Config, Resolution};

/// Load per-product tick partitions and resample them into OHLCV bars.
#[derive(Parser, Debug)]
#[command(name = "tickbar", version, about)]
pub struct Cli {
    /// Root directory, `$VAR` expanded [default: .]
    #[arg(long, value_name = "DIR")]
    pub rootdir: Option<String>,

    /// Data directory under the root [default: data]
    #[arg(long, value_name = "DIR")]
    pub datadir: Option<String>,

    /// Products to load; none means every product found
    #[arg(long, num_args = 0.., value_name = "PRODUCT")]
    pub products: Vec<String>,

    /// Source data frequency, e.g. tick or 1min [default: tick]
    #[arg(long, value_name = "FREQ")]
    pub freq: Option<String>,

    /// Bar width, e.g. 1min, 30s, 4h [default: 1min for tick data]
    #[arg(long, value_name = "WIDTH")]
    pub resample: Option<Resolution>,

    /// Worker threads, 0 for one per core [default: 0]
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Write <PRODUCT>.csv bar files into this directory
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// JSON configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. debug or tickbar=trace [default: $RUST_LOG or info]
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Merge flags over the configuration file (or defaults).
    pub fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)
                .with_context(|| format!("failed to read config {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(rootdir) = self.rootdir {
            config.paths.rootdir = rootdir;
        }
        if let Some(datadir) = self.datadir {
            config.paths.datadir = datadir;
        }
        if !self.products.is_empty() {
            config.dataset.products = self.products;
        }
        if let Some(freq) = self.freq {
            config.dataset.freq = freq;
        }
        if self.resample.is_some() {
            config.dataset.resample = self.resample;
        }
        if let Some(workers) = self.workers {
            config.dataset.workers = workers;
        }
        if self.output.is_some() {
            config.dataset.output = self.output;
        }
        Ok(config)
    }
}
