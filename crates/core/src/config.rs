//! Configuration structures for the tickbar system.

use crate::error::{Error, Result};
use crate::types::Resolution;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source resolution whose partitions hold raw ticks.
pub const TICK_FREQ: &str = "tick";

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Filesystem locations.
    pub paths: PathsConfig,
    /// Dataset selection and resampling.
    pub dataset: DatasetConfig,
}

impl Config {
    /// Load a configuration from a JSON file. Missing keys take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Resolution to resample to: explicit `resample`, else one minute for
    /// tick data, else none (load only).
    pub fn effective_resolution(&self) -> Option<Resolution> {
        match self.dataset.resample {
            Some(r) => Some(r),
            None if self.dataset.freq == TICK_FREQ => Some(Resolution::MINUTE),
            None => None,
        }
    }
}

/// Root and data directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root directory; `$VAR` / `${VAR}` are expanded.
    pub rootdir: String,
    /// Data directory, relative to the root.
    pub datadir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            rootdir: ".".to_string(),
            datadir: "data".to_string(),
        }
    }
}

impl PathsConfig {
    /// Expanded root directory.
    pub fn root(&self) -> PathBuf {
        PathBuf::from(expand_vars(&self.rootdir))
    }

    /// Root joined with the data directory.
    pub fn data(&self) -> PathBuf {
        self.root().join(&self.datadir)
    }

    /// Check both directories exist and return the data directory.
    pub fn resolve(&self) -> Result<PathBuf> {
        let root = self.root();
        if !root.is_dir() {
            return Err(Error::RootMissing(root));
        }
        let data = root.join(&self.datadir);
        if !data.is_dir() {
            return Err(Error::DataDirMissing(data));
        }
        Ok(data)
    }
}

/// Dataset selection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Products to process; empty means every product found.
    pub products: Vec<String>,
    /// Source resolution directory (e.g. "tick", "1min").
    pub freq: String,
    /// Target bar resolution.
    pub resample: Option<Resolution>,
    /// Number of worker threads (0 = auto).
    pub workers: usize,
    /// Directory to write per-product bar files into.
    pub output: Option<PathBuf>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            products: Vec::new(),
            freq: TICK_FREQ.to_string(),
            resample: None,
            workers: 0,
            output: None,
        }
    }
}

/// Expand `$VAR` and `${VAR}` from the environment.
///
/// Unset variables and malformed references are left as written.
pub fn expand_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match std::env::var(name) {
            Ok(value) if !name.is_empty() => out.push_str(&value),
            _ => out.push_str(&rest[pos..pos + 1 + consumed]),
        }
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}
