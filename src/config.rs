//! Configuration: per-source format options and file-backed pool descriptions.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TableError, TableResult};
use crate::pool::{DiscoveryFilter, ExtractionMode, TablePool};
use crate::source::{
    ContainerSource, DelimitedSource, FromMeta, ParquetSignalDecoder, ReportSource, SourceFormat, SourceMeta,
    TableSource, XmlSource,
};

/// Format-specific options for a table source, as a flat string map.
///
/// The map is only ever read by extraction code; sources parse typed option structs out of it
/// each time they extract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceConfig(BTreeMap<String, String>);

impl SourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-separated list value, trimmed, empty items dropped.
    pub fn list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    /// Parse a value with [`FromStr`]; `Ok(None)` when the key is absent.
    pub fn parse<T>(&self, key: &str) -> TableResult<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| TableError::invalid_config(key, format!("{e} (raw='{raw}')"))),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for SourceConfig
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A pool description that can be stored as JSON.
///
/// ```json
/// {
///   "root": "measurements/2024-04-26",
///   "extension": ".csv",
///   "pattern": "^bench_",
///   "source": { "delimiter": ";" },
///   "parallel": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Directory scanned for member files.
    pub root: PathBuf,
    /// Regex matched against each file name.
    #[serde(default)]
    pub pattern: Option<String>,
    /// File-name suffix filter (e.g. `.csv`).
    #[serde(default)]
    pub extension: Option<String>,
    /// Source format. If `None`, inferred from `extension`.
    #[serde(default)]
    pub format: Option<SourceFormat>,
    /// Options passed to every member source.
    #[serde(default)]
    pub source: SourceConfig,
    /// Extract members on the rayon thread pool.
    #[serde(default)]
    pub parallel: bool,
}

impl PoolConfig {
    pub fn from_json_str(input: &str) -> TableResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> TableResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| crate::source::io_error(path, e))?;
        Self::from_json_str(&text)
    }

    /// The configured format, or the one implied by `extension`.
    pub fn resolved_format(&self) -> TableResult<SourceFormat> {
        if let Some(f) = self.format {
            return Ok(f);
        }
        let ext = self.extension.as_deref().ok_or_else(|| {
            TableError::invalid_config("format", "no format given and no extension to infer it from")
        })?;
        SourceFormat::from_extension(ext).ok_or_else(|| {
            TableError::invalid_config("format", format!("cannot infer format from extension '{ext}'"))
        })
    }

    pub fn filter(&self) -> TableResult<DiscoveryFilter> {
        let mut filter = DiscoveryFilter::new();
        if let Some(p) = self.pattern.as_deref() {
            filter = filter.with_pattern(p)?;
        }
        if let Some(ext) = self.extension.as_deref() {
            filter = filter.with_extension(ext);
        }
        Ok(filter)
    }

    /// Discover member files and build a pool of type-erased sources.
    pub fn open(&self) -> TableResult<TablePool<Box<dyn TableSource>>> {
        let format = self.resolved_format()?;
        let filter = self.filter()?;
        let options = (!self.source.is_empty()).then(|| self.source.clone());

        let pool = TablePool::new(&self.root, &filter, |path| {
            let meta = SourceMeta::new(path, None, None, options.clone())?;
            Ok(boxed_source(format, meta))
        })?;

        let mode = if self.parallel {
            ExtractionMode::Parallel
        } else {
            ExtractionMode::Serial
        };
        Ok(pool.with_mode(mode))
    }
}

fn boxed_source(format: SourceFormat, meta: SourceMeta) -> Box<dyn TableSource> {
    match format {
        SourceFormat::Delimited => Box::new(DelimitedSource::from_meta(meta)),
        SourceFormat::Xml => Box::new(XmlSource::from_meta(meta)),
        SourceFormat::Container => Box::new(ContainerSource::<ParquetSignalDecoder>::from_meta(meta)),
        SourceFormat::Report => Box::new(ReportSource::from_meta(meta)),
    }
}
