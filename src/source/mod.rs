//! Per-file table sources.
//!
//! A table source wraps one file on disk and can materialize it as a [`Table`] on demand.
//! Construction only records identity ([`SourceMeta`]): it never opens the file. Every call to
//! [`TableSource::extract_table`] re-reads and re-parses the file.
//!
//! Implementations:
//! - [`delimited::DelimitedSource`]: header line + delimiter-split rows, all text
//! - [`xml::XmlSource`]: property name/value pairs collected into attribute columns
//! - [`container::ContainerSource`]: time series from a binary measurement container,
//!   joined on rounded timestamps
//! - [`report::ReportSource`]: one row of regex-extracted fields from an instrument report

pub mod container;
pub mod delimited;
pub mod parquet;
pub mod report;
pub mod xml;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::config::SourceConfig;
use crate::error::{TableError, TableResult};
use crate::types::Table;

pub use container::{ContainerSource, SignalDecoder, TimeSeries};
pub use delimited::DelimitedSource;
pub use self::parquet::ParquetSignalDecoder;
pub use report::{split_report_units, FieldKind, ReportField, ReportSource};
pub use xml::XmlSource;

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Header line followed by delimiter-separated rows.
    Delimited,
    /// XML property dump.
    Xml,
    /// Binary measurement container (time series per signal).
    Container,
    /// Free-text instrument report.
    Report,
}

impl SourceFormat {
    /// Guess a format from a file extension (case-insensitive, leading dot optional).
    ///
    /// Plain `.txt` is ambiguous between delimited data and reports and yields `None`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" | "tsv" => Some(Self::Delimited),
            "xml" => Some(Self::Xml),
            "parquet" | "pq" => Some(Self::Container),
            _ => None,
        }
    }
}

/// Identity of a table source: where the file lives and how to call it.
///
/// `name` defaults to the file stem of `path`; it is computed on first access and cached,
/// and never depends on whether the file can be read.
#[derive(Debug, Clone)]
pub struct SourceMeta {
    path: PathBuf,
    name: OnceLock<String>,
    comment: Option<String>,
    config: Option<SourceConfig>,
}

impl SourceMeta {
    /// Record the identity of a source. Does not touch the filesystem.
    ///
    /// Fails with [`TableError::InvalidPath`] if `path` is empty.
    pub fn new(
        path: impl Into<PathBuf>,
        name: Option<String>,
        comment: Option<String>,
        config: Option<SourceConfig>,
    ) -> TableResult<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(TableError::InvalidPath {
                message: "path is empty".to_string(),
            });
        }
        let name = match name {
            Some(n) => OnceLock::from(n),
            None => OnceLock::new(),
        };
        Ok(Self {
            path,
            name,
            comment,
            config,
        })
    }

    /// Shorthand for a source with no explicit name, comment or config.
    pub fn from_path(path: impl Into<PathBuf>) -> TableResult<Self> {
        Self::new(path, None, None, None)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display name: the explicit name, or the file stem of the path.
    pub fn name(&self) -> &str {
        self.name.get_or_init(|| file_stem(&self.path))
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn config(&self) -> Option<&SourceConfig> {
        self.config.as_ref()
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Capability shared by every file format: produce a labeled table from a file.
pub trait TableSource: Send + Sync {
    /// Identity fields recorded at construction.
    fn meta(&self) -> &SourceMeta;

    fn format(&self) -> SourceFormat;

    /// Read and parse the backing file.
    ///
    /// Fails with [`TableError::NotFound`] if the file is gone and [`TableError::Parse`] if
    /// its content does not fit the format. Nothing is cached between calls.
    fn extract_table(&self) -> TableResult<Table>;

    fn path(&self) -> &Path {
        self.meta().path()
    }

    fn name(&self) -> &str {
        self.meta().name()
    }

    fn comment(&self) -> Option<&str> {
        self.meta().comment()
    }

    fn config(&self) -> Option<&SourceConfig> {
        self.meta().config()
    }

    /// Same as [`Self::extract_table`].
    fn table(&self) -> TableResult<Table> {
        self.extract_table()
    }
}

impl<T: TableSource + ?Sized> TableSource for Box<T> {
    fn meta(&self) -> &SourceMeta {
        (**self).meta()
    }

    fn format(&self) -> SourceFormat {
        (**self).format()
    }

    fn extract_table(&self) -> TableResult<Table> {
        (**self).extract_table()
    }
}

/// Sources that can be built from identity alone (format options come from the config).
pub trait FromMeta: TableSource + Sized {
    fn from_meta(meta: SourceMeta) -> Self;
}

/// Fails with `NotFound` if `path` does not exist and `Parse` if it is not a regular file.
pub(crate) fn ensure_file(path: &Path) -> TableResult<()> {
    if !path.exists() {
        return Err(TableError::NotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_file() {
        return Err(TableError::parse(path, "not a regular file"));
    }
    Ok(())
}

/// Maps an I/O error on `path` into the source error taxonomy.
pub(crate) fn io_error(path: &Path, err: std::io::Error) -> TableError {
    if err.kind() == std::io::ErrorKind::NotFound {
        TableError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        TableError::Io(err)
    }
}

/// Read a whole file as UTF-8 text.
pub(crate) fn read_text(path: &Path) -> TableResult<String> {
    ensure_file(path)?;
    let bytes = fs::read(path).map_err(|e| io_error(path, e))?;
    String::from_utf8(bytes).map_err(|e| TableError::parse(path, format!("file is not valid UTF-8: {e}")))
}

/// Read a whole file as text, replacing invalid UTF-8 sequences with U+FFFD.
pub(crate) fn read_text_lossy(path: &Path) -> TableResult<String> {
    ensure_file(path)?;
    let bytes = fs::read(path).map_err(|e| io_error(path, e))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            log::debug!("{} is not valid UTF-8, decoding lossily", path.display());
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}
