use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type used across sources, pools and exports.
pub type TableResult<T> = Result<T, TableError>;

/// Error type returned by table sources, table pools and exports.
///
/// Construction only ever fails with [`TableError::InvalidPath`]. Everything else surfaces
/// when a table is actually extracted (or exported).
#[derive(Debug, Error)]
pub enum TableError {
    /// The path given at construction is structurally unusable (e.g. empty).
    #[error("invalid path: {message}")]
    InvalidPath { message: String },

    /// The backing file does not exist at extraction time.
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The file exists but its content does not match the expected layout.
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// A format option in [`crate::config::SourceConfig`] (or a pool config) is malformed.
    #[error("invalid config value for '{key}': {message}")]
    InvalidConfig { key: String, message: String },

    /// A pool member failed while the pool was aggregating tables.
    #[error("extraction failed for member '{name}' ({}): {source}", path.display())]
    Extraction {
        name: String,
        path: PathBuf,
        #[source]
        source: Box<TableError>,
    },

    /// Underlying I/O error (e.g. permission denied while exporting).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet decoder error that is not a structural parse problem.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Pool config could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "excel")]
    /// Spreadsheet writer error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] rust_xlsxwriter::XlsxError),
}

/// Coarse classification of a [`TableError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidPath,
    NotFound,
    Parse,
    Extraction,
    Config,
    Io,
}

impl TableError {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns the error's place in the taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPath { .. } => ErrorKind::InvalidPath,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Parse { .. } | Self::Parquet(_) => ErrorKind::Parse,
            Self::Extraction { .. } => ErrorKind::Extraction,
            Self::InvalidConfig { .. } | Self::Json(_) => ErrorKind::Config,
            Self::Io(_) | Self::Csv(_) => ErrorKind::Io,
            #[cfg(feature = "excel")]
            Self::Excel(_) => ErrorKind::Io,
        }
    }

    /// For [`TableError::Extraction`], the kind of the wrapped member failure; otherwise
    /// the same as [`Self::kind`].
    pub fn root_kind(&self) -> ErrorKind {
        match self {
            Self::Extraction { source, .. } => source.root_kind(),
            other => other.kind(),
        }
    }
}
