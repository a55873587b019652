//! `measure-pool` turns directories of heterogeneous measurement files into labeled tables and
//! answers cross-file questions about them.
//!
//! Two layers:
//!
//! - a [`source::TableSource`] wraps one file and extracts it as a [`types::Table`] on demand
//! - a [`pool::TablePool`] discovers many files under a root and pulls one named column out of
//!   every member, aligned side by side ([`pool::TablePool::get_signal`])
//!
//! ## Supported sources
//!
//! - **Delimited text** ([`source::DelimitedSource`]): header line plus delimiter-separated rows
//!   (comma by default; tab or space via the `delimiter` option). Values stay text.
//! - **XML property dumps** ([`source::XmlSource`]): name/value properties collected into
//!   attribute columns.
//! - **Measurement containers** ([`source::ContainerSource`]): per-signal time series from a
//!   [`source::SignalDecoder`] (Parquet out of the box), joined on rounded timestamps and
//!   gap-filled.
//! - **Instrument reports** ([`source::ReportSource`]): one row of regex-extracted fields.
//!
//! ## Timing of errors
//!
//! Constructing a source or a pool never reads file contents. Only an empty path fails at
//! construction ([`TableError::InvalidPath`]); missing or malformed files surface when a table
//! is extracted, wrapped in [`TableError::Extraction`] when the pool is the caller.
//!
//! ## Quick example
//!
//! ```no_run
//! use measure_pool::pool::{DiscoveryFilter, TablePool};
//! use measure_pool::source::DelimitedSource;
//!
//! # fn main() -> Result<(), measure_pool::TableError> {
//! let filter = DiscoveryFilter::new().with_extension(".txt");
//! let pool: TablePool<DelimitedSource> = TablePool::open("measurements/", &filter, None)?;
//!
//! // One column per file, labeled with the file stem.
//! let signal = pool.get_signal("col_5")?;
//! println!("{:?} rows={}", signal.column_names(), signal.row_count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Pools from a config file
//!
//! ```no_run
//! use measure_pool::config::PoolConfig;
//! use measure_pool::export::ExportOptions;
//!
//! # fn main() -> Result<(), measure_pool::TableError> {
//! let cfg = PoolConfig::from_json_str(
//!     r#"{"root": "runs/", "extension": ".parquet", "source": {"signals": "p_MC_Model"}, "parallel": true}"#,
//! )?;
//! cfg.open()?
//!     .export("p_mc.csv", "p_MC_Model", &ExportOptions::default())?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod observability;
pub mod pool;
pub mod source;
pub mod types;

pub use error::{ErrorKind, TableError, TableResult};
pub use pool::{PoolState, TablePool};
pub use source::{SourceFormat, SourceMeta, TableSource};
pub use types::{Series, Table, Value};
