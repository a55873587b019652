//! Directory-level aggregation of table sources.
//!
//! A [`TablePool`] discovers files under a root once, owns one source per file, and answers
//! cross-file queries such as "this column from every file, side by side".
//!
//! ## Behavior
//!
//! - Membership is fixed at construction. A new pool is needed to see filesystem changes.
//! - Members are extracted lazily on every query; nothing is cached.
//! - Queries are fail-fast: the first member failure (in discovery order) aborts the call with
//!   [`TableError::Extraction`] naming that member.
//! - Every member extraction is reported to each registered [`ExtractionObserver`], and failures
//!   at or above the alert threshold additionally trigger `on_alert`.

pub mod align;
pub mod discovery;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::config::SourceConfig;
use crate::error::{TableError, TableResult};
use crate::export::{write_table, ExportOptions};
use crate::observability::{
    severity_for_error, ExtractionContext, ExtractionObserver, ExtractionSeverity, ExtractionStats,
};
use crate::source::{FromMeta, SourceMeta, TableSource};
use crate::types::{Series, Table};

pub use align::outer_union;
pub use discovery::{discover_paths, DiscoveryFilter};

/// Whether discovery found anything. Fixed for the lifetime of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Populated,
    Empty,
}

/// How members are extracted during a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionMode {
    /// One member after another on the calling thread.
    #[default]
    Serial,
    /// Members extracted on the rayon thread pool. Results keep discovery order.
    Parallel,
}

/// A fixed set of table sources discovered under one root.
pub struct TablePool<S = Box<dyn TableSource>> {
    root: PathBuf,
    members: Vec<S>,
    mode: ExtractionMode,
    observers: Vec<Arc<dyn ExtractionObserver>>,
    alert_at_or_above: ExtractionSeverity,
}

impl<S: TableSource> fmt::Debug for TablePool<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TablePool")
            .field("root", &self.root)
            .field("members", &self.names())
            .field("mode", &self.mode)
            .field("observers", &self.observers.len())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl<S: TableSource> TablePool<S> {
    /// Discover files under `root` and build one member per path with `build`.
    ///
    /// Finding nothing is not an error: the pool is [`PoolState::Empty`]. Only a failing
    /// `build` (e.g. [`TableError::InvalidPath`]) fails construction.
    pub fn new(
        root: impl AsRef<Path>,
        filter: &DiscoveryFilter,
        build: impl FnMut(PathBuf) -> TableResult<S>,
    ) -> TableResult<Self> {
        let root = root.as_ref();
        let members = discover_paths(root, filter)
            .into_iter()
            .map(build)
            .collect::<TableResult<Vec<S>>>()?;
        Ok(Self::from_members(root, members))
    }

    /// Build a pool over an explicit list of paths, skipping discovery.
    pub fn from_paths<I, P>(
        root: impl AsRef<Path>,
        paths: I,
        mut build: impl FnMut(PathBuf) -> TableResult<S>,
    ) -> TableResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let members = paths
            .into_iter()
            .map(|p| build(p.into()))
            .collect::<TableResult<Vec<S>>>()?;
        Ok(Self::from_members(root, members))
    }

    /// Wrap already-built sources. Member order is column order in query results.
    pub fn from_members(root: impl AsRef<Path>, members: Vec<S>) -> Self {
        let root = root.as_ref().to_path_buf();
        if members.is_empty() {
            log::warn!("no member files found under {}", root.display());
        } else {
            log::info!("pool over {} has {} members", root.display(), members.len());
        }
        Self {
            root,
            members,
            mode: ExtractionMode::default(),
            observers: Vec::new(),
            alert_at_or_above: ExtractionSeverity::Critical,
        }
    }

    pub fn with_mode(mut self, mode: ExtractionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Register an observer. Observers are notified in registration order.
    pub fn with_observer(mut self, observer: Arc<dyn ExtractionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Severity at which `on_alert` fires (default [`ExtractionSeverity::Critical`]).
    pub fn with_alert_threshold(mut self, severity: ExtractionSeverity) -> Self {
        self.alert_at_or_above = severity;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn members(&self) -> &[S] {
        &self.members
    }

    pub fn mode(&self) -> ExtractionMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn state(&self) -> PoolState {
        if self.members.is_empty() {
            PoolState::Empty
        } else {
            PoolState::Populated
        }
    }

    /// Member names in discovery order.
    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name()).collect()
    }

    /// First member with the given name.
    pub fn get(&self, name: &str) -> Option<&S> {
        self.members.iter().find(|m| m.name() == name)
    }

    /// Extract every member, paired with its name. Fail-fast.
    pub fn tables(&self) -> TableResult<Vec<(String, Table)>> {
        let tables = self.extract_all()?;
        Ok(self
            .members
            .iter()
            .map(|m| m.name().to_string())
            .zip(tables)
            .collect())
    }

    /// Column `key` from every member, aligned into one table.
    ///
    /// The result has one column per member, labeled with the member name, in discovery order.
    /// A member without `key` contributes an all-missing column over its own row index. Rows are
    /// the union of member row keys; gaps stay missing.
    ///
    /// An empty pool yields an empty table.
    pub fn get_signal(&self, key: &str) -> TableResult<Table> {
        let tables = self.extract_all()?;

        let series: Vec<Series> = self
            .members
            .iter()
            .zip(tables)
            .map(|(member, table)| match table.column(key) {
                Some(s) => s.with_name(member.name()),
                None => {
                    log::debug!("member '{}' has no column '{key}'", member.name());
                    Series::missing(member.name(), table.index)
                }
            })
            .collect();

        Ok(outer_union(series))
    }

    /// Write [`Self::get_signal`] for `key` to `path`. Returns the pool for chaining.
    pub fn export(&self, path: impl AsRef<Path>, key: &str, options: &ExportOptions) -> TableResult<&Self> {
        let table = self.get_signal(key)?;
        write_table(&table, path, options)?;
        Ok(self)
    }

    fn extract_all(&self) -> TableResult<Vec<Table>> {
        match self.mode {
            ExtractionMode::Serial => self
                .members
                .iter()
                .enumerate()
                .map(|(i, m)| self.extract_member(i, m))
                .collect(),
            ExtractionMode::Parallel => {
                let results: Vec<TableResult<Table>> = self
                    .members
                    .par_iter()
                    .enumerate()
                    .map(|(i, m)| self.extract_member(i, m))
                    .collect();
                results.into_iter().collect()
            }
        }
    }

    fn extract_member(&self, index: usize, member: &S) -> TableResult<Table> {
        let result = member.extract_table();
        self.notify(index, member, &result);

        result.map_err(|e| {
            log::debug!("member '{}' failed: {e}", member.name());
            TableError::Extraction {
                name: member.name().to_string(),
                path: member.path().to_path_buf(),
                source: Box::new(e),
            }
        })
    }

    fn notify(&self, index: usize, member: &S, result: &TableResult<Table>) {
        if self.observers.is_empty() {
            return;
        }
        let ctx = ExtractionContext {
            root: &self.root,
            index,
            name: member.name(),
            path: member.path(),
            format: member.format(),
        };
        match result {
            Ok(t) => {
                let stats = ExtractionStats {
                    rows: t.row_count(),
                    columns: t.column_count(),
                };
                self.observers.iter().for_each(|o| o.on_success(&ctx, stats));
            }
            Err(e) => {
                let sev = severity_for_error(e);
                let alert = sev >= self.alert_at_or_above;
                for o in &self.observers {
                    o.on_failure(&ctx, sev, e);
                    if alert {
                        o.on_alert(&ctx, sev, e);
                    }
                }
            }
        }
    }
}

impl<S: FromMeta> TablePool<S> {
    /// Discover files and build each member with [`FromMeta`], sharing `config` read-only.
    pub fn open(root: impl AsRef<Path>, filter: &DiscoveryFilter, config: Option<SourceConfig>) -> TableResult<Self> {
        Self::new(root, filter, |path| {
            let meta = SourceMeta::new(path, None, None, config.clone())?;
            Ok(S::from_meta(meta))
        })
    }
}
