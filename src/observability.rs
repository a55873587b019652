//! Per-member extraction reporting for [`crate::pool::TablePool`].

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{ErrorKind, TableError, TableResult};
use crate::source::{io_error, SourceFormat};

/// Severity the pool assigns to a failed member extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExtractionSeverity {
    /// The member's content could not be turned into a table.
    Error,
    /// The member's file could not be reached at all (missing, unreadable).
    Critical,
}

/// Which member of which pool an event is about.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
    /// Pool root the member was discovered under.
    pub root: &'a Path,
    /// Position of the member in discovery order, which is also its column position.
    pub index: usize,
    pub name: &'a str,
    pub path: &'a Path,
    pub format: SourceFormat,
}

/// Shape of a successfully extracted table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionStats {
    pub rows: usize,
    pub columns: usize,
}

/// Observer interface for member extraction outcomes.
///
/// A pool calls its observers from whichever thread extracted the member, so in
/// [`crate::pool::ExtractionMode::Parallel`] callbacks arrive out of member order.
pub trait ExtractionObserver: Send + Sync {
    fn on_success(&self, _ctx: &ExtractionContext<'_>, _stats: ExtractionStats) {}

    fn on_failure(&self, _ctx: &ExtractionContext<'_>, _severity: ExtractionSeverity, _error: &TableError) {}

    /// Called when a failure meets the pool's alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &ExtractionContext<'_>, severity: ExtractionSeverity, error: &TableError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Severity the pool assigns to a member failure.
///
/// Missing files and I/O failures are `Critical`; content problems are `Error`.
pub fn severity_for_error(e: &TableError) -> ExtractionSeverity {
    match e.root_kind() {
        ErrorKind::NotFound | ErrorKind::Io => ExtractionSeverity::Critical,
        _ => ExtractionSeverity::Error,
    }
}

/// Forwards events to the `log` facade.
///
/// Successes log at `debug`, failures at `warn`, alerts at `error`.
#[derive(Debug, Default)]
pub struct LogObserver;

impl ExtractionObserver for LogObserver {
    fn on_success(&self, ctx: &ExtractionContext<'_>, stats: ExtractionStats) {
        log::debug!(
            "member #{} '{}' ({:?}) extracted {}x{} from {}",
            ctx.index,
            ctx.name,
            ctx.format,
            stats.rows,
            stats.columns,
            ctx.path.display()
        );
    }

    fn on_failure(&self, ctx: &ExtractionContext<'_>, severity: ExtractionSeverity, error: &TableError) {
        log::warn!(
            "member #{} '{}' of {} failed ({severity:?}): {error}",
            ctx.index,
            ctx.name,
            ctx.root.display()
        );
    }

    fn on_alert(&self, ctx: &ExtractionContext<'_>, severity: ExtractionSeverity, error: &TableError) {
        log::error!(
            "ALERT member #{} '{}' of {} failed ({severity:?}): {error}",
            ctx.index,
            ctx.name,
            ctx.root.display()
        );
    }
}

/// Appends a tab-separated extraction ledger to a file, one record per event.
///
/// Columns: `unix_ms`, `event` (`ok`, `fail` or `alert`), member `index`, member `name`,
/// `format`, member `path`, and a detail field. The detail is `<rows>x<columns>` for `ok`
/// and `<severity>/<error kind>: <message>` otherwise. Tabs and newlines inside fields are
/// replaced by spaces.
///
/// The file is opened once, in append mode. A record that cannot be written is logged and
/// dropped; extraction itself is never affected.
#[derive(Debug)]
pub struct FileObserver {
    writer: Mutex<BufWriter<File>>,
}

impl FileObserver {
    pub fn create(path: impl AsRef<Path>) -> TableResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| io_error(path, e))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn record(&self, event: &str, ctx: &ExtractionContext<'_>, detail: &str) {
        let line = [
            unix_ms().to_string(),
            event.to_string(),
            ctx.index.to_string(),
            field(ctx.name),
            format!("{:?}", ctx.format),
            field(&ctx.path.display().to_string()),
            field(detail),
        ]
        .join("\t");

        let Ok(mut w) = self.writer.lock() else {
            log::warn!("extraction ledger lock poisoned, dropping '{event}' for '{}'", ctx.name);
            return;
        };
        if let Err(e) = writeln!(w, "{line}").and_then(|_| w.flush()) {
            log::warn!("cannot write extraction ledger record for '{}': {e}", ctx.name);
        }
    }
}

impl ExtractionObserver for FileObserver {
    fn on_success(&self, ctx: &ExtractionContext<'_>, stats: ExtractionStats) {
        self.record("ok", ctx, &format!("{}x{}", stats.rows, stats.columns));
    }

    fn on_failure(&self, ctx: &ExtractionContext<'_>, severity: ExtractionSeverity, error: &TableError) {
        self.record("fail", ctx, &failure_detail(severity, error));
    }

    fn on_alert(&self, ctx: &ExtractionContext<'_>, severity: ExtractionSeverity, error: &TableError) {
        self.record("alert", ctx, &failure_detail(severity, error));
    }
}

fn failure_detail(severity: ExtractionSeverity, error: &TableError) -> String {
    format!("{severity:?}/{:?}: {error}", error.root_kind())
}

fn field(raw: &str) -> String {
    raw.replace(['\t', '\n', '\r'], " ")
}

fn unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
