//! Delimited text source (CSV, TSV, whitespace-separated measurement dumps).

use std::path::Path;

use crate::config::SourceConfig;
use crate::error::{TableError, TableResult};
use crate::types::{DataType, Schema, Table, Value};

use super::{io_error, read_text, FromMeta, SourceFormat, SourceMeta, TableSource};

/// Options read from the `delimiter` and `quoting` keys of a [`SourceConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimitedOptions {
    /// Single-byte field delimiter. Defaults to `,`.
    pub delimiter: u8,
    /// Honor RFC 4180 double quotes, as written by [`crate::export`]. Off by default.
    pub quoting: bool,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quoting: false,
        }
    }
}

impl DelimitedOptions {
    pub fn from_config(config: Option<&SourceConfig>) -> TableResult<Self> {
        let mut opts = Self::default();
        let Some(config) = config else {
            return Ok(opts);
        };

        if let Some(raw) = config.get("delimiter") {
            opts.delimiter = match raw {
                "\\t" | "tab" => b'\t',
                s if s.len() == 1 && s.is_ascii() => s.as_bytes()[0],
                _ => {
                    return Err(TableError::invalid_config(
                        "delimiter",
                        format!("expected a single ASCII character, got '{raw}'"),
                    ));
                }
            };
        }
        if let Some(quoting) = config.parse::<bool>("quoting")? {
            opts.quoting = quoting;
        }
        Ok(opts)
    }
}

/// A file whose first line names the columns and whose remaining lines are rows.
///
/// Rules:
///
/// - Surrounding whitespace of each line is dropped before splitting.
/// - Fields are split on the delimiter verbatim; quotes carry no meaning unless `quoting` is set.
/// - All values stay text ([`Value::Utf8`]); nothing is coerced.
/// - A row shorter than the header is padded with [`Value::Null`]; a longer row is a parse error.
/// - Blank lines are skipped. A file without a header line is a parse error.
/// - Rows are indexed by position.
#[derive(Debug, Clone)]
pub struct DelimitedSource {
    meta: SourceMeta,
}

impl FromMeta for DelimitedSource {
    fn from_meta(meta: SourceMeta) -> Self {
        Self { meta }
    }
}

impl TableSource for DelimitedSource {
    fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Delimited
    }

    fn extract_table(&self) -> TableResult<Table> {
        let path = self.meta.path();
        let opts = DelimitedOptions::from_config(self.meta.config())?;
        let text = read_text(path)?;
        read_delimited_str(&text, opts, path)
    }
}

fn reader_builder(opts: DelimitedOptions) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(opts.delimiter)
        .quoting(opts.quoting)
        .flexible(true);
    builder
}

/// Parse delimited text from an in-memory string. `origin` is only used in error messages.
///
/// Without quoting, every line is trimmed first. Quoted input is read as is, since a quoted
/// field may span lines.
pub fn read_delimited_str(input: &str, opts: DelimitedOptions, origin: &Path) -> TableResult<Table> {
    if opts.quoting {
        let mut rdr = reader_builder(opts).from_reader(input.as_bytes());
        return read_delimited(&mut rdr, origin);
    }
    let trimmed = trim_lines(input);
    let mut rdr = reader_builder(opts).from_reader(trimmed.as_bytes());
    read_delimited(&mut rdr, origin)
}

// Keeps blank lines so record positions still match file lines.
fn trim_lines(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for line in input.lines() {
        out.push_str(line.trim());
        out.push('\n');
    }
    out
}

/// Build a table from an existing CSV reader configured without headers.
pub fn read_delimited<R: std::io::Read>(rdr: &mut csv::Reader<R>, origin: &Path) -> TableResult<Table> {
    let mut records = rdr.records();

    let header = match records.next() {
        Some(result) => result.map_err(|e| csv_read_error(origin, e))?,
        None => return Err(TableError::parse(origin, "missing header line")),
    };
    let columns: Vec<String> = header.iter().map(str::to_owned).collect();
    let width = columns.len();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for result in records {
        let record = result.map_err(|e| csv_read_error(origin, e))?;
        if record.len() > width {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            return Err(TableError::parse(
                origin,
                format!("line {line} has {} fields, header has {width}", record.len()),
            ));
        }

        let mut row: Vec<Value> = record.iter().map(|raw| Value::Utf8(raw.to_owned())).collect();
        row.resize(width, Value::Null);
        rows.push(row);
    }

    Ok(Table::new(Schema::uniform(columns, DataType::Utf8), rows))
}

fn csv_read_error(path: &Path, err: csv::Error) -> TableError {
    if err.is_io_error() {
        match err.into_kind() {
            csv::ErrorKind::Io(io) => io_error(path, io),
            other => TableError::parse(path, format!("{other:?}")),
        }
    } else {
        TableError::parse(path, err.to_string())
    }
}
