//! Instrument report source.
//!
//! Reports are free text. A fixed list of [`ReportField`]s (a label, a regex and a value kind)
//! is matched against the whole file and the captures become exactly one row.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::error::{TableError, TableResult};
use crate::types::{DataType, Field, Schema, Table, Value};

use super::{io_error, read_text_lossy, FromMeta, SourceFormat, SourceMeta, TableSource};

/// Marker line that starts every unit in a concatenated report.
pub const UNIT_MARKER: &str = "Test Results Report";

/// How a captured string is converted into a cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Float,
    Integer,
}

impl FieldKind {
    fn data_type(self) -> DataType {
        match self {
            FieldKind::Text => DataType::Utf8,
            FieldKind::Float => DataType::Float64,
            FieldKind::Integer => DataType::Int64,
        }
    }

    fn convert(self, raw: &str) -> Option<Value> {
        let raw = raw.trim();
        match self {
            FieldKind::Text => Some(Value::Utf8(raw.to_string())),
            FieldKind::Float => raw.parse::<f64>().ok().map(Value::Float64),
            FieldKind::Integer => raw.parse::<i64>().ok().map(Value::Int64),
        }
    }
}

/// One labeled extraction. The first capture group (or the whole match if there is none)
/// provides the value.
#[derive(Debug, Clone)]
pub struct ReportField {
    pub name: String,
    pub pattern: Regex,
    pub kind: FieldKind,
}

impl ReportField {
    /// Fails with [`TableError::InvalidConfig`] if `pattern` is not a valid regex.
    pub fn new(name: impl Into<String>, pattern: &str, kind: FieldKind) -> TableResult<Self> {
        let name = name.into();
        let pattern = Regex::new(pattern).map_err(|e| TableError::invalid_config(name.clone(), e.to_string()))?;
        Ok(Self { name, pattern, kind })
    }

    /// Match against `content`. A missing match or an unconvertible capture yields `Null`.
    pub fn extract(&self, content: &str) -> Value {
        let Some(caps) = self.pattern.captures(content) else {
            return Value::Null;
        };
        let Some(m) = caps.get(1).or_else(|| caps.get(0)) else {
            return Value::Null;
        };
        match self.kind.convert(m.as_str()) {
            Some(v) => v,
            None => {
                log::debug!("report field '{}' captured unconvertible '{}'", self.name, m.as_str());
                Value::Null
            }
        }
    }
}

const DEFAULT_FIELD_SPECS: [(&str, &str, FieldKind); 10] = [
    ("Filename", r"File Name:\s+(\S+)", FieldKind::Text),
    ("Date", r"Report Date:\s+(\w+\s+\d+,\s+\d+)", FieldKind::Text),
    ("Time", r"Time:\s+(\d{1,2}:\d{2}:\d{2})", FieldKind::Text),
    ("NTC1_measured [KOhm]", r"NTC1\s+\d+\.\d+K\s+\d+\.\d+\w+\s+(\d+\.\d+)K", FieldKind::Float),
    ("NTC2_measured [KOhm]", r"NTC2\s+\d+\.\d+K\s+\d+\.\d+\w+\s+(\d+\.\d+)K", FieldKind::Float),
    ("Cap1_measured [pF]", r"C1\s+\d+\.\d+p\s+\d+\.\d+\w+\s+(\d+\.\d+)pF", FieldKind::Float),
    ("Cap2_measured [pF]", r"C2\s+\d+\.\d+p\s+\d+\.\d+\w+\s+(\d+\.\d+)pF", FieldKind::Float),
    (
        "IsoRes1_measured [MOhm]",
        r"5-51_Op\s+\d+\.\d+M\s+\D\s\d+\s\w\s+([><]?\s?\d+[\.\d+\s]?\s)M",
        FieldKind::Text,
    ),
    (
        "IsoRes2_measured [MOhm]",
        r"6-52_Op\s+\d+\.\d+M\s+\D\s\d+\s\w\s+([><]?\s?\d+[\.\d+\s]?\s)M",
        FieldKind::Text,
    ),
    ("Failure", r"Failures: \s+(\d+)", FieldKind::Integer),
];

static DEFAULT_FIELDS: LazyLock<Arc<[ReportField]>> = LazyLock::new(|| {
    DEFAULT_FIELD_SPECS
        .iter()
        .map(|(name, pattern, kind)| {
            ReportField::new(*name, pattern, *kind).expect("built-in report patterns are valid")
        })
        .collect()
});

/// The built-in field set for cell test reports (NTC, capacitance and insulation readings).
pub fn default_report_fields() -> Vec<ReportField> {
    DEFAULT_FIELDS.to_vec()
}

/// Table source over a single instrument report. Always yields one row, index `[0]`.
///
/// The report is decoded lossily, so a stray non-UTF-8 byte only affects the fields it falls in.
#[derive(Debug, Clone)]
pub struct ReportSource {
    meta: SourceMeta,
    fields: Arc<[ReportField]>,
}

impl ReportSource {
    pub fn with_fields(meta: SourceMeta, fields: Vec<ReportField>) -> Self {
        Self {
            meta,
            fields: fields.into(),
        }
    }

    pub fn fields(&self) -> &[ReportField] {
        &self.fields
    }
}

impl FromMeta for ReportSource {
    fn from_meta(meta: SourceMeta) -> Self {
        Self {
            meta,
            fields: Arc::clone(&*DEFAULT_FIELDS),
        }
    }
}

impl TableSource for ReportSource {
    fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Report
    }

    fn extract_table(&self) -> TableResult<Table> {
        let content = read_text_lossy(self.meta.path())?;
        Ok(extract_report(&content, &self.fields))
    }
}

/// Apply `fields` to `content`, producing a one-row table.
pub fn extract_report(content: &str, fields: &[ReportField]) -> Table {
    let schema = Schema::new(
        fields
            .iter()
            .map(|f| Field::new(f.name.clone(), f.kind.data_type()))
            .collect(),
    );
    let row = fields.iter().map(|f| f.extract(content)).collect();
    Table::new(schema, vec![row])
}

/// Split a concatenated report into one file per unit.
///
/// Units start at [`UNIT_MARKER`]. Blank lines and ` ===` rule lines are dropped and the
/// remaining lines are trimmed. Unit `n` (1-based, counted over all units including empty ones)
/// is written to `<output_dir>/<input stem>_split_<n>.txt`. Returns the written paths.
/// Bytes that are not valid UTF-8 are written out as U+FFFD.
pub fn split_report_units(input: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> TableResult<Vec<PathBuf>> {
    let input = input.as_ref();
    let output_dir = output_dir.as_ref();
    let content = read_text_lossy(input)?;
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());

    fs::create_dir_all(output_dir).map_err(|e| io_error(output_dir, e))?;

    let mut written = Vec::new();
    for (i, unit) in content.split(UNIT_MARKER).skip(1).enumerate() {
        let lines: Vec<&str> = unit
            .lines()
            .filter(|l| !l.trim().is_empty() && !l.starts_with(" ==="))
            .map(str::trim)
            .collect();
        if lines.is_empty() {
            continue;
        }
        let out = output_dir.join(format!("{stem}_split_{}.txt", i + 1));
        fs::write(&out, lines.join("\n")).map_err(|e| io_error(&out, e))?;
        written.push(out);
    }

    log::debug!("split {} into {} units", input.display(), written.len());
    Ok(written)
}
