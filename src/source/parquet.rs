//! Parquet-backed [`SignalDecoder`].
//!
//! Expected layout: one numeric time column (default `timestamp`) plus one nullable numeric
//! column per signal. A null cell means the signal was not sampled at that time, which is how
//! heterogeneous sampling rates are stored in a single wide file.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use parquet::file::reader::{ChunkReader, FileReader};
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::Field;

use crate::error::{TableError, TableResult};

use super::container::{SignalDecoder, TimeSeries};

/// Decodes measurement containers stored as Parquet files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParquetSignalDecoder {
    time_column: String,
}

impl Default for ParquetSignalDecoder {
    fn default() -> Self {
        Self::new("timestamp")
    }
}

impl ParquetSignalDecoder {
    pub fn new(time_column: impl Into<String>) -> Self {
        Self {
            time_column: time_column.into(),
        }
    }

    pub fn time_column(&self) -> &str {
        &self.time_column
    }
}

impl SignalDecoder for ParquetSignalDecoder {
    fn load_signals(&self, path: &Path, signals: &[String]) -> TableResult<BTreeMap<String, TimeSeries>> {
        let reader = SerializedFileReader::try_from(path)
            .map_err(|e| TableError::parse(path, format!("not a readable parquet file: {e}")))?;

        let available = leaf_column_paths(&reader);
        if !available.contains(self.time_column.as_str()) {
            return Err(TableError::parse(
                path,
                format!("missing time column '{}'", self.time_column),
            ));
        }

        let wanted: Vec<&String> = signals.iter().filter(|s| available.contains(s.as_str())).collect();
        let mut out: BTreeMap<String, TimeSeries> = BTreeMap::new();
        if wanted.is_empty() {
            return Ok(out);
        }

        for (idx0, row_res) in reader.into_iter().enumerate() {
            let row_num = idx0 + 1;
            let row = row_res.map_err(|e| TableError::parse(path, format!("row {row_num}: {e}")))?;

            let mut time = None;
            let mut cells: Vec<(&str, &Field)> = Vec::with_capacity(wanted.len());
            for (name, field) in row.get_column_iter() {
                if *name == self.time_column {
                    time = numeric(field).map_err(|m| TableError::parse(path, format!("row {row_num}: {m}")))?;
                } else if wanted.iter().any(|w| *w == name) {
                    cells.push((name.as_str(), field));
                }
            }
            let Some(t) = time else {
                continue;
            };

            for (name, field) in cells {
                let Some(v) = numeric(field).map_err(|m| TableError::parse(path, format!("row {row_num}: {m}")))?
                else {
                    continue;
                };
                let series = out.entry(name.to_string()).or_default();
                series.timestamps.push(t);
                series.values.push(v);
            }
        }

        Ok(out)
    }
}

fn leaf_column_paths<R: ChunkReader + 'static>(reader: &SerializedFileReader<R>) -> HashSet<String> {
    reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.path().string())
        .collect()
}

/// Numeric view of a Parquet cell. `Ok(None)` for null.
fn numeric(f: &Field) -> Result<Option<f64>, String> {
    match f {
        Field::Null => Ok(None),
        Field::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        Field::Byte(v) => Ok(Some(f64::from(*v))),
        Field::Short(v) => Ok(Some(f64::from(*v))),
        Field::Int(v) => Ok(Some(f64::from(*v))),
        Field::Long(v) => Ok(Some(*v as f64)),
        Field::UByte(v) => Ok(Some(f64::from(*v))),
        Field::UShort(v) => Ok(Some(f64::from(*v))),
        Field::UInt(v) => Ok(Some(f64::from(*v))),
        Field::ULong(v) => Ok(Some(*v as f64)),
        Field::Float(v) => Ok(Some(f64::from(*v))),
        Field::Double(v) => Ok(Some(*v)),
        other => Err(format!("expected a numeric value, got '{other}'")),
    }
}
