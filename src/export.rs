//! Writing tables to disk.
//!
//! CSV is always available. XLSX needs the Cargo feature `excel`.

use std::path::Path;

use crate::error::{TableError, TableResult};
use crate::source::io_error;
use crate::types::{Table, Value};

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
}

impl ExportFormat {
    /// `csv`, `tsv`, `txt` map to CSV; `xlsx` to Excel. Leading dot optional.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" | "tsv" | "txt" => Some(Self::Csv),
            "xlsx" => Some(Self::Excel),
            _ => None,
        }
    }
}

/// Options for [`write_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// If `None`, inferred from the output path extension.
    pub format: Option<ExportFormat>,
    /// Write the row index as the first column.
    pub include_index: bool,
    /// Header of the index column when `include_index` is set.
    pub index_label: String,
    /// Field delimiter for CSV output.
    pub delimiter: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: None,
            include_index: false,
            index_label: "index".to_string(),
            delimiter: b',',
        }
    }
}

/// Write `table` to `path`. Missing values are written as empty cells.
pub fn write_table(table: &Table, path: impl AsRef<Path>, options: &ExportOptions) -> TableResult<()> {
    let path = path.as_ref();
    let format = match options.format {
        Some(f) => f,
        None => infer_format(path)?,
    };

    match format {
        ExportFormat::Csv => write_csv(table, path, options),
        ExportFormat::Excel => write_excel(table, path, options),
    }?;

    log::debug!(
        "exported {} rows x {} columns to {}",
        table.row_count(),
        table.column_count(),
        path.display()
    );
    Ok(())
}

fn infer_format(path: &Path) -> TableResult<ExportFormat> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    ExportFormat::from_extension(ext).ok_or_else(|| {
        TableError::invalid_config(
            "format",
            format!("cannot infer export format from '{}'", path.display()),
        )
    })
}

fn write_csv(table: &Table, path: &Path, options: &ExportOptions) -> TableResult<()> {
    let file = std::fs::File::create(path).map_err(|e| io_error(path, e))?;
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(file);

    let mut header: Vec<&str> = Vec::with_capacity(table.column_count() + 1);
    if options.include_index {
        header.push(&options.index_label);
    }
    header.extend(table.schema.field_names());
    wtr.write_record(&header)?;

    for (key, row) in table.index.iter().zip(&table.rows) {
        let mut record: Vec<String> = Vec::with_capacity(row.len() + 1);
        if options.include_index {
            record.push(key.to_string());
        }
        record.extend(row.iter().map(Value::to_string));
        wtr.write_record(&record)?;
    }

    wtr.flush().map_err(|e| io_error(path, e))?;
    Ok(())
}

#[cfg(feature = "excel")]
fn write_excel(table: &Table, path: &Path, options: &ExportOptions) -> TableResult<()> {
    use rust_xlsxwriter::Workbook;

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    let offset: u16 = if options.include_index { 1 } else { 0 };
    if options.include_index {
        sheet.write_string(0, 0, &options.index_label)?;
    }
    for (c, name) in table.schema.field_names().enumerate() {
        sheet.write_string(0, c as u16 + offset, name)?;
    }

    for (r, (key, row)) in table.index.iter().zip(&table.rows).enumerate() {
        let r = r as u32 + 1;
        if options.include_index {
            sheet.write_number(r, 0, *key as f64)?;
        }
        for (c, value) in row.iter().enumerate() {
            let c = c as u16 + offset;
            match value {
                Value::Null => {}
                Value::Int64(v) => {
                    sheet.write_number(r, c, *v as f64)?;
                }
                Value::Float64(v) => {
                    sheet.write_number(r, c, *v)?;
                }
                Value::Bool(v) => {
                    sheet.write_boolean(r, c, *v)?;
                }
                Value::Utf8(v) => {
                    sheet.write_string(r, c, v)?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

#[cfg(not(feature = "excel"))]
fn write_excel(_table: &Table, _path: &Path, _options: &ExportOptions) -> TableResult<()> {
    Err(TableError::invalid_config(
        "format",
        "excel export not enabled (enable cargo feature 'excel')",
    ))
}
