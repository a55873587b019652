//! Core data model types.
//!
//! Every table source materializes its file as a [`Table`]: a [`Schema`] (ordered, typed
//! [`Field`]s), an integer row index, and row-major [`Value`] storage. A single labeled
//! column pulled out of a table is a [`Series`].

use std::fmt;

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered list of fields describing the columns of a [`Table`].
///
/// Column names are not required to be unique; lookups return the first match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Schema where every column has the same type.
    pub fn uniform<I, S>(names: I, data_type: DataType) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(|n| Field::new(n, data_type)).collect())
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value (integers widen to `f64`).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Renders a value the way it is written to text exports. `Null` renders as an empty string.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Utf8(s) => f.write_str(s),
        }
    }
}

/// One labeled column together with the row index it is aligned to.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub data_type: DataType,
    pub index: Vec<i64>,
    pub values: Vec<Value>,
}

impl Series {
    /// An all-missing series over `index`.
    ///
    /// Missing numeric data is typed as `Float64`, matching how absent measurements are
    /// usually represented.
    pub fn missing(name: impl Into<String>, index: Vec<i64>) -> Self {
        let values = vec![Value::Null; index.len()];
        Self {
            name: name.into(),
            data_type: DataType::Float64,
            index,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Rename the series, keeping type, index and values.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn is_all_null(&self) -> bool {
        self.values.iter().all(Value::is_null)
    }
}

/// In-memory labeled table.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields; `index`
/// holds one integer row key per row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row keys, one per row.
    pub index: Vec<i64>,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table indexed by row position (`0..n`).
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        let index = (0..rows.len() as i64).collect();
        Self {
            schema,
            index,
            rows,
        }
    }

    /// Create a table with an explicit row index.
    ///
    /// # Panics
    ///
    /// Panics if `index` and `rows` differ in length.
    pub fn with_index(schema: Schema, index: Vec<i64>, rows: Vec<Vec<Value>>) -> Self {
        assert!(
            index.len() == rows.len(),
            "index length {} does not match row count {}",
            index.len(),
            rows.len()
        );
        Self {
            schema,
            index,
            rows,
        }
    }

    /// Number of rows in the table.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the table.
    pub fn column_count(&self) -> usize {
        self.schema.fields.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema.field_names().collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.index_of(name).is_some()
    }

    /// Extract a column by name as a [`Series`] over this table's index.
    pub fn column(&self, name: &str) -> Option<Series> {
        let idx = self.schema.index_of(name)?;
        let field = &self.schema.fields[idx];
        let values = self
            .rows
            .iter()
            .map(|row| row.get(idx).cloned().unwrap_or(Value::Null))
            .collect();
        Some(Series {
            name: field.name.clone(),
            data_type: field.data_type,
            index: self.index.clone(),
            values,
        })
    }

    /// Cell lookup by row position and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.schema.index_of(column)?;
        self.rows.get(row)?.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::{DataType, Field, Schema, Series, Table, Value};

    fn sample_table() -> Table {
        let schema = Schema::new(vec![
            Field::new("time", DataType::Float64),
            Field::new("label", DataType::Utf8),
        ]);
        Table::with_index(
            schema,
            vec![10, 20],
            vec![
                vec![Value::Float64(0.5), Value::Utf8("a".to_string())],
                vec![Value::Float64(1.0), Value::Null],
            ],
        )
    }

    #[test]
    fn column_carries_table_index_and_type() {
        let t = sample_table();
        let s = t.column("label").unwrap();
        assert_eq!(s.index, vec![10, 20]);
        assert_eq!(s.data_type, DataType::Utf8);
        assert_eq!(s.values, vec![Value::Utf8("a".to_string()), Value::Null]);
        assert!(t.column("missing").is_none());
    }

    #[test]
    fn new_uses_positional_index() {
        let schema = Schema::uniform(["a"], DataType::Utf8);
        let t = Table::new(schema, vec![vec![Value::Null]; 3]);
        assert_eq!(t.index, vec![0, 1, 2]);
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.column_count(), 1);
    }

    #[test]
    fn missing_series_is_all_null() {
        let s = Series::missing("x", vec![0, 1, 2]);
        assert_eq!(s.len(), 3);
        assert!(s.is_all_null());
        assert_eq!(s.data_type, DataType::Float64);
    }

    #[test]
    fn display_renders_null_as_empty() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Float64(0.25).to_string(), "0.25");
        assert_eq!(Value::Utf8("x".to_string()).to_string(), "x");
    }

    #[test]
    #[should_panic(expected = "index length")]
    fn with_index_panics_on_length_mismatch() {
        let _ = Table::with_index(Schema::default(), vec![0, 1], vec![vec![]]);
    }
}
