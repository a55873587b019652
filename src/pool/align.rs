//! Outer-union alignment of labeled series.

use std::collections::{BTreeSet, HashMap};

use crate::types::{Field, Schema, Series, Table, Value};

/// Place `series` side by side on the union of their row keys.
///
/// - Columns keep the input order and take their label and type from each series.
/// - The result index is every key that appears in any series, ascending.
/// - A cell whose series lacks that key is [`Value::Null`]; nothing is filled.
/// - If a series repeats a key, the last value for that key wins.
pub fn outer_union(series: Vec<Series>) -> Table {
    let keys: BTreeSet<i64> = series.iter().flat_map(|s| s.index.iter().copied()).collect();
    let index: Vec<i64> = keys.into_iter().collect();
    let position: HashMap<i64, usize> = index.iter().enumerate().map(|(pos, key)| (*key, pos)).collect();

    let fields: Vec<Field> = series.iter().map(|s| Field::new(s.name.clone(), s.data_type)).collect();
    let mut rows: Vec<Vec<Value>> = vec![vec![Value::Null; fields.len()]; index.len()];

    for (col, s) in series.into_iter().enumerate() {
        for (key, value) in s.index.into_iter().zip(s.values) {
            if let Some(&row) = position.get(&key) {
                rows[row][col] = value;
            }
        }
    }

    Table::with_index(Schema::new(fields), index, rows)
}
