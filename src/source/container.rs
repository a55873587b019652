//! Binary measurement-container source.
//!
//! Decoding the container itself is delegated to a [`SignalDecoder`]. The source asks it for a
//! list of signals, then joins the returned time series into one table:
//!
//! 1. timestamps are rounded to `time_decimals` places, so near-identical sample times collapse
//! 2. signals are outer-joined on the union of rounded timestamps (ascending)
//! 3. gaps are forward-filled, then back-filled, per signal
//! 4. the timestamp becomes a plain `time` column and rows get a dense positional index

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::SourceConfig;
use crate::error::{TableError, TableResult};
use crate::types::{DataType, Field, Schema, Table, Value};

use super::parquet::ParquetSignalDecoder;
use super::{ensure_file, FromMeta, SourceFormat, SourceMeta, TableSource};

/// Name of the column holding the (rounded) sample time.
pub const TIME_COLUMN: &str = "time";

const DEFAULT_SIGNALS: [&str; 2] = ["p_MC_Model", "RBMESG_RB_VirtualPressureSensor"];
const MAX_TIME_DECIMALS: u32 = 9;

/// Samples of one signal. `timestamps` and `values` are parallel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    pub timestamps: Vec<f64>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(timestamps: Vec<f64>, values: Vec<f64>) -> Self {
        Self { timestamps, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Decoder for a binary measurement container.
///
/// Returns one series per requested signal that exists in the file. Signals missing from the
/// file are simply absent from the map; a file containing none of them yields an empty map.
pub trait SignalDecoder: Send + Sync {
    fn load_signals(&self, path: &Path, signals: &[String]) -> TableResult<BTreeMap<String, TimeSeries>>;
}

/// Options read from a [`SourceConfig`]: `signals` (comma-separated) and `time_decimals`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerOptions {
    pub signals: Vec<String>,
    pub time_decimals: u32,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            signals: DEFAULT_SIGNALS.iter().map(|s| s.to_string()).collect(),
            time_decimals: 3,
        }
    }
}

impl ContainerOptions {
    pub fn from_config(config: Option<&SourceConfig>) -> TableResult<Self> {
        let mut opts = Self::default();
        let Some(config) = config else {
            return Ok(opts);
        };
        if let Some(signals) = config.list("signals") {
            if signals.is_empty() {
                return Err(TableError::invalid_config("signals", "no signal names given"));
            }
            opts.signals = signals;
        }
        if let Some(d) = config.parse::<u32>("time_decimals")? {
            if d > MAX_TIME_DECIMALS {
                return Err(TableError::invalid_config(
                    "time_decimals",
                    format!("must be at most {MAX_TIME_DECIMALS}, got {d}"),
                ));
            }
            opts.time_decimals = d;
        }
        Ok(opts)
    }
}

/// Table source over a measurement container, decoded by `D`.
#[derive(Debug, Clone)]
pub struct ContainerSource<D = ParquetSignalDecoder> {
    meta: SourceMeta,
    decoder: D,
}

impl<D: SignalDecoder> ContainerSource<D> {
    pub fn with_decoder(meta: SourceMeta, decoder: D) -> Self {
        Self { meta, decoder }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }
}

impl FromMeta for ContainerSource<ParquetSignalDecoder> {
    /// Uses the `time_column` config key (default `timestamp`) for the Parquet decoder.
    fn from_meta(meta: SourceMeta) -> Self {
        let decoder = match meta.config().and_then(|c| c.get("time_column")) {
            Some(col) => ParquetSignalDecoder::new(col),
            None => ParquetSignalDecoder::default(),
        };
        Self { meta, decoder }
    }
}

impl<D: SignalDecoder> TableSource for ContainerSource<D> {
    fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Container
    }

    fn extract_table(&self) -> TableResult<Table> {
        let path = self.meta.path();
        ensure_file(path)?;
        let opts = ContainerOptions::from_config(self.meta.config())?;

        let loaded = self.decoder.load_signals(path, &opts.signals)?;
        if loaded.is_empty() {
            log::debug!("no requested signal found in {}", path.display());
        }
        join_time_series(&opts.signals, &loaded, opts.time_decimals, path)
    }
}

/// Join per-signal series on rounded timestamps.
///
/// Columns follow `signals` order (duplicates dropped), then [`TIME_COLUMN`]. A requested signal
/// absent from `loaded` becomes an all-null column; if none are present the table has no rows.
/// Within one signal, samples that round to the same timestamp keep the last value.
pub fn join_time_series(
    signals: &[String],
    loaded: &BTreeMap<String, TimeSeries>,
    time_decimals: u32,
    origin: &Path,
) -> TableResult<Table> {
    let scale = 10_f64.powi(time_decimals as i32);

    let mut names: Vec<&str> = Vec::with_capacity(signals.len());
    for s in signals {
        if !names.contains(&s.as_str()) {
            names.push(s);
        }
    }

    let mut keys: BTreeSet<i64> = BTreeSet::new();
    let mut per_signal: Vec<Option<BTreeMap<i64, f64>>> = Vec::with_capacity(names.len());
    for name in &names {
        let Some(series) = loaded.get(*name) else {
            per_signal.push(None);
            continue;
        };
        if series.timestamps.len() != series.values.len() {
            return Err(TableError::parse(
                origin,
                format!(
                    "signal '{name}' has {} timestamps but {} values",
                    series.timestamps.len(),
                    series.values.len()
                ),
            ));
        }

        let mut samples = BTreeMap::new();
        for (t, v) in series.timestamps.iter().zip(&series.values) {
            if !t.is_finite() {
                continue;
            }
            let key = time_key(*t, scale).ok_or_else(|| {
                TableError::parse(
                    origin,
                    format!("signal '{name}' timestamp {t} does not fit at {time_decimals} decimals"),
                )
            })?;
            keys.insert(key);
            if !v.is_nan() {
                samples.insert(key, *v);
            }
        }
        per_signal.push(Some(samples));
    }

    let keys: Vec<i64> = keys.into_iter().collect();
    let columns: Vec<Vec<Option<f64>>> = per_signal
        .iter()
        .map(|samples| {
            let mut col: Vec<Option<f64>> = match samples {
                Some(s) => keys.iter().map(|k| s.get(k).copied()).collect(),
                None => vec![None; keys.len()],
            };
            forward_fill(&mut col);
            back_fill(&mut col);
            col
        })
        .collect();

    let rows: Vec<Vec<Value>> = keys
        .iter()
        .enumerate()
        .map(|(r, key)| {
            let mut row: Vec<Value> = columns
                .iter()
                .map(|col| col[r].map(Value::Float64).unwrap_or(Value::Null))
                .collect();
            row.push(Value::Float64(*key as f64 / scale));
            row
        })
        .collect();

    let mut fields: Vec<Field> = names.iter().map(|n| Field::new(*n, DataType::Float64)).collect();
    fields.push(Field::new(TIME_COLUMN, DataType::Float64));

    Ok(Table::new(Schema::new(fields), rows))
}

/// Rounded fixed-point key for `t`, or `None` when it falls outside the `i64` range.
fn time_key(t: f64, scale: f64) -> Option<i64> {
    let scaled = (t * scale).round();
    // 2^63 itself is out of range; the lower bound is exact.
    if scaled >= i64::MIN as f64 && scaled < i64::MAX as f64 {
        Some(scaled as i64)
    } else {
        None
    }
}

fn forward_fill(col: &mut [Option<f64>]) {
    let mut last = None;
    for cell in col.iter_mut() {
        match cell {
            Some(v) => last = Some(*v),
            None => *cell = last,
        }
    }
}

fn back_fill(col: &mut [Option<f64>]) {
    let mut next = None;
    for cell in col.iter_mut().rev() {
        match cell {
            Some(v) => next = Some(*v),
            None => *cell = next,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::Path;

    use super::{back_fill, forward_fill, join_time_series, ContainerOptions, TimeSeries, TIME_COLUMN};
    use crate::config::SourceConfig;
    use crate::error::ErrorKind;
    use crate::types::Value;

    fn names(ns: &[&str]) -> Vec<String> {
        ns.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fills_forward_then_backward() {
        let mut col = vec![None, Some(1.0), None, Some(3.0), None];
        forward_fill(&mut col);
        back_fill(&mut col);
        assert_eq!(col, vec![Some(1.0), Some(1.0), Some(1.0), Some(3.0), Some(3.0)]);
    }

    #[test]
    fn joins_heterogeneous_rates_on_rounded_time() {
        let mut loaded = BTreeMap::new();
        loaded.insert(
            "fast".to_string(),
            TimeSeries::new(vec![0.0, 0.0101, 0.0199, 0.0302], vec![1.0, 2.0, 3.0, 4.0]),
        );
        loaded.insert("slow".to_string(), TimeSeries::new(vec![0.01, 0.03], vec![10.0, 30.0]));

        let t = join_time_series(&names(&["slow", "fast"]), &loaded, 2, Path::new("m.pq")).unwrap();
        assert_eq!(t.column_names(), vec!["slow", "fast", TIME_COLUMN]);
        assert_eq!(t.index, vec![0, 1, 2, 3]);

        let time: Vec<Value> = t.column(TIME_COLUMN).unwrap().values;
        assert_eq!(
            time,
            vec![Value::Float64(0.0), Value::Float64(0.01), Value::Float64(0.02), Value::Float64(0.03)]
        );
        let slow = t.column("slow").unwrap().values;
        assert_eq!(
            slow,
            vec![Value::Float64(10.0), Value::Float64(10.0), Value::Float64(10.0), Value::Float64(30.0)]
        );
        let fast = t.column("fast").unwrap().values;
        assert_eq!(
            fast,
            vec![Value::Float64(1.0), Value::Float64(2.0), Value::Float64(3.0), Value::Float64(4.0)]
        );
    }

    #[test]
    fn absent_signals_do_not_fail() {
        let loaded = BTreeMap::new();
        let t = join_time_series(&names(&["a", "b"]), &loaded, 3, Path::new("m.pq")).unwrap();
        assert_eq!(t.column_names(), vec!["a", "b", TIME_COLUMN]);
        assert_eq!(t.row_count(), 0);

        let mut loaded = BTreeMap::new();
        loaded.insert("a".to_string(), TimeSeries::new(vec![0.5], vec![2.0]));
        let t = join_time_series(&names(&["a", "b"]), &loaded, 3, Path::new("m.pq")).unwrap();
        assert_eq!(t.rows, vec![vec![Value::Float64(2.0), Value::Null, Value::Float64(0.5)]]);
    }

    #[test]
    fn mismatched_series_lengths_are_malformed() {
        let mut loaded = BTreeMap::new();
        loaded.insert("a".to_string(), TimeSeries::new(vec![0.0, 1.0], vec![2.0]));
        let err = join_time_series(&names(&["a"]), &loaded, 3, Path::new("m.pq")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn timestamps_beyond_key_range_are_rejected() {
        let mut loaded = BTreeMap::new();
        loaded.insert(
            "a".to_string(),
            TimeSeries::new(vec![1.7e18, 1.7e18 + 1e9, 1.7e18 + 2e9], vec![1.0, 2.0, 3.0]),
        );
        let err = join_time_series(&names(&["a"]), &loaded, 3, Path::new("m.pq")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("does not fit"));

        // Same samples at zero decimals stay distinct.
        let t = join_time_series(&names(&["a"]), &loaded, 0, Path::new("m.pq")).unwrap();
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.column("a").unwrap().values[2], Value::Float64(3.0));
    }

    #[test]
    fn options_from_config() {
        let cfg = SourceConfig::new().with("signals", "x,y").with("time_decimals", "1");
        let opts = ContainerOptions::from_config(Some(&cfg)).unwrap();
        assert_eq!(opts.signals, vec!["x", "y"]);
        assert_eq!(opts.time_decimals, 1);

        let cfg = SourceConfig::new().with("time_decimals", "12");
        assert_eq!(ContainerOptions::from_config(Some(&cfg)).unwrap_err().kind(), ErrorKind::Config);
    }
}
