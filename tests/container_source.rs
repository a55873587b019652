use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parquet::column::writer::ColumnWriter;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;

use measure_pool::config::SourceConfig;
use measure_pool::error::{ErrorKind, TableResult};
use measure_pool::source::container::TIME_COLUMN;
use measure_pool::source::{ContainerSource, FromMeta, SignalDecoder, SourceMeta, TableSource, TimeSeries};
use measure_pool::types::Value;

fn tmp_file(name: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("measure-pool-{name}-{nanos}.{ext}"))
}

/// Two signals sampled at different rates: the model value every row, the pressure sensor
/// only on rows 1 and 3.
fn write_measurement(path: &PathBuf, time_column: &str) {
    let schema_str = format!(
        "message schema {{
          REQUIRED DOUBLE {time_column};
          OPTIONAL DOUBLE p_MC_Model;
          OPTIONAL DOUBLE RBMESG_RB_VirtualPressureSensor;
        }}"
    );
    let schema = Arc::new(parse_message_type(&schema_str).unwrap());
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path).unwrap();
    let mut writer = SerializedFileWriter::new(file, schema, props).unwrap();

    let mut rg = writer.next_row_group().unwrap();
    let mut col_idx: usize = 0;
    while let Some(mut col) = rg.next_column().unwrap() {
        match col.untyped() {
            ColumnWriter::DoubleColumnWriter(w) => match col_idx {
                0 => {
                    w.write_batch(&[0.0, 0.0101, 0.0199, 0.0302, 0.04], None, None).unwrap();
                }
                1 => {
                    w.write_batch(&[1.0, 2.0, 3.0, 4.0, 5.0], Some(&[1_i16, 1, 1, 1, 1][..]), None)
                        .unwrap();
                }
                _ => {
                    w.write_batch(&[10.0, 30.0], Some(&[0_i16, 1, 0, 1, 0][..]), None).unwrap();
                }
            },
            _ => panic!("unexpected column writer in test"),
        }
        col.close().unwrap();
        col_idx += 1;
    }
    rg.close().unwrap();
    writer.close().unwrap();
}

fn floats(vals: &[f64]) -> Vec<Value> {
    vals.iter().map(|v| Value::Float64(*v)).collect()
}

#[test]
fn parquet_signals_are_joined_and_gap_filled() {
    let path = tmp_file("container", "parquet");
    write_measurement(&path, "timestamp");

    let src: ContainerSource = ContainerSource::from_meta(SourceMeta::from_path(&path).unwrap());
    let t = src.extract_table().unwrap();

    assert_eq!(
        t.column_names(),
        vec!["p_MC_Model", "RBMESG_RB_VirtualPressureSensor", TIME_COLUMN]
    );
    assert_eq!(t.index, vec![0, 1, 2, 3, 4]);
    assert_eq!(t.column("p_MC_Model").unwrap().values, floats(&[1.0, 2.0, 3.0, 4.0, 5.0]));
    assert_eq!(
        t.column("RBMESG_RB_VirtualPressureSensor").unwrap().values,
        floats(&[10.0, 10.0, 10.0, 30.0, 30.0])
    );
    assert_eq!(t.column(TIME_COLUMN).unwrap().values, floats(&[0.0, 0.01, 0.02, 0.03, 0.04]));

    let _ = fs::remove_file(&path);
}

#[test]
fn configured_signals_and_time_column() {
    let path = tmp_file("container-cfg", "parquet");
    write_measurement(&path, "t_abs");

    let cfg = SourceConfig::new()
        .with("signals", "RBMESG_RB_VirtualPressureSensor,not_recorded")
        .with("time_column", "t_abs")
        .with("time_decimals", "1");
    let src: ContainerSource = ContainerSource::from_meta(SourceMeta::new(&path, None, None, Some(cfg)).unwrap());
    let t = src.extract_table().unwrap();

    assert_eq!(
        t.column_names(),
        vec!["RBMESG_RB_VirtualPressureSensor", "not_recorded", TIME_COLUMN]
    );
    // One decimal collapses every sample onto 0.0; the last pressure sample wins.
    assert_eq!(t.row_count(), 1);
    assert_eq!(t.rows[0], vec![Value::Float64(30.0), Value::Null, Value::Float64(0.0)]);

    let _ = fs::remove_file(&path);
}

#[test]
fn wrong_time_column_and_non_parquet_are_parse_errors() {
    let path = tmp_file("container-notime", "parquet");
    write_measurement(&path, "timestamp");
    let cfg = SourceConfig::new().with("time_column", "t_abs");
    let src: ContainerSource = ContainerSource::from_meta(SourceMeta::new(&path, None, None, Some(cfg)).unwrap());
    let err = src.extract_table().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("missing time column 't_abs'"));
    let _ = fs::remove_file(&path);

    let path = tmp_file("container-text", "parquet");
    fs::write(&path, "not a container").unwrap();
    let src: ContainerSource = ContainerSource::from_meta(SourceMeta::from_path(&path).unwrap());
    assert_eq!(src.extract_table().unwrap_err().kind(), ErrorKind::Parse);
    let _ = fs::remove_file(&path);
}

#[test]
fn missing_container_is_not_found() {
    let src: ContainerSource = ContainerSource::from_meta(SourceMeta::from_path(tmp_file("container-gone", "parquet")).unwrap());
    assert_eq!(src.extract_table().unwrap_err().kind(), ErrorKind::NotFound);
}

struct FixedDecoder;

impl SignalDecoder for FixedDecoder {
    fn load_signals(&self, _path: &Path, signals: &[String]) -> TableResult<BTreeMap<String, TimeSeries>> {
        let mut out = BTreeMap::new();
        for s in signals {
            if s == "speed" {
                out.insert(s.clone(), TimeSeries::new(vec![1.0, 2.0], vec![5.0, 6.0]));
            }
        }
        Ok(out)
    }
}

#[test]
fn custom_decoder_plugs_into_the_join() {
    let path = tmp_file("container-custom", "bin");
    fs::write(&path, b"\x00").unwrap();

    let cfg = SourceConfig::new().with("signals", "speed,torque");
    let src = ContainerSource::with_decoder(SourceMeta::new(&path, None, None, Some(cfg)).unwrap(), FixedDecoder);
    let t = src.extract_table().unwrap();

    assert_eq!(t.column_names(), vec!["speed", "torque", TIME_COLUMN]);
    assert_eq!(t.column("speed").unwrap().values, floats(&[5.0, 6.0]));
    assert!(t.column("torque").unwrap().is_all_null());
    assert_eq!(t.column(TIME_COLUMN).unwrap().values, floats(&[1.0, 2.0]));

    let _ = fs::remove_file(&path);
}
