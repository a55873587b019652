use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use measure_pool::config::SourceConfig;
use measure_pool::error::ErrorKind;
use measure_pool::export::{write_table, ExportFormat, ExportOptions};
use measure_pool::pool::{DiscoveryFilter, TablePool};
use measure_pool::source::{DelimitedSource, FromMeta, SourceMeta, TableSource};
use measure_pool::types::Value;

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("measure-pool-{name}-{nanos}"));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn two_member_pool(root: &Path) -> TablePool<DelimitedSource> {
    fs::write(root.join("a.txt"), "speed,load\n1,10\n2,20\n3,30\n").unwrap();
    fs::write(root.join("b.txt"), "speed\n7\n").unwrap();
    TablePool::open(root, &DiscoveryFilter::new().with_extension(".txt"), None).unwrap()
}

#[test]
fn export_writes_signal_and_chains() {
    let root = tmp_dir("export-chain");
    let out = tmp_dir("export-chain-out");
    let pool = two_member_pool(&root);

    let speed = out.join("speed.csv");
    let load = out.join("load.csv");
    pool.export(&speed, "speed", &ExportOptions::default())
        .unwrap()
        .export(&load, "load", &ExportOptions::default())
        .unwrap();

    assert_eq!(fs::read_to_string(&speed).unwrap(), "a,b\n1,7\n2,\n3,\n");
    assert_eq!(fs::read_to_string(&load).unwrap(), "a,b\n10,\n20,\n30,\n");

    let back = DelimitedSource::from_meta(SourceMeta::from_path(&speed).unwrap())
        .extract_table()
        .unwrap();
    assert_eq!(back.column_names(), vec!["a", "b"]);
    assert_eq!(back.value(0, "b"), Some(&Value::Utf8("7".to_string())));
    assert_eq!(back.value(2, "b"), Some(&Value::Utf8(String::new())));
}

#[test]
fn delimiter_bearing_values_read_back_with_quoting() {
    let root = tmp_dir("export-quoted");
    let out = tmp_dir("export-quoted-out");
    fs::write(root.join("a.tsv"), "x\ty\n1,5\t2\n3,5\t4\n").unwrap();
    let tab = SourceConfig::new().with("delimiter", "tab");
    let pool: TablePool<DelimitedSource> =
        TablePool::open(&root, &DiscoveryFilter::new().with_extension(".tsv"), Some(tab)).unwrap();

    let csv = out.join("x.csv");
    pool.export(&csv, "x", &ExportOptions::default()).unwrap();
    assert_eq!(fs::read_to_string(&csv).unwrap(), "a\n\"1,5\"\n\"3,5\"\n");

    let quoted = SourceConfig::new().with("quoting", "true");
    let meta = SourceMeta::new(&csv, None, None, Some(quoted)).unwrap();
    let back = DelimitedSource::from_meta(meta).extract_table().unwrap();
    assert_eq!(back.column_names(), vec!["a"]);
    assert_eq!(
        back.column("a").unwrap().values,
        vec![Value::Utf8("1,5".to_string()), Value::Utf8("3,5".to_string())]
    );
}

#[test]
fn export_with_index_column() {
    let root = tmp_dir("export-index");
    let out = tmp_dir("export-index-out");
    let pool = two_member_pool(&root);

    let opts = ExportOptions {
        include_index: true,
        index_label: "row".to_string(),
        delimiter: b';',
        ..Default::default()
    };
    let path = out.join("speed.txt");
    pool.export(&path, "speed", &opts).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "row;a;b\n0;1;7\n1;2;\n2;3;\n");
}

#[test]
fn unknown_extension_needs_explicit_format() {
    let root = tmp_dir("export-format");
    let pool = two_member_pool(&root);
    let table = pool.get_signal("speed").unwrap();

    let path = root.join("speed.out");
    let err = write_table(&table, &path, &ExportOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);

    let opts = ExportOptions {
        format: Some(ExportFormat::Csv),
        ..Default::default()
    };
    write_table(&table, &path, &opts).unwrap();
    assert!(fs::read_to_string(&path).unwrap().starts_with("a,b\n"));
}

#[cfg(not(feature = "excel"))]
#[test]
fn excel_export_requires_feature() {
    let root = tmp_dir("export-excel-off");
    let pool = two_member_pool(&root);
    let err = pool
        .export(root.join("speed.xlsx"), "speed", &ExportOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(err.to_string().contains("feature 'excel'"));
}

#[cfg(feature = "excel")]
#[test]
fn excel_export_writes_workbook() {
    let root = tmp_dir("export-excel-on");
    let pool = two_member_pool(&root);
    let path = root.join("speed.xlsx");
    pool.export(&path, "speed", &ExportOptions::default()).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"PK"));
}
