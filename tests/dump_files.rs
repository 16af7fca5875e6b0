//! # Dump Files
//!
//! Dump and restore through real files and through the registry's format
//! adapters. Every round trip must reproduce row and column counts, labels,
//! types, tags and cell values exactly.

use datatable::{
    AxisKind, ColumnType, DumpOptions, ErrorKind, Registry, RestoreOptions, Table, TableError,
};
use std::io::BufReader;
use tempfile::tempdir;

fn sample() -> Table {
    let t = Table::new("sample");
    t.create_column(Some("name"), ColumnType::String).unwrap();
    let qty = t.create_column(Some("qty"), ColumnType::Int).unwrap();
    let price = t.create_column(Some("price"), ColumnType::Double).unwrap();
    t.create_column(Some("big"), ColumnType::Long).unwrap();
    for (label, cells) in [
        ("apple", ["Granny {Smith}", "12", "0.5", ""]),
        ("empty", ["", "", "", ""]),
        ("pear", ["two\twords", "", "1.25", "99999999999999999999"]),
    ] {
        let r = t.create_row(Some(label)).unwrap();
        t.set_row_values(r, cells).unwrap();
    }
    t.add_tag(AxisKind::Column, qty, "numeric").unwrap();
    t.add_tag(AxisKind::Column, price, "numeric").unwrap();
    t.add_tag(AxisKind::Row, t.row_by_label("pear").unwrap(), "fruit basket")
        .unwrap();
    t
}

/// Everything a dump records except the `i` timestamps.
fn snapshot(t: &Table) -> Vec<String> {
    t.dump(&DumpOptions::new())
        .unwrap()
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect()
}

#[test]
fn file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.dump");
    let src = sample();
    src.dump_to_path(&path, &DumpOptions::new()).unwrap();

    let dst = Table::new("copy");
    let stats = dst
        .restore_from_path(&path, RestoreOptions::new())
        .unwrap();
    assert_eq!(stats.rows_created, 3);
    assert_eq!(stats.columns_created, 4);
    assert_eq!(stats.values, 6);

    assert_eq!(dst.num_rows(), src.num_rows());
    assert_eq!(dst.num_columns(), src.num_columns());
    for column in ["name", "qty", "price", "big"] {
        let a = src.column_by_label(column).unwrap();
        let b = dst.column_by_label(column).unwrap();
        assert_eq!(src.column_type(a).unwrap(), dst.column_type(b).unwrap());
    }
    assert_eq!(
        dst.tag_members(AxisKind::Column, "numeric").unwrap().len(),
        2
    );
    assert_eq!(snapshot(&dst), snapshot(&src));
}

#[test]
fn reader_round_trip_without_tags() {
    let src = sample();
    let text = src.dump(&DumpOptions::new()).unwrap();
    let dst = Table::new("copy");
    dst.restore_from(
        &mut BufReader::new(text.as_bytes()),
        RestoreOptions::new().with_no_tags(true),
    )
    .unwrap();
    assert!(dst.tag_names(AxisKind::Column).is_empty());
    assert!(dst.tag_names(AxisKind::Row).is_empty());
    assert_eq!(dst.num_rows(), 3);
}

#[test]
fn subset_dump_restores_subset() {
    let src = sample();
    let pear = src.row_by_label("pear").unwrap();
    let price = src.column_by_label("price").unwrap();
    let text = src
        .dump(
            &DumpOptions::new()
                .with_rows(vec![pear])
                .with_columns(vec![price]),
        )
        .unwrap();

    let dst = Table::new("part");
    dst.restore(&text, RestoreOptions::new()).unwrap();
    assert_eq!(dst.num_rows(), 1);
    assert_eq!(dst.num_columns(), 1);
    let r = dst.row_by_label("pear").unwrap();
    let c = dst.column_by_label("price").unwrap();
    assert_eq!(dst.get(r, c).unwrap().as_str(), Some("1.25"));
}

#[test]
fn missing_file_is_io() {
    let dir = tempdir().unwrap();
    let t = Table::new("t");
    let err = t
        .restore_from_path(dir.path().join("absent.dump"), RestoreOptions::new())
        .unwrap_err();
    assert_eq!(TableError::kind_of(&err), Some(ErrorKind::Io));
}

#[test]
fn restore_keeps_creation_time() {
    let t = Table::new("t");
    let created = t.created_at();
    let count = t.modification_count();
    t.restore("i 0 0 1 2\n", RestoreOptions::new()).unwrap();
    assert_eq!(t.created_at(), created);
    assert!(t.modification_count() > count);
}

#[test]
fn registry_file_export() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("export.dump");
    let mut registry = Registry::new();
    let src = registry.create_table("src").unwrap();
    let c = src.create_column(Some("v"), ColumnType::String).unwrap();
    let r = src.create_row(None).unwrap();
    src.set(r, c, "hello").unwrap();

    {
        let mut file = std::io::BufWriter::new(std::fs::File::create(&path).unwrap());
        registry.export("dump", &src, &mut file).unwrap();
    }
    let dst = registry.create_table("dst").unwrap();
    let mut reader = BufReader::new(std::fs::File::open(&path).unwrap());
    registry.import("dump", &dst, &mut reader).unwrap();
    assert_eq!(snapshot(&dst), snapshot(&src));
    assert_eq!(registry.table_names(), vec!["dst", "src"]);
}

#[test]
fn blanked_typed_cells_round_trip_as_empty() {
    let src = Table::new("src");
    let n = src.create_column(Some("n"), ColumnType::Int).unwrap();
    let x = src.create_column(Some("x"), ColumnType::Double).unwrap();
    let s = src.create_column(Some("s"), ColumnType::String).unwrap();
    let r = src.create_row(Some("only")).unwrap();
    src.set_row_values(r, ["1", "2.5", "three"]).unwrap();
    for c in [n, x, s] {
        src.set(r, c, "").unwrap();
        assert!(!src.exists(r, c));
    }

    let text = src.dump(&DumpOptions::new()).unwrap();
    assert!(text.lines().all(|line| !line.starts_with("d ")));

    let dst = Table::new("dst");
    let stats = dst.restore(&text, RestoreOptions::new()).unwrap();
    assert_eq!(stats.values, 0);
    let row = dst.row_by_label("only").unwrap();
    for label in ["n", "x", "s"] {
        let c = dst.column_by_label(label).unwrap();
        assert!(dst.get(row, c).unwrap().is_empty());
    }
    assert_eq!(snapshot(&dst), snapshot(&src));
}
