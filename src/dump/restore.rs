//! # Restore
//!
//! Replays a dump into a table in three passes:
//!
//! 1. Parse every line into a record. Any malformed line, a missing or
//!    misplaced `i` record, a duplicate index or label within an axis, or a
//!    `d` record naming an undeclared index is a `FormatError` carrying the
//!    1-based line number.
//! 2. Check label collisions. Without `overwrite`, a `c` or `r` label already
//!    present in the target fails with `LabelCollision` before anything is
//!    changed. With `overwrite`, the existing header is reused: columns take
//!    the dumped type, and `d` records overwrite their cells.
//! 3. Create headers, store values, then apply tags unless `no_tags` is set.
//!
//! Restore stores values directly, so no value trace fires; headers it
//! creates raise `Created` notifications. The target keeps its creation
//! time.

use crate::client::{Change, Table};
use crate::config::{DUMP_RECORD_COLUMN, DUMP_RECORD_DATA, DUMP_RECORD_INFO, DUMP_RECORD_ROW};
use crate::dump::list::split_list;
use crate::error::TableError;
use crate::table::{AxisKind, HeaderId};
use crate::types::{ColumnType, Value};
use eyre::{bail, Result, WrapErr};
use hashbrown::{HashMap, HashSet};
use std::io::{BufRead, Read};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    overwrite: bool,
    no_tags: bool,
}

impl RestoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse existing headers whose label matches a dumped one.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Skip the tag lists of `c` and `r` records.
    pub fn with_no_tags(mut self, no_tags: bool) -> Self {
        self.no_tags = no_tags;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreStats {
    pub rows_created: usize,
    pub rows_reused: usize,
    pub columns_created: usize,
    pub columns_reused: usize,
    pub values: usize,
}

struct HeaderRecord {
    line: usize,
    index: usize,
    label: String,
    ty: ColumnType,
    tags: Vec<String>,
}

struct DataRecord {
    line: usize,
    row: usize,
    column: usize,
    value: String,
}

#[derive(Default)]
struct Parsed {
    rows: Vec<HeaderRecord>,
    columns: Vec<HeaderRecord>,
    data: Vec<DataRecord>,
}

fn format_error(line: usize, reason: impl Into<String>) -> TableError {
    TableError::FormatError {
        line,
        reason: reason.into(),
    }
}

fn number<T: std::str::FromStr>(line: usize, field: &str, what: &str) -> Result<T> {
    let value = field
        .parse::<T>()
        .map_err(|_| format_error(line, format!("bad {} \"{}\"", what, field)))?;
    Ok(value)
}

fn expect_fields(line: usize, fields: &[String], n: usize) -> Result<()> {
    if fields.len() != n {
        bail!(format_error(
            line,
            format!(
                "\"{}\" record has {} fields, expected {}",
                fields[0],
                fields.len(),
                n
            )
        ));
    }
    Ok(())
}

fn parse(text: &str) -> Result<Parsed> {
    let mut parsed = Parsed::default();
    let mut declared: Option<(usize, usize)> = None;
    let mut info_line = 0;
    let mut row_index: HashMap<usize, usize> = HashMap::new();
    let mut column_index: HashMap<usize, usize> = HashMap::new();
    let mut row_labels: HashSet<String> = HashSet::new();
    let mut column_labels: HashSet<String> = HashSet::new();

    for (n, raw) in text.lines().enumerate() {
        let line = n + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let fields = split_list(raw).map_err(|e| format_error(line, format!("{:#}", e)))?;
        let kind = fields[0].as_str();
        if declared.is_none() && kind != DUMP_RECORD_INFO {
            bail!(format_error(line, "first record must be \"i\""));
        }
        match kind {
            DUMP_RECORD_INFO => {
                if declared.is_some() {
                    bail!(format_error(line, "duplicate \"i\" record"));
                }
                expect_fields(line, &fields, 5)?;
                let rows = number(line, &fields[1], "row count")?;
                let columns = number(line, &fields[2], "column count")?;
                number::<u64>(line, &fields[3], "creation time")?;
                number::<u64>(line, &fields[4], "modification time")?;
                declared = Some((rows, columns));
                info_line = line;
            }
            DUMP_RECORD_COLUMN => {
                expect_fields(line, &fields, 5)?;
                let index = number(line, &fields[1], "column index")?;
                if column_index.insert(index, parsed.columns.len()).is_some() {
                    bail!(format_error(line, format!("duplicate column index {}", index)));
                }
                if !column_labels.insert(fields[2].clone()) {
                    bail!(format_error(line, format!("duplicate column label \"{}\"", fields[2])));
                }
                let ty = ColumnType::from_name(&fields[3])
                    .map_err(|_| format_error(line, format!("unknown type \"{}\"", fields[3])))?;
                let tags = split_list(&fields[4]).map_err(|e| format_error(line, format!("{:#}", e)))?;
                parsed.columns.push(HeaderRecord {
                    line,
                    index,
                    label: fields[2].clone(),
                    ty,
                    tags,
                });
            }
            DUMP_RECORD_ROW => {
                expect_fields(line, &fields, 4)?;
                let index = number(line, &fields[1], "row index")?;
                if row_index.insert(index, parsed.rows.len()).is_some() {
                    bail!(format_error(line, format!("duplicate row index {}", index)));
                }
                if !row_labels.insert(fields[2].clone()) {
                    bail!(format_error(line, format!("duplicate row label \"{}\"", fields[2])));
                }
                let tags = split_list(&fields[3]).map_err(|e| format_error(line, format!("{:#}", e)))?;
                parsed.rows.push(HeaderRecord {
                    line,
                    index,
                    label: fields[2].clone(),
                    ty: ColumnType::String,
                    tags,
                });
            }
            DUMP_RECORD_DATA => {
                expect_fields(line, &fields, 4)?;
                let row = number(line, &fields[1], "row index")?;
                let column = number(line, &fields[2], "column index")?;
                parsed.data.push(DataRecord {
                    line,
                    row,
                    column,
                    value: fields[3].clone(),
                });
            }
            other => bail!(format_error(line, format!("unknown record \"{}\"", other))),
        }
    }

    let Some((rows, columns)) = declared else {
        bail!(format_error(1, "missing \"i\" record"));
    };
    if rows != parsed.rows.len() || columns != parsed.columns.len() {
        bail!(format_error(
            info_line,
            format!(
                "declares {} rows and {} columns, found {} and {}",
                rows,
                columns,
                parsed.rows.len(),
                parsed.columns.len()
            )
        ));
    }
    for d in &parsed.data {
        if !row_index.contains_key(&d.row) {
            bail!(format_error(d.line, format!("undeclared row index {}", d.row)));
        }
        if !column_index.contains_key(&d.column) {
            bail!(format_error(d.line, format!("undeclared column index {}", d.column)));
        }
    }
    Ok(parsed)
}

impl Table {
    pub fn restore(&self, text: &str, options: RestoreOptions) -> Result<RestoreStats> {
        let parsed = parse(text)?;
        let mut stats = RestoreStats::default();

        self.mutate(|core, changes| {
            if !options.overwrite {
                for (axis, records) in [
                    (AxisKind::Column, &parsed.columns),
                    (AxisKind::Row, &parsed.rows),
                ] {
                    for record in records {
                        if core.axis(axis).find(&record.label).is_some() {
                            return Err(eyre::Report::new(TableError::LabelCollision {
                                what: axis.name(),
                                label: record.label.clone(),
                            })
                            .wrap_err(format!("restore failed at line {}", record.line)));
                        }
                    }
                }
            }

            let mut maps: [HashMap<usize, HeaderId>; 2] = [HashMap::new(), HashMap::new()];
            for (axis, records, map) in [
                (AxisKind::Column, &parsed.columns, 0usize),
                (AxisKind::Row, &parsed.rows, 1),
            ] {
                for record in records {
                    let id = match core.axis(axis).find(&record.label) {
                        Some(id) => {
                            match axis {
                                AxisKind::Column => stats.columns_reused += 1,
                                AxisKind::Row => stats.rows_reused += 1,
                            }
                            id
                        }
                        None => {
                            let id = core.create_header(axis, Some(&record.label), None)?;
                            changes.push(Change::created(axis, id));
                            match axis {
                                AxisKind::Column => stats.columns_created += 1,
                                AxisKind::Row => stats.rows_created += 1,
                            }
                            id
                        }
                    };
                    if axis == AxisKind::Column {
                        core.set_column_type(id, record.ty)
                            .wrap_err_with(|| format!("restore failed at line {}", record.line))?;
                    }
                    maps[map].insert(record.index, id);
                }
            }

            for d in &parsed.data {
                let (Some(row), Some(column)) = (maps[1].get(&d.row), maps[0].get(&d.column))
                else {
                    bail!(format_error(d.line, "undeclared index"));
                };
                let value = core
                    .coerce_for(*column, &Value::text(d.value.as_str()))
                    .wrap_err_with(|| format!("restore failed at line {}", d.line))?;
                if !value.is_empty() {
                    stats.values += 1;
                }
                core.put(*row, *column, value)?;
            }

            if !options.no_tags {
                let mut state = self.client.state.lock();
                for (axis, records, map) in [
                    (AxisKind::Column, &parsed.columns, 0usize),
                    (AxisKind::Row, &parsed.rows, 1),
                ] {
                    for record in records {
                        let Some(id) = maps[map].get(&record.index) else {
                            continue;
                        };
                        for tag in &record.tags {
                            state
                                .tags_mut(core, axis)
                                .add(*id, tag)
                                .wrap_err_with(|| format!("restore failed at line {}", record.line))?;
                        }
                    }
                }
            }
            core.touch();
            Ok::<_, eyre::Report>(())
        })?;

        log::debug!(
            "{} restored {} rows, {} columns, {} values",
            self.table_name(),
            stats.rows_created + stats.rows_reused,
            stats.columns_created + stats.columns_reused,
            stats.values
        );
        Ok(stats)
    }

    pub fn restore_from(
        &self,
        reader: &mut dyn BufRead,
        options: RestoreOptions,
    ) -> Result<RestoreStats> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .wrap_err("failed to read table dump")?;
        self.restore(&text, options)
    }

    pub fn restore_from_path(
        &self,
        path: impl AsRef<Path>,
        options: RestoreOptions,
    ) -> Result<RestoreStats> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read dump file {}", path.display()))?;
        self.restore(&text, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::DumpOptions;
    use crate::error::ErrorKind;

    fn kind(err: &eyre::Report) -> Option<ErrorKind> {
        TableError::kind_of(err)
    }

    #[test]
    fn round_trip() {
        let src = Table::new("src");
        let name = src.create_column(Some("name"), ColumnType::String).unwrap();
        let qty = src.create_column(Some("qty"), ColumnType::Long).unwrap();
        let rows = src.extend_rows(3);
        src.set(rows[0], name, "{odd} \"text\"").unwrap();
        src.set(rows[0], qty, "170141183460469231731687303715884105727").unwrap();
        src.set(rows[2], name, "line\nbreak").unwrap();
        src.add_tag(AxisKind::Row, rows[2], "last").unwrap();
        src.add_tag(AxisKind::Column, qty, "numeric").unwrap();

        let dst = Table::new("dst");
        let stats = dst
            .restore(&src.dump(&DumpOptions::new()).unwrap(), RestoreOptions::new())
            .unwrap();
        assert_eq!(stats.rows_created, 3);
        assert_eq!(stats.columns_created, 2);
        assert_eq!(stats.values, 3);

        assert_eq!(dst.num_rows(), 3);
        let dq = dst.column_by_label("qty").unwrap();
        assert_eq!(dst.column_type(dq).unwrap(), ColumnType::Long);
        let dr = dst.rows();
        assert_eq!(
            dst.get(dr[0], dst.column_by_label("name").unwrap()).unwrap().as_str(),
            Some("{odd} \"text\"")
        );
        assert!(dst.get(dr[1], dq).unwrap().is_empty());
        assert!(dst.has_tag(AxisKind::Row, dr[2], "last").unwrap());
        assert!(dst.has_tag(AxisKind::Column, dq, "numeric").unwrap());
        assert_eq!(
            dst.dump(&DumpOptions::new()).unwrap().lines().skip(1).collect::<Vec<_>>(),
            src.dump(&DumpOptions::new()).unwrap().lines().skip(1).collect::<Vec<_>>()
        );
    }

    #[test]
    fn collision_requires_overwrite() {
        let text = "i 1 1 0 0\nc 0 c1 string {}\nr 0 r1 {}\nd 0 0 new\n";
        let t = Table::new("t");
        let c = t.create_column(Some("c1"), ColumnType::String).unwrap();
        let r = t.create_row(Some("r1")).unwrap();
        t.set(r, c, "old").unwrap();

        let err = t.restore(text, RestoreOptions::new()).unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::LabelCollision));
        assert_eq!(t.get(r, c).unwrap().as_str(), Some("old"));

        let stats = t
            .restore(text, RestoreOptions::new().with_overwrite(true))
            .unwrap();
        assert_eq!(stats.rows_reused, 1);
        assert_eq!(t.num_rows(), 1);
        assert_eq!(t.get(r, c).unwrap().as_str(), Some("new"));
    }

    #[test]
    fn no_tags_skips_tags() {
        let text = "i 1 0 0 0\nr 0 a {x y}\n";
        let t = Table::new("t");
        t.restore(text, RestoreOptions::new().with_no_tags(true))
            .unwrap();
        assert!(t.tag_names(AxisKind::Row).is_empty());
        let u = Table::new("u");
        u.restore(text, RestoreOptions::new()).unwrap();
        assert_eq!(u.tag_names(AxisKind::Row), vec!["x", "y"]);
    }

    #[test]
    fn format_errors_carry_line() {
        let t = Table::new("t");
        for (text, line) in [
            ("c 0 a string {}\n", 1),
            ("i 0 0 0 0\nq 1\n", 2),
            ("i 1 0 0 0\n", 1),
            ("i 0 1 0 0\nc 0 a float {}\n", 2),
            ("i 0 1 0 0\nc 0 a int {}\nd 3 0 1\n", 3),
        ] {
            let err = t.restore(text, RestoreOptions::new()).unwrap_err();
            let found = err
                .chain()
                .find_map(|c| c.downcast_ref::<TableError>().cloned());
            assert_eq!(
                found.map(|e| matches!(e, TableError::FormatError { line: l, .. } if l == line)),
                Some(true),
                "{}",
                text
            );
        }
        assert_eq!(t.num_columns(), 0);
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let t = Table::new("t");
        for (text, line) in [
            ("i 2 1 0 0\nc 0 n string {}\nr 0 a {}\nr 1 a {}\n", 4),
            ("i 0 2 0 0\nc 0 n string {}\nc 1 n int {}\n", 3),
        ] {
            let err = t.restore(text, RestoreOptions::new()).unwrap_err();
            assert_eq!(kind(&err), Some(ErrorKind::FormatError));
            assert!(matches!(
                err.downcast_ref::<TableError>(),
                Some(TableError::FormatError { line: l, .. }) if *l == line
            ));
        }
        assert_eq!(t.num_rows(), 0);
        assert_eq!(t.num_columns(), 0);
    }

    #[test]
    fn blank_data_restores_as_empty() {
        let t = Table::new("t");
        let stats = t
            .restore(
                "i 1 2 0 0\nc 0 n int {}\nc 1 s string {}\nr 0 r1 {}\nd 0 0 {}\nd 0 1 {}\n",
                RestoreOptions::new(),
            )
            .unwrap();
        assert_eq!(stats.values, 0);
        let r = t.row_at(0).unwrap();
        for c in t.columns() {
            assert!(!t.exists(r, c));
        }
        assert!(!t.dump(&DumpOptions::new()).unwrap().contains("\nd "));
    }

    #[test]
    fn typed_data_is_coerced() {
        let t = Table::new("t");
        let err = t
            .restore("i 1 1 0 0\nc 0 n int {}\nr 0 r1 {}\nd 0 0 abc\n", RestoreOptions::new())
            .unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::TypeMismatch));
    }
}
