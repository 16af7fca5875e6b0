//! # Dump Format
//!
//! The canonical text form of a table: one record per line, each line a
//! list (see [`list`]) whose first field is the record letter.
//!
//! ```text
//! i <rows> <columns> <ctime> <mtime>      header, always first
//! c <index> <label> <type> {<tag> ...}    one per dumped column
//! r <index> <label> {<tag> ...}           one per dumped row
//! d <row index> <column index> <value>    one per non-empty cell
//! ```
//!
//! Indices are 0-based positions in the dumped table. Columns come first,
//! then rows, then data in row-major position order; empty cells are never
//! written. Tags are the dumping client's view.
//!
//! ## Module Structure
//!
//! - `list`: element quoting and list splitting
//! - `restore`: replaying a dump into a table

pub mod list;
mod restore;

pub use restore::{RestoreOptions, RestoreStats};

use crate::client::Table;
use crate::config::{DUMP_RECORD_COLUMN, DUMP_RECORD_DATA, DUMP_RECORD_INFO, DUMP_RECORD_ROW};
use crate::table::{AxisKind, HeaderId};
use eyre::{Result, WrapErr};
use list::join_list;
use std::io::Write;
use std::path::Path;

/// Restricts a dump to some rows and columns. Both default to everything.
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    rows: Option<Vec<HeaderId>>,
    columns: Option<Vec<HeaderId>>,
}

impl DumpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, rows: Vec<HeaderId>) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn with_columns(mut self, columns: Vec<HeaderId>) -> Self {
        self.columns = Some(columns);
        self
    }
}

impl Table {
    pub fn dump(&self, options: &DumpOptions) -> Result<String> {
        let mut out = Vec::new();
        self.dump_to(&mut out, options)?;
        Ok(String::from_utf8(out)?)
    }

    /// Writes the dump to `writer`. Headers are written in position order
    /// whatever order the options list them in.
    pub fn dump_to(&self, writer: &mut dyn Write, options: &DumpOptions) -> Result<()> {
        let lines = {
            let core = self.core.lock();
            let state = self.client.state.lock();
            let pick = |axis: AxisKind, subset: &Option<Vec<HeaderId>>| -> Result<Vec<HeaderId>> {
                let all = core.axis(axis);
                match subset {
                    None => Ok(all.ids().to_vec()),
                    Some(ids) => {
                        let mut ids = ids.clone();
                        for id in &ids {
                            all.header(*id)?;
                        }
                        ids.sort_by_key(|id| all.position(*id).unwrap_or(usize::MAX));
                        ids.dedup();
                        Ok(ids)
                    }
                }
            };
            let rows = pick(AxisKind::Row, &options.rows)?;
            let columns = pick(AxisKind::Column, &options.columns)?;

            let mut lines = Vec::with_capacity(1 + rows.len() + columns.len());
            lines.push(join_list(&[
                DUMP_RECORD_INFO.to_string(),
                rows.len().to_string(),
                columns.len().to_string(),
                core.created().to_string(),
                core.modified().to_string(),
            ]));
            let column_tags = state.tags(&core, AxisKind::Column);
            for c in &columns {
                let header = core.columns.header(*c)?;
                lines.push(join_list(&[
                    DUMP_RECORD_COLUMN.to_string(),
                    header.position().to_string(),
                    header.label().to_string(),
                    core.column_type(*c)?.name().to_string(),
                    join_list(&column_tags.tags_of(*c)),
                ]));
            }
            let row_tags = state.tags(&core, AxisKind::Row);
            for r in &rows {
                let header = core.rows.header(*r)?;
                lines.push(join_list(&[
                    DUMP_RECORD_ROW.to_string(),
                    header.position().to_string(),
                    header.label().to_string(),
                    join_list(&row_tags.tags_of(*r)),
                ]));
            }
            for r in &rows {
                let ri = core.rows.position(*r)?;
                for c in &columns {
                    if let Some(text) = core.value(*r, *c)?.as_str() {
                        lines.push(join_list(&[
                            DUMP_RECORD_DATA.to_string(),
                            ri.to_string(),
                            core.columns.position(*c)?.to_string(),
                            text.to_string(),
                        ]));
                    }
                }
            }
            lines
        };

        for line in &lines {
            writeln!(writer, "{}", line).wrap_err("failed to write table dump")?;
        }
        writer.flush().wrap_err("failed to write table dump")?;
        log::debug!("{} dumped {} records", self.table_name(), lines.len());
        Ok(())
    }

    pub fn dump_to_path(&self, path: impl AsRef<Path>, options: &DumpOptions) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)
            .wrap_err_with(|| format!("failed to create dump file {}", path.display()))?;
        let mut writer = std::io::BufWriter::new(file);
        self.dump_to(&mut writer, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnType;

    #[test]
    fn record_layout() {
        let t = Table::new("t");
        let c = t.create_column(Some("name"), ColumnType::String).unwrap();
        let n = t.create_column(Some("n"), ColumnType::Int).unwrap();
        let rows = t.extend_rows(2);
        t.set(rows[0], c, "two words").unwrap();
        t.set(rows[1], n, "7").unwrap();
        t.add_tag(AxisKind::Row, rows[1], "odd").unwrap();

        let text = t.dump(&DumpOptions::new()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("i 2 2 "));
        assert_eq!(lines[1], "c 0 name string {}");
        assert_eq!(lines[2], "c 1 n int {}");
        assert_eq!(lines[3], "r 0 r1 {}");
        assert_eq!(lines[4], "r 1 r2 odd");
        assert_eq!(lines[5], "d 0 0 {two words}");
        assert_eq!(lines[6], "d 1 1 7");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn subset_keeps_table_positions() {
        let t = Table::new("t");
        let c = t.create_column(None, ColumnType::String).unwrap();
        let rows = t.extend_rows(3);
        t.set(rows[2], c, "x").unwrap();
        let text = t
            .dump(&DumpOptions::new().with_rows(vec![rows[2]]))
            .unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("i 1 1 "));
        assert_eq!(lines[2], "r 2 r3 {}");
        assert_eq!(lines[3], "d 2 0 x");
    }
}
