//! # Registry
//!
//! An explicit directory of named tables and of import/export formats.
//!
//! Tables are held by weak reference: registering a table never keeps its
//! core alive, and a name frees up as soon as the last client of that table
//! is dropped. Formats are trait objects keyed by name; [`Registry::new`]
//! pre-registers the built-in `dump` format.
//!
//! A registry is a plain value. Create as many as needed and drop them like
//! anything else; nothing here is process-global.
//!
//! ```ignore
//! let mut registry = Registry::new();
//! let orders = registry.create_table("orders")?;
//! let view = registry.open("orders", ClientOptions::new().with_name("view"))?;
//! registry.export("dump", &view, &mut std::io::stdout())?;
//! ```

use crate::client::{ClientOptions, Table};
use crate::dump::{DumpOptions, RestoreOptions};
use crate::error::TableError;
use crate::table::TableCore;
use eyre::{bail, Result, WrapErr};
use hashbrown::HashMap;
use std::io::{BufRead, Write};
use std::sync::{Arc, Weak};

/// Name under which [`DumpFormat`] is pre-registered.
pub const DUMP_FORMAT: &str = "dump";

/// Moves table content between a [`Table`] and an external byte format.
pub trait FormatAdapter: Send + Sync {
    fn import(&self, table: &Table, reader: &mut dyn BufRead) -> Result<()>;

    fn export(&self, table: &Table, writer: &mut dyn Write) -> Result<()>;
}

/// The dump format as an adapter. Exports the whole table.
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpFormat {
    restore: RestoreOptions,
}

impl DumpFormat {
    pub fn new(restore: RestoreOptions) -> Self {
        Self { restore }
    }
}

impl FormatAdapter for DumpFormat {
    fn import(&self, table: &Table, reader: &mut dyn BufRead) -> Result<()> {
        table.restore_from(reader, self.restore)?;
        Ok(())
    }

    fn export(&self, table: &Table, writer: &mut dyn Write) -> Result<()> {
        table.dump_to(writer, &DumpOptions::new())
    }
}

pub struct Registry {
    tables: HashMap<String, Weak<TableCore>>,
    formats: HashMap<String, Arc<dyn FormatAdapter>>,
}

impl Registry {
    pub fn new() -> Self {
        let mut registry = Self {
            tables: HashMap::new(),
            formats: HashMap::new(),
        };
        registry.register_format(DUMP_FORMAT, Arc::new(DumpFormat::default()));
        registry
    }

    /// Creates a table under `name` and returns its first client.
    pub fn create_table(&mut self, name: &str) -> Result<Table> {
        self.prune();
        if self.tables.contains_key(name) {
            bail!(TableError::LabelCollision {
                what: "table",
                label: name.to_string(),
            });
        }
        let table = Table::new(name);
        self.tables
            .insert(name.to_string(), Arc::downgrade(table.core()));
        log::debug!("registered table \"{}\"", name);
        Ok(table)
    }

    /// Opens a new client on the live table called `name`.
    pub fn open(&self, name: &str, options: ClientOptions) -> Result<Table> {
        match self.tables.get(name).and_then(Weak::upgrade) {
            Some(core) => Ok(Table::join(core, options)),
            None => bail!(TableError::not_found("table", name)),
        }
    }

    /// Names of the tables that still have a client, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .iter()
            .filter(|(_, core)| core.strong_count() > 0)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Registers `adapter` under `name`, returning the adapter it replaces.
    pub fn register_format(
        &mut self,
        name: &str,
        adapter: Arc<dyn FormatAdapter>,
    ) -> Option<Arc<dyn FormatAdapter>> {
        self.formats.insert(name.to_string(), adapter)
    }

    pub fn format(&self, name: &str) -> Result<Arc<dyn FormatAdapter>> {
        match self.formats.get(name) {
            Some(adapter) => Ok(Arc::clone(adapter)),
            None => bail!(TableError::not_found("format", name)),
        }
    }

    pub fn format_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.formats.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn import(&self, format: &str, table: &Table, reader: &mut dyn BufRead) -> Result<()> {
        self.format(format)?
            .import(table, reader)
            .wrap_err_with(|| format!("{} import into \"{}\" failed", format, table.table_name()))
    }

    pub fn export(&self, format: &str, table: &Table, writer: &mut dyn Write) -> Result<()> {
        self.format(format)?
            .export(table, writer)
            .wrap_err_with(|| format!("{} export of \"{}\" failed", format, table.table_name()))
    }

    fn prune(&mut self) {
        self.tables.retain(|_, core| core.strong_count() > 0);
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("tables", &self.table_names())
            .field("formats", &self.format_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::ColumnType;

    /// One value per line into the first column.
    struct LinesFormat;

    impl FormatAdapter for LinesFormat {
        fn import(&self, table: &Table, reader: &mut dyn BufRead) -> Result<()> {
            let column = match table.column_at(0) {
                Some(c) => c,
                None => table.create_column(None, ColumnType::String)?,
            };
            for line in reader.lines() {
                let row = table.create_row(None)?;
                table.set(row, column, line?)?;
            }
            Ok(())
        }

        fn export(&self, table: &Table, writer: &mut dyn Write) -> Result<()> {
            let Some(column) = table.column_at(0) else {
                return Ok(());
            };
            for value in table.column_values(column)? {
                writeln!(writer, "{}", value.as_str().unwrap_or_default())?;
            }
            Ok(())
        }
    }

    #[test]
    fn names_free_up_with_last_client() {
        let mut registry = Registry::new();
        let t = registry.create_table("orders").unwrap();
        let err = registry.create_table("orders").unwrap_err();
        assert_eq!(TableError::kind_of(&err), Some(ErrorKind::LabelCollision));

        let view = registry.open("orders", ClientOptions::new()).unwrap();
        assert!(view.shares_core_with(&t));
        assert_eq!(registry.table_names(), vec!["orders"]);

        drop(t);
        drop(view);
        assert!(registry.table_names().is_empty());
        let err = registry.open("orders", ClientOptions::new()).unwrap_err();
        assert_eq!(TableError::kind_of(&err), Some(ErrorKind::NotFound));
        assert!(registry.create_table("orders").is_ok());
    }

    #[test]
    fn dump_is_registered() {
        let mut registry = Registry::new();
        let src = registry.create_table("src").unwrap();
        let c = src.create_column(Some("a"), ColumnType::String).unwrap();
        let r = src.create_row(None).unwrap();
        src.set(r, c, "x y").unwrap();

        let mut bytes = Vec::new();
        registry.export(DUMP_FORMAT, &src, &mut bytes).unwrap();
        let dst = registry.create_table("dst").unwrap();
        registry
            .import(DUMP_FORMAT, &dst, &mut bytes.as_slice())
            .unwrap();
        let dc = dst.column_by_label("a").unwrap();
        assert_eq!(dst.get(dst.rows()[0], dc).unwrap().as_str(), Some("x y"));
    }

    #[test]
    fn custom_format() {
        let mut registry = Registry::new();
        assert!(registry
            .register_format("lines", Arc::new(LinesFormat))
            .is_none());
        assert_eq!(registry.format_names(), vec!["dump", "lines"]);

        let t = registry.create_table("t").unwrap();
        registry
            .import("lines", &t, &mut "one\ntwo\n".as_bytes())
            .unwrap();
        assert_eq!(t.num_rows(), 2);

        let mut out = Vec::new();
        registry.export("lines", &t, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "one\ntwo\n");

        let err = registry.export("csv", &t, &mut Vec::new()).unwrap_err();
        assert_eq!(TableError::kind_of(&err), Some(ErrorKind::NotFound));
    }
}
