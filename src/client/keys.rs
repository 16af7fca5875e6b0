//! # Primary Keys
//!
//! A client may name an ordered list of key columns. [`Table::find_by_key`]
//! then maps a tuple of cell strings to the row carrying them.
//!
//! The index is derived, never maintained incrementally: it records the core's
//! modification counter at build time and is rebuilt on the next lookup after
//! any mutation. Rows with an empty key component are not indexed, and when
//! two rows share a key the one earlier in position order wins.

use super::Table;
use crate::table::{CoreState, HeaderId};
use eyre::{bail, Result};
use hashbrown::HashMap;

#[derive(Debug, Default)]
pub(crate) struct KeyIndex {
    columns: Vec<HeaderId>,
    index: HashMap<Vec<String>, HeaderId>,
    built_at: Option<u64>,
}

impl KeyIndex {
    pub(crate) fn forget_column(&mut self, column: HeaderId) {
        if self.columns.contains(&column) {
            self.columns.retain(|c| *c != column);
            self.built_at = None;
        }
    }

    fn rebuild(&mut self, core: &CoreState) -> Result<()> {
        self.index.clear();
        'rows: for row in core.rows.ids() {
            let mut key = Vec::with_capacity(self.columns.len());
            for column in &self.columns {
                match core.value(*row, *column)?.as_str() {
                    Some(s) => key.push(s.to_string()),
                    None => continue 'rows,
                }
            }
            self.index.entry(key).or_insert(*row);
        }
        self.built_at = Some(core.mod_count());
        log::trace!("rebuilt key index with {} entries", self.index.len());
        Ok(())
    }
}

impl Table {
    /// Sets the key columns, replacing any previous list. An empty list
    /// clears the keys.
    pub fn set_keys(&self, columns: &[HeaderId]) -> Result<()> {
        let core = self.core.lock();
        for column in columns {
            core.columns.header(*column)?;
        }
        let mut state = self.client.state.lock();
        state.keys = KeyIndex {
            columns: columns.to_vec(),
            ..KeyIndex::default()
        };
        Ok(())
    }

    pub fn keys(&self) -> Vec<HeaderId> {
        self.client.state.lock().keys.columns.clone()
    }

    /// Finds the row whose key columns hold exactly `values`.
    pub fn find_by_key(&self, values: &[&str]) -> Result<Option<HeaderId>> {
        let core = self.core.lock();
        let mut state = self.client.state.lock();
        let keys = &mut state.keys;
        if keys.columns.is_empty() {
            bail!("table \"{}\" has no key columns", self.table_name());
        }
        if values.len() != keys.columns.len() {
            bail!(
                "key has {} components, table \"{}\" has {} key columns",
                values.len(),
                self.table_name(),
                keys.columns.len()
            );
        }
        if values.iter().any(|v| v.is_empty()) {
            return Ok(None);
        }
        if keys.built_at != Some(core.mod_count()) {
            keys.rebuild(&core)?;
        }
        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        Ok(keys.index.get(&key).copied())
    }
}
