//! # Table Core
//!
//! [`TableCore`] is the shared master object behind every client handle. It
//! owns both axes, the value grid, the timestamps and the shared tag tables,
//! and keeps weak references to the clients attached to it.
//!
//! ## Value Grid
//!
//! ```text
//!               row slot 0   row slot 1   ...   row slot (row capacity - 1)
//! col slot 0  [  Value     |  Value     | ... |  Value  ]
//! col slot 1  [  Value     |  Value     | ... |  Value  ]
//! ...
//! ```
//!
//! The grid is addressed `[column slot][row slot]`, never by position, so
//! reordering an axis never touches cell data. Every column vector, including
//! the vectors of free column slots, is exactly as long as the row pool's
//! capacity. Growing the row pool grows every vector; growing the column pool
//! adds vectors of the current row capacity.
//!
//! ## Ownership
//!
//! Clients own the core through `Arc<TableCore>`; the core only holds
//! `Weak<ClientShared>` back-references for event fan-out. The core is dropped
//! with its last client.
//!
//! ## Locking
//!
//! All mutable core state sits behind a single `parking_lot::Mutex`. Code that
//! also needs a client's private state locks the core first, then the client.

use super::axis::Axis;
use super::header::{AxisKind, HeaderId};
use crate::client::{ClientShared, TagTable};
use crate::error::TableError;
use crate::types::{ColumnType, Value};
use eyre::{bail, Result};
use parking_lot::{Mutex, MutexGuard};
use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Default)]
pub(crate) struct ColumnVector {
    ty: ColumnType,
    values: Vec<Value>,
}

pub struct TableCore {
    name: String,
    state: Mutex<CoreState>,
}

impl TableCore {
    pub(crate) fn new(name: impl Into<String>) -> Arc<Self> {
        let name = name.into();
        log::debug!("creating table core \"{}\"", name);
        Arc::new(Self {
            name,
            state: Mutex::new(CoreState::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CoreState> {
        self.state.lock()
    }
}

impl Drop for TableCore {
    fn drop(&mut self) {
        log::debug!("destroying table core \"{}\"", self.name);
    }
}

pub(crate) struct CoreState {
    pub(crate) rows: Axis,
    pub(crate) columns: Axis,
    vectors: Vec<ColumnVector>,
    created: u64,
    modified: u64,
    mod_count: u64,
    pub(crate) shared_row_tags: TagTable,
    pub(crate) shared_column_tags: TagTable,
    clients: Vec<Weak<ClientShared>>,
}

impl CoreState {
    fn new() -> Self {
        let now = now_secs();
        Self {
            rows: Axis::new(AxisKind::Row),
            columns: Axis::new(AxisKind::Column),
            vectors: Vec::new(),
            created: now,
            modified: now,
            mod_count: 0,
            shared_row_tags: TagTable::new(AxisKind::Row),
            shared_column_tags: TagTable::new(AxisKind::Column),
            clients: Vec::new(),
        }
    }

    pub(crate) fn axis(&self, kind: AxisKind) -> &Axis {
        match kind {
            AxisKind::Row => &self.rows,
            AxisKind::Column => &self.columns,
        }
    }

    pub(crate) fn axis_mut(&mut self, kind: AxisKind) -> &mut Axis {
        match kind {
            AxisKind::Row => &mut self.rows,
            AxisKind::Column => &mut self.columns,
        }
    }

    pub(crate) fn shared_tags(&self, kind: AxisKind) -> &TagTable {
        match kind {
            AxisKind::Row => &self.shared_row_tags,
            AxisKind::Column => &self.shared_column_tags,
        }
    }

    pub(crate) fn shared_tags_mut(&mut self, kind: AxisKind) -> &mut TagTable {
        match kind {
            AxisKind::Row => &mut self.shared_row_tags,
            AxisKind::Column => &mut self.shared_column_tags,
        }
    }

    pub(crate) fn created(&self) -> u64 {
        self.created
    }

    pub(crate) fn modified(&self) -> u64 {
        self.modified
    }

    pub(crate) fn mod_count(&self) -> u64 {
        self.mod_count
    }

    pub(crate) fn touch(&mut self) {
        self.modified = now_secs();
        self.mod_count += 1;
    }

    // ------------------------------------------------------------------
    // Clients
    // ------------------------------------------------------------------

    pub(crate) fn register_client(&mut self, client: &Arc<ClientShared>) {
        self.clients.retain(|w| w.strong_count() > 0);
        self.clients.push(Arc::downgrade(client));
    }

    pub(crate) fn unregister_client(&mut self, client: &Arc<ClientShared>) {
        let target = Arc::downgrade(client);
        self.clients
            .retain(|w| w.strong_count() > 0 && !Weak::ptr_eq(w, &target));
    }

    /// Live clients in attach order.
    pub(crate) fn live_clients(&self) -> Vec<Arc<ClientShared>> {
        self.clients.iter().filter_map(Weak::upgrade).collect()
    }

    // ------------------------------------------------------------------
    // Grid maintenance
    // ------------------------------------------------------------------

    fn sync_capacity(&mut self) {
        let row_capacity = self.rows.capacity();
        let column_capacity = self.columns.capacity();
        if self.vectors.len() < column_capacity {
            self.vectors.resize_with(column_capacity, ColumnVector::default);
        }
        for vector in &mut self.vectors {
            if vector.values.len() < row_capacity {
                vector.values.resize(row_capacity, Value::EMPTY);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn grid_is_sized(&self) -> bool {
        self.vectors.len() == self.columns.capacity()
            && self
                .vectors
                .iter()
                .all(|v| v.values.len() == self.rows.capacity())
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    pub(crate) fn create_header(
        &mut self,
        kind: AxisKind,
        label: Option<&str>,
        position: Option<usize>,
    ) -> Result<HeaderId> {
        let id = self.axis_mut(kind).create(label, position)?;
        self.sync_capacity();
        Ok(id)
    }

    pub(crate) fn create_header_with_id(
        &mut self,
        kind: AxisKind,
        id: HeaderId,
        label: Option<&str>,
    ) -> Result<HeaderId> {
        let id = self.axis_mut(kind).create_with_id(id, label, None)?;
        self.sync_capacity();
        Ok(id)
    }

    pub(crate) fn extend(&mut self, kind: AxisKind, n: usize) -> Vec<HeaderId> {
        let ids = self.axis_mut(kind).extend(n);
        self.sync_capacity();
        ids
    }

    /// Removes a header and clears the cells it owned.
    pub(crate) fn delete_header(&mut self, kind: AxisKind, id: HeaderId) -> Result<()> {
        self.axis_mut(kind).delete(id)?;
        match kind {
            AxisKind::Row => {
                for vector in &mut self.vectors {
                    vector.values[id.slot()] = Value::EMPTY;
                }
            }
            AxisKind::Column => {
                let vector = &mut self.vectors[id.slot()];
                vector.ty = ColumnType::String;
                vector.values.iter_mut().for_each(|v| *v = Value::EMPTY);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cells
    // ------------------------------------------------------------------

    pub(crate) fn check_cell(&self, row: HeaderId, column: HeaderId) -> Result<()> {
        self.rows.header(row)?;
        self.columns.header(column)?;
        Ok(())
    }

    pub(crate) fn value(&self, row: HeaderId, column: HeaderId) -> Result<&Value> {
        self.check_cell(row, column)?;
        Ok(&self.vectors[column.slot()].values[row.slot()])
    }

    /// Coerces `value` to the column's type without storing it.
    pub(crate) fn coerce_for(&self, column: HeaderId, value: &Value) -> Result<Value> {
        let ty = self.column_type(column)?;
        match value.coerce(ty) {
            Some(v) => Ok(v),
            None => bail!(TableError::TypeMismatch {
                column: self.columns.label(column)?.to_string(),
                expected: ty,
                value: value.to_string(),
            }),
        }
    }

    /// Stores an already-coerced value.
    pub(crate) fn put(&mut self, row: HeaderId, column: HeaderId, value: Value) -> Result<()> {
        self.check_cell(row, column)?;
        self.vectors[column.slot()].values[row.slot()] = value;
        Ok(())
    }

    pub(crate) fn column_type(&self, column: HeaderId) -> Result<ColumnType> {
        self.columns.header(column)?;
        Ok(self.vectors[column.slot()].ty)
    }

    /// Changes a column's type, re-coercing every non-empty cell. The column
    /// is untouched if any cell fails to coerce.
    pub(crate) fn set_column_type(&mut self, column: HeaderId, ty: ColumnType) -> Result<()> {
        let label = self.columns.label(column)?.to_string();
        let vector = &self.vectors[column.slot()];
        let mut converted = Vec::with_capacity(vector.values.len());
        for value in &vector.values {
            match value.coerce(ty) {
                Some(v) => converted.push(v),
                None => bail!(TableError::TypeMismatch {
                    column: label,
                    expected: ty,
                    value: value.to_string(),
                }),
            }
        }
        let vector = &mut self.vectors[column.slot()];
        vector.ty = ty;
        vector.values = converted;
        Ok(())
    }

    /// Cells of a column in row map order.
    pub(crate) fn column_cells(&self, column: HeaderId) -> Result<Vec<Value>> {
        self.columns.header(column)?;
        let values = &self.vectors[column.slot()].values;
        Ok(self
            .rows
            .ids()
            .iter()
            .map(|r| values[r.slot()].clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn grid_tracks_row_capacity() {
        let mut core = CoreState::new();
        let c = core.create_header(AxisKind::Column, None, None).unwrap();
        core.extend(AxisKind::Row, 200);
        assert!(core.grid_is_sized());
        let r = core.rows.id_at(150).unwrap();
        core.put(r, c, Value::text("x")).unwrap();
        assert_eq!(core.value(r, c).unwrap().as_str(), Some("x"));
    }

    #[test]
    fn deleted_row_slot_is_cleared_for_reuse() {
        let mut core = CoreState::new();
        let c = core.create_header(AxisKind::Column, None, None).unwrap();
        let r = core.create_header(AxisKind::Row, None, None).unwrap();
        core.put(r, c, Value::text("old")).unwrap();
        core.delete_header(AxisKind::Row, r).unwrap();

        let again = core.create_header(AxisKind::Row, None, None).unwrap();
        assert_eq!(again.slot(), r.slot());
        assert!(core.value(again, c).unwrap().is_empty());
        assert!(core.value(r, c).is_err());
    }

    #[test]
    fn failed_type_change_leaves_column() {
        let mut core = CoreState::new();
        let c = core.create_header(AxisKind::Column, None, None).unwrap();
        let rows = core.extend(AxisKind::Row, 2);
        core.put(rows[0], c, Value::text("1")).unwrap();
        core.put(rows[1], c, Value::text("one")).unwrap();

        let err = core.set_column_type(c, ColumnType::Int).unwrap_err();
        assert_eq!(TableError::kind_of(&err), Some(ErrorKind::TypeMismatch));
        assert_eq!(core.column_type(c).unwrap(), ColumnType::String);
        assert_eq!(core.value(rows[1], c).unwrap().as_str(), Some("one"));
    }

    #[test]
    fn coerce_reports_column_label() {
        let mut core = CoreState::new();
        let c = core
            .create_header(AxisKind::Column, Some("qty"), None)
            .unwrap();
        core.set_column_type(c, ColumnType::Int).unwrap();
        let err = core.coerce_for(c, &Value::text("many")).unwrap_err();
        assert!(err.to_string().contains("qty"));
    }
}
