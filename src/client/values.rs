//! # Value Access
//!
//! Cell reads and writes through a client. Every access is traced:
//!
//! | Operation | Mask fired | When |
//! |-----------|------------|------|
//! | `get` | READ | after the value is read |
//! | `set` on an empty cell | WRITE, CREATE | before the value is stored |
//! | `set` on a set cell | WRITE | before the value is stored |
//! | `unset` on a set cell | UNSET | before the cell is cleared |
//! | `unset` on an empty cell | nothing | no-op |
//!
//! A `set` whose value coerces to empty is an `unset`. Coercion against the
//! column type happens before any trace fires, so a `TypeMismatch` leaves the
//! cell untouched and runs no callback. The value is coerced again when it is
//! stored, so a callback that changes the column type cannot let a value of
//! the old type in.
//!
//! Bulk helpers (`row_values`, `set_row_values`, `copy_column`, ...) are built
//! on the same paths and fire one trace event per cell.

use super::trace::{self, PendingTraces, TraceMask};
use super::Table;
use crate::table::{AxisKind, CoreState, HeaderId};
use crate::types::Value;
use eyre::{bail, Result};

impl Table {
    pub fn get(&self, row: HeaderId, column: HeaderId) -> Result<Value> {
        let (value, pending) = {
            let core = self.core.lock();
            let value = core.value(row, column)?.clone();
            let pending = trace::collect(&core, row, column, TraceMask::READ, &value);
            (value, pending)
        };
        trace::dispatch(pending);
        Ok(value)
    }

    /// Stores `value`, coerced to the column's type.
    pub fn set(&self, row: HeaderId, column: HeaderId, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let (coerced, pending) = {
            let core = self.core.lock();
            let was_empty = core.value(row, column)?.is_empty();
            let coerced = core.coerce_for(column, &value)?;
            if coerced.is_empty() {
                drop(core);
                return self.unset(row, column).map(|_| ());
            }
            let mut fired = TraceMask::WRITE;
            if was_empty {
                fired |= TraceMask::CREATE;
            }
            let pending = trace::collect(&core, row, column, fired, &coerced);
            (coerced, pending)
        };
        trace::dispatch(pending);

        // A callback may have retyped the column.
        let mut core = self.core.lock();
        let coerced = core.coerce_for(column, &coerced)?;
        core.put(row, column, coerced)?;
        core.touch();
        Ok(())
    }

    /// Clears a cell. Returns `false` without firing traces if it was
    /// already empty.
    pub fn unset(&self, row: HeaderId, column: HeaderId) -> Result<bool> {
        let pending = {
            let core = self.core.lock();
            let current = core.value(row, column)?;
            if current.is_empty() {
                return Ok(false);
            }
            trace::collect(&core, row, column, TraceMask::UNSET, current)
        };
        trace::dispatch(pending);

        let mut core = self.core.lock();
        core.put(row, column, Value::EMPTY)?;
        core.touch();
        Ok(true)
    }

    /// True if both headers are live and the cell holds a value.
    pub fn exists(&self, row: HeaderId, column: HeaderId) -> bool {
        self.core
            .lock()
            .value(row, column)
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }

    /// Sets every cell named by a pair of raw specifiers, creating missing
    /// rows and columns first. Returns the number of cells written.
    pub fn set_raw(&self, row: &str, column: &str, value: impl Into<Value>) -> Result<usize> {
        let value = value.into();
        let rows = self.resolve_or_create(AxisKind::Row, row)?;
        let columns = self.resolve_or_create(AxisKind::Column, column)?;
        for r in &rows {
            for c in &columns {
                self.set(*r, *c, value.clone())?;
            }
        }
        Ok(rows.len() * columns.len())
    }

    /// Reads the single cell named by a pair of raw specifiers. Never creates.
    pub fn get_raw(&self, row: &str, column: &str) -> Result<Value> {
        let rows = self.resolve_raw(AxisKind::Row, row)?;
        let columns = self.resolve_raw(AxisKind::Column, column)?;
        match (rows.as_slice(), columns.as_slice()) {
            ([r], [c]) => self.get(*r, *c),
            _ => bail!(
                "\"{}\" x \"{}\" names {} cells, expected one",
                row,
                column,
                rows.len() * columns.len()
            ),
        }
    }

    /// The cell's text, or this client's empty value when unset.
    pub fn render(&self, row: HeaderId, column: HeaderId) -> Result<String> {
        let value = self.get(row, column)?;
        Ok(match value.as_str() {
            Some(s) => s.to_string(),
            None => self.empty_value(),
        })
    }

    fn read_cells(
        &self,
        pick: impl FnOnce(&CoreState) -> Result<Vec<(HeaderId, HeaderId)>>,
    ) -> Result<Vec<Value>> {
        let (values, pending) = {
            let core = self.core.lock();
            let cells = pick(&core)?;
            let mut values = Vec::with_capacity(cells.len());
            let mut pending = PendingTraces::new();
            for (row, column) in cells {
                let value = core.value(row, column)?.clone();
                pending.extend(trace::collect(&core, row, column, TraceMask::READ, &value));
                values.push(value);
            }
            (values, pending)
        };
        trace::dispatch(pending);
        Ok(values)
    }

    /// Cells of a row in column order.
    pub fn row_values(&self, row: HeaderId) -> Result<Vec<Value>> {
        self.read_cells(|core| {
            core.rows.header(row)?;
            Ok(core.columns.ids().iter().map(|c| (row, *c)).collect())
        })
    }

    /// Cells of a column in row order.
    pub fn column_values(&self, column: HeaderId) -> Result<Vec<Value>> {
        self.read_cells(|core| {
            core.columns.header(column)?;
            Ok(core.rows.ids().iter().map(|r| (*r, column)).collect())
        })
    }

    /// Writes `values` into a row from the first column on, appending
    /// columns if there are more values than columns.
    pub fn set_row_values<I>(&self, row: HeaderId, values: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.core.lock().rows.header(row)?;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.extend(
            AxisKind::Column,
            values.len().saturating_sub(self.num_columns()),
        );
        for (column, value) in self.columns().into_iter().zip(values) {
            self.set(row, column, value)?;
        }
        Ok(())
    }

    /// Writes `values` into a column from the first row on, appending rows
    /// if there are more values than rows.
    pub fn set_column_values<I>(&self, column: HeaderId, values: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.core.lock().columns.header(column)?;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.extend(AxisKind::Row, values.len().saturating_sub(self.num_rows()));
        for (row, value) in self.rows().into_iter().zip(values) {
            self.set(row, column, value)?;
        }
        Ok(())
    }

    /// Appends text to a cell, traced as a write.
    pub fn append_value(&self, row: HeaderId, column: HeaderId, suffix: &str) -> Result<()> {
        let current = self.core.lock().value(row, column)?.clone();
        let mut text = current.as_str().unwrap_or("").to_string();
        text.push_str(suffix);
        self.set(row, column, Value::text(text))
    }

    /// Copies every cell of `src` into `dst`, coercing to `dst`'s type.
    /// Every value is checked first, so a `TypeMismatch` leaves `dst`
    /// untouched.
    pub fn copy_column(&self, src: HeaderId, dst: HeaderId) -> Result<()> {
        let cells = {
            let core = self.core.lock();
            core.columns.header(dst)?;
            let values = core.column_cells(src)?;
            for value in &values {
                core.coerce_for(dst, value)?;
            }
            core.rows.ids().iter().copied().zip(values).collect::<Vec<_>>()
        };
        for (row, value) in cells {
            if value.is_empty() {
                self.unset(row, dst)?;
            } else {
                self.set(row, dst, value)?;
            }
        }
        Ok(())
    }

    /// Distinct non-empty strings of a column, sorted.
    pub fn unique_values(&self, column: HeaderId) -> Result<Vec<String>> {
        let mut values: Vec<String> = self
            .core
            .lock()
            .column_cells(column)?
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        values.sort();
        values.dedup();
        Ok(values)
    }
}
