//! # Structural Operations
//!
//! Creating, deleting, moving and relabelling rows and columns, plus the
//! lookups that turn labels, positions and specifiers into identities.
//!
//! Every method here that changes the shape of an axis goes through
//! [`Table::mutate`], which raises the matching notifications once the core
//! lock is released. Relabelling and hiding change no structure and raise
//! nothing.
//!
//! Most operations come in an axis-generic form taking an [`AxisKind`] and
//! thin row/column wrappers around it.

use super::{Change, Table};
use crate::config::MAX_RAW_INDEX_GROWTH;
use crate::error::TableError;
use crate::table::{classify, AxisKind, HeaderId, HeaderIter, Spec};
use crate::types::ColumnType;
use eyre::{bail, Result};

impl Table {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Creates a header at `position`, or at the end when `None`. A label is
    /// generated when none is given.
    pub fn create(
        &self,
        axis: AxisKind,
        label: Option<&str>,
        position: Option<usize>,
    ) -> Result<HeaderId> {
        let id = self.mutate(|core, changes| {
            let id = core.create_header(axis, label, position)?;
            changes.push(Change::created(axis, id));
            Ok::<_, eyre::Report>(id)
        })?;
        log::debug!("{} created {} {}", self.table_name(), axis.name(), id);
        Ok(id)
    }

    /// Creates a header with a caller-chosen identity, appended at the end.
    /// Fails with `DuplicateId` if the identity's slot is live.
    pub fn create_with_id(
        &self,
        axis: AxisKind,
        id: HeaderId,
        label: Option<&str>,
    ) -> Result<HeaderId> {
        self.mutate(|core, changes| {
            let id = core.create_header_with_id(axis, id, label)?;
            changes.push(Change::created(axis, id));
            Ok(id)
        })
    }

    pub fn create_row(&self, label: Option<&str>) -> Result<HeaderId> {
        self.create(AxisKind::Row, label, None)
    }

    pub fn insert_row(&self, label: Option<&str>, position: usize) -> Result<HeaderId> {
        self.create(AxisKind::Row, label, Some(position))
    }

    pub fn create_column(&self, label: Option<&str>, ty: ColumnType) -> Result<HeaderId> {
        self.insert_column_at(label, None, ty)
    }

    pub fn insert_column(
        &self,
        label: Option<&str>,
        position: usize,
        ty: ColumnType,
    ) -> Result<HeaderId> {
        self.insert_column_at(label, Some(position), ty)
    }

    fn insert_column_at(
        &self,
        label: Option<&str>,
        position: Option<usize>,
        ty: ColumnType,
    ) -> Result<HeaderId> {
        self.mutate(|core, changes| {
            let id = core.create_header(AxisKind::Column, label, position)?;
            core.set_column_type(id, ty)?;
            changes.push(Change::created(AxisKind::Column, id));
            Ok(id)
        })
    }

    /// Appends `n` headers with generated labels.
    pub fn extend(&self, axis: AxisKind, n: usize) -> Vec<HeaderId> {
        if n == 0 {
            return Vec::new();
        }
        let ids = self.mutate(|core, changes| {
            let ids = core.extend(axis, n);
            changes.extend(ids.iter().map(|id| Change::created(axis, *id)));
            ids
        });
        log::debug!("{} extended {}s by {}", self.table_name(), axis.name(), n);
        ids
    }

    pub fn extend_rows(&self, n: usize) -> Vec<HeaderId> {
        self.extend(AxisKind::Row, n)
    }

    pub fn extend_columns(&self, n: usize) -> Vec<HeaderId> {
        self.extend(AxisKind::Column, n)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Deletes a header, clears its cells and drops every tag, trace,
    /// notifier and key registration that names it.
    pub fn delete(&self, axis: AxisKind, id: HeaderId) -> Result<()> {
        self.mutate(|core, changes| {
            core.delete_header(axis, id)?;
            changes.push(Change::deleted(axis, id));
            Ok::<_, eyre::Report>(())
        })?;
        log::debug!("{} deleted {} {}", self.table_name(), axis.name(), id);
        Ok(())
    }

    pub fn delete_row(&self, id: HeaderId) -> Result<()> {
        self.delete(AxisKind::Row, id)
    }

    pub fn delete_column(&self, id: HeaderId) -> Result<()> {
        self.delete(AxisKind::Column, id)
    }

    /// Deletes every header `spec` resolves to. Returns how many were deleted.
    pub fn delete_matching(&self, axis: AxisKind, spec: &Spec) -> Result<usize> {
        let ids = self.resolve(axis, spec)?;
        self.mutate(|core, changes| {
            for id in &ids {
                core.delete_header(axis, *id)?;
                changes.push(Change::deleted(axis, *id));
            }
            Ok::<_, eyre::Report>(())
        })?;
        Ok(ids.len())
    }

    // ------------------------------------------------------------------
    // Move
    // ------------------------------------------------------------------

    /// Moves the `count` headers starting at position `first` so they sit
    /// before `dest`, or after it when `after` is set. Raises `Moved` for
    /// every header whose position changed.
    pub fn move_run(
        &self,
        axis: AxisKind,
        first: usize,
        count: usize,
        dest: HeaderId,
        after: bool,
    ) -> Result<()> {
        let moved = self.mutate(|core, changes| {
            let moved = core.axis_mut(axis).move_run(first, count, dest, after)?;
            changes.extend(moved.iter().map(|id| Change::moved(axis, *id)));
            Ok::<_, eyre::Report>(moved.len())
        })?;
        log::debug!(
            "{} moved {} {}s, {} re-stamped",
            self.table_name(),
            count,
            axis.name(),
            moved
        );
        Ok(())
    }

    pub fn move_rows(&self, first: usize, count: usize, dest: HeaderId, after: bool) -> Result<()> {
        self.move_run(AxisKind::Row, first, count, dest, after)
    }

    pub fn move_columns(
        &self,
        first: usize,
        count: usize,
        dest: HeaderId,
        after: bool,
    ) -> Result<()> {
        self.move_run(AxisKind::Column, first, count, dest, after)
    }

    // ------------------------------------------------------------------
    // Labels and flags
    // ------------------------------------------------------------------

    pub fn relabel(&self, axis: AxisKind, id: HeaderId, label: &str) -> Result<()> {
        let mut core = self.core.lock();
        core.axis_mut(axis).relabel(id, label)?;
        core.touch();
        Ok(())
    }

    pub fn label(&self, axis: AxisKind, id: HeaderId) -> Result<String> {
        Ok(self.core.lock().axis(axis).label(id)?.to_string())
    }

    pub fn position(&self, axis: AxisKind, id: HeaderId) -> Result<usize> {
        self.core.lock().axis(axis).position(id)
    }

    pub fn header_at(&self, axis: AxisKind, position: usize) -> Option<HeaderId> {
        self.core.lock().axis(axis).id_at(position)
    }

    pub fn find(&self, axis: AxisKind, label: &str) -> Option<HeaderId> {
        self.core.lock().axis(axis).find(label)
    }

    /// Headers in position order.
    pub fn ids(&self, axis: AxisKind) -> Vec<HeaderId> {
        self.core.lock().axis(axis).ids().to_vec()
    }

    pub fn len(&self, axis: AxisKind) -> usize {
        self.core.lock().axis(axis).len()
    }

    pub fn contains(&self, axis: AxisKind, id: HeaderId) -> bool {
        self.core.lock().axis(axis).contains(id)
    }

    pub fn set_hidden(&self, axis: AxisKind, id: HeaderId, hidden: bool) -> Result<()> {
        self.core.lock().axis_mut(axis).set_hidden(id, hidden)
    }

    pub fn is_hidden(&self, axis: AxisKind, id: HeaderId) -> Result<bool> {
        Ok(self.core.lock().axis(axis).header(id)?.is_hidden())
    }

    // Row and column conveniences.

    pub fn num_rows(&self) -> usize {
        self.len(AxisKind::Row)
    }

    pub fn num_columns(&self) -> usize {
        self.len(AxisKind::Column)
    }

    pub fn rows(&self) -> Vec<HeaderId> {
        self.ids(AxisKind::Row)
    }

    pub fn columns(&self) -> Vec<HeaderId> {
        self.ids(AxisKind::Column)
    }

    pub fn row_label(&self, row: HeaderId) -> Result<String> {
        self.label(AxisKind::Row, row)
    }

    pub fn column_label(&self, column: HeaderId) -> Result<String> {
        self.label(AxisKind::Column, column)
    }

    pub fn row_position(&self, row: HeaderId) -> Result<usize> {
        self.position(AxisKind::Row, row)
    }

    pub fn column_position(&self, column: HeaderId) -> Result<usize> {
        self.position(AxisKind::Column, column)
    }

    pub fn row_by_label(&self, label: &str) -> Option<HeaderId> {
        self.find(AxisKind::Row, label)
    }

    pub fn column_by_label(&self, label: &str) -> Option<HeaderId> {
        self.find(AxisKind::Column, label)
    }

    pub fn row_at(&self, position: usize) -> Option<HeaderId> {
        self.header_at(AxisKind::Row, position)
    }

    pub fn column_at(&self, position: usize) -> Option<HeaderId> {
        self.header_at(AxisKind::Column, position)
    }

    pub fn set_row_hidden(&self, row: HeaderId, hidden: bool) -> Result<()> {
        self.set_hidden(AxisKind::Row, row, hidden)
    }

    pub fn row_hidden(&self, row: HeaderId) -> Result<bool> {
        self.is_hidden(AxisKind::Row, row)
    }

    pub fn set_column_hidden(&self, column: HeaderId, hidden: bool) -> Result<()> {
        self.set_hidden(AxisKind::Column, column, hidden)
    }

    pub fn column_hidden(&self, column: HeaderId) -> Result<bool> {
        self.is_hidden(AxisKind::Column, column)
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Headers named by `spec`, in iteration order.
    pub fn resolve(&self, axis: AxisKind, spec: &Spec) -> Result<Vec<HeaderId>> {
        let core = self.core.lock();
        let state = self.client.state.lock();
        let ids = HeaderIter::new(core.axis(axis), state.tags(&core, axis), spec)?.collect();
        Ok(ids)
    }

    /// Resolves a raw specifier: an index, `all`, `end`, a label or a tag.
    pub fn resolve_raw(&self, axis: AxisKind, raw: &str) -> Result<Vec<HeaderId>> {
        let spec = {
            let core = self.core.lock();
            let state = self.client.state.lock();
            classify(core.axis(axis), state.tags(&core, axis), raw)?
        };
        self.resolve(axis, &spec)
    }

    /// Like [`resolve_raw`](Self::resolve_raw), but a missing index or label
    /// creates the header: a label creates one header with that label, an
    /// index `n` extends the axis to `n + 1` headers. An index that would
    /// append more than [`MAX_RAW_INDEX_GROWTH`] headers is `NotFound`.
    pub fn resolve_or_create(&self, axis: AxisKind, raw: &str) -> Result<Vec<HeaderId>> {
        match self.resolve_raw(axis, raw) {
            Ok(ids) => Ok(ids),
            Err(err) if TableError::is_creatable(&err) => {
                if raw.bytes().all(|b| b.is_ascii_digit()) {
                    let len = self.len(axis);
                    let target = raw
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| Some((n, n.checked_add(1)?.saturating_sub(len))))
                        .filter(|(_, missing)| *missing <= MAX_RAW_INDEX_GROWTH);
                    let Some((n, missing)) = target else {
                        bail!(TableError::not_found(axis.name(), raw));
                    };
                    self.extend(axis, missing);
                    match self.header_at(axis, n) {
                        Some(id) => Ok(vec![id]),
                        None => bail!(TableError::not_found(axis.name(), raw)),
                    }
                } else {
                    Ok(vec![self.create(axis, Some(raw), None)?])
                }
            }
            Err(err) => Err(err),
        }
    }

    // ------------------------------------------------------------------
    // Column types
    // ------------------------------------------------------------------

    pub fn column_type(&self, column: HeaderId) -> Result<ColumnType> {
        self.core.lock().column_type(column)
    }

    /// Changes a column's type, re-coercing every non-empty cell. On any
    /// failure the column keeps its old type and values.
    pub fn set_column_type(&self, column: HeaderId, ty: ColumnType) -> Result<()> {
        let mut core = self.core.lock();
        core.set_column_type(column, ty)?;
        core.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn huge_raw_index_is_not_found() {
        let t = Table::new("t");
        t.create_column(Some("c"), ColumnType::String).unwrap();
        for raw in ["18446744073709551615", "99999999999", "999999999999999999999999"] {
            let err = t.set_raw(raw, "c", "x").unwrap_err();
            assert_eq!(TableError::kind_of(&err), Some(ErrorKind::NotFound));
        }
        assert_eq!(t.num_rows(), 0);

        let last = MAX_RAW_INDEX_GROWTH - 1;
        assert_eq!(t.resolve_or_create(AxisKind::Row, &last.to_string()).unwrap().len(), 1);
        assert_eq!(t.num_rows(), MAX_RAW_INDEX_GROWTH);
    }

    #[test]
    fn explicit_id_slot_is_bounded() {
        let t = Table::new("t");
        let err = t
            .create_with_id(AxisKind::Row, HeaderId::new(u32::MAX, 0), None)
            .unwrap_err();
        assert_eq!(TableError::kind_of(&err), Some(ErrorKind::NotFound));
        assert_eq!(t.num_rows(), 0);
    }

    #[test]
    fn insert_restamps() {
        let t = Table::new("t");
        let rows = t.extend_rows(3);
        let x = t.insert_row(Some("x"), 1).unwrap();
        assert_eq!(t.rows(), vec![rows[0], x, rows[1], rows[2]]);
        assert_eq!(t.row_position(rows[2]).unwrap(), 3);
    }

    #[test]
    fn relabel_collision() {
        let t = Table::new("t");
        let a = t.create_row(Some("a")).unwrap();
        t.create_row(Some("b")).unwrap();
        let err = t.relabel(AxisKind::Row, a, "b").unwrap_err();
        assert_eq!(TableError::kind_of(&err), Some(ErrorKind::LabelCollision));
        t.relabel(AxisKind::Row, a, "c").unwrap();
        assert_eq!(t.row_by_label("c"), Some(a));
        assert_eq!(t.row_by_label("a"), None);
    }

    #[test]
    fn create_with_live_id_is_duplicate() {
        let t = Table::new("t");
        let r = t.create_row(None).unwrap();
        let err = t.create_with_id(AxisKind::Row, r, None).unwrap_err();
        assert_eq!(TableError::kind_of(&err), Some(ErrorKind::DuplicateId));
    }

    #[test]
    fn resolve_or_create_by_index_and_label() {
        let t = Table::new("t");
        let ids = t.resolve_or_create(AxisKind::Column, "2").unwrap();
        assert_eq!(t.num_columns(), 3);
        assert_eq!(ids, vec![t.column_at(2).unwrap()]);

        let ids = t.resolve_or_create(AxisKind::Row, "total").unwrap();
        assert_eq!(t.row_label(ids[0]).unwrap(), "total");
        assert_eq!(t.resolve_or_create(AxisKind::Row, "total").unwrap(), ids);
    }

    #[test]
    fn hidden_flag_does_not_affect_resolution() {
        let t = Table::new("t");
        let r = t.create_row(Some("secret")).unwrap();
        t.set_row_hidden(r, true).unwrap();
        assert!(t.row_hidden(r).unwrap());
        assert_eq!(t.resolve_raw(AxisKind::Row, "secret").unwrap(), vec![r]);
    }

    #[test]
    fn delete_matching_tag() {
        let t = Table::new("t");
        let rows = t.extend_rows(4);
        t.add_tag(AxisKind::Row, rows[0], "gone").unwrap();
        t.add_tag(AxisKind::Row, rows[2], "gone").unwrap();
        assert_eq!(t.delete_matching(AxisKind::Row, &Spec::tag("gone")).unwrap(), 2);
        assert_eq!(t.rows(), vec![rows[1], rows[3]]);
        assert!(t.tag_members(AxisKind::Row, "gone").unwrap().is_empty());
    }
}
