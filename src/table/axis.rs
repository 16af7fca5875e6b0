//! # Axis
//!
//! An [`Axis`] is one dimension of a table. It owns the header pool, the
//! ordering `map` that defines what position `n` means, and the label index.
//!
//! ## Position Invariant
//!
//! For every header `h` in the map, `map[h.position] == h`. Every method that
//! splices the map re-stamps the positions of the headers it shifted before
//! returning, so callers never observe a stale position.
//!
//! ```text
//! map:      [ r1 | r4 | r2 | r3 ]        position(r2) == 2
//! move r3 before r4
//! map:      [ r1 | r3 | r4 | r2 ]        r3, r4, r2 re-stamped
//! ```
//!
//! ## Labels
//!
//! Labels are unique per axis at any instant. When a caller does not supply
//! one, the axis generates `<prefix><serial>` from a monotonic counter,
//! skipping serials whose label is already taken.

use super::header::{AxisKind, Header, HeaderId, HeaderPool};
use crate::config::{
    COLUMN_LABEL_PREFIX, INITIAL_COLUMN_CAPACITY, INITIAL_ROW_CAPACITY, ROW_LABEL_PREFIX,
};
use crate::error::TableError;
use eyre::{bail, Result};
use hashbrown::HashMap;

#[derive(Debug)]
pub struct Axis {
    kind: AxisKind,
    pool: HeaderPool,
    map: Vec<HeaderId>,
    labels: HashMap<String, HeaderId>,
    next_serial: u64,
}

impl Axis {
    pub fn new(kind: AxisKind) -> Self {
        let initial = match kind {
            AxisKind::Row => INITIAL_ROW_CAPACITY,
            AxisKind::Column => INITIAL_COLUMN_CAPACITY,
        };
        Self {
            kind,
            pool: HeaderPool::new(kind, initial),
            map: Vec::new(),
            labels: HashMap::new(),
            next_serial: 0,
        }
    }

    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Headers in map order.
    pub fn ids(&self) -> &[HeaderId] {
        &self.map
    }

    pub fn contains(&self, id: HeaderId) -> bool {
        self.pool.contains(id)
    }

    pub fn header(&self, id: HeaderId) -> Result<&Header> {
        match self.pool.get(id) {
            Some(h) => Ok(h),
            None => bail!(TableError::not_found(self.kind.name(), id.to_string())),
        }
    }

    fn header_mut(&mut self, id: HeaderId) -> Result<&mut Header> {
        let kind = self.kind;
        match self.pool.get_mut(id) {
            Some(h) => Ok(h),
            None => bail!(TableError::not_found(kind.name(), id.to_string())),
        }
    }

    pub fn label(&self, id: HeaderId) -> Result<&str> {
        self.header(id).map(|h| h.label())
    }

    pub fn position(&self, id: HeaderId) -> Result<usize> {
        self.header(id).map(|h| h.position())
    }

    pub fn id_at(&self, position: usize) -> Option<HeaderId> {
        self.map.get(position).copied()
    }

    pub fn find(&self, label: &str) -> Option<HeaderId> {
        self.labels.get(label).copied()
    }

    pub fn last(&self) -> Option<HeaderId> {
        self.map.last().copied()
    }

    fn prefix(&self) -> &'static str {
        match self.kind {
            AxisKind::Row => ROW_LABEL_PREFIX,
            AxisKind::Column => COLUMN_LABEL_PREFIX,
        }
    }

    fn next_label(&mut self) -> String {
        loop {
            self.next_serial += 1;
            let label = format!("{}{}", self.prefix(), self.next_serial);
            if !self.labels.contains_key(&label) {
                return label;
            }
        }
    }

    fn claim_label(&mut self, label: Option<&str>) -> Result<String> {
        match label {
            Some(l) if self.labels.contains_key(l) => bail!(TableError::LabelCollision {
                what: self.kind.name(),
                label: l.to_string(),
            }),
            Some(l) => Ok(l.to_string()),
            None => Ok(self.next_label()),
        }
    }

    /// Creates a header at `position` (appended when `None` or past the end).
    pub fn create(&mut self, label: Option<&str>, position: Option<usize>) -> Result<HeaderId> {
        let label = self.claim_label(label)?;
        let id = self.pool.alloc(Header::new(label.clone()));
        self.link(id, label, position);
        Ok(id)
    }

    /// Creates a header with a caller-chosen identity.
    pub fn create_with_id(
        &mut self,
        id: HeaderId,
        label: Option<&str>,
        position: Option<usize>,
    ) -> Result<HeaderId> {
        let label = self.claim_label(label)?;
        self.pool.alloc_at(id, Header::new(label.clone()))?;
        self.link(id, label, position);
        Ok(id)
    }

    fn link(&mut self, id: HeaderId, label: String, position: Option<usize>) {
        let position = position.unwrap_or(self.map.len()).min(self.map.len());
        self.map.insert(position, id);
        self.labels.insert(label, id);
        self.restamp(position, self.map.len());
    }

    /// Appends `n` headers with generated labels.
    pub fn extend(&mut self, n: usize) -> Vec<HeaderId> {
        self.pool.reserve(n);
        let start = self.map.len();
        let mut created = Vec::with_capacity(n);
        for _ in 0..n {
            let label = self.next_label();
            let id = self.pool.alloc(Header::new(label.clone()));
            self.labels.insert(label, id);
            self.map.push(id);
            created.push(id);
        }
        self.restamp(start, self.map.len());
        created
    }

    /// Removes a header from the map and retires its identity.
    pub fn delete(&mut self, id: HeaderId) -> Result<Header> {
        let position = self.position(id)?;
        self.map.remove(position);
        let header = match self.pool.free(id) {
            Some(h) => h,
            None => bail!(TableError::not_found(self.kind.name(), id.to_string())),
        };
        self.labels.remove(header.label());
        self.restamp(position, self.map.len());
        Ok(header)
    }

    pub fn relabel(&mut self, id: HeaderId, label: &str) -> Result<()> {
        let old = self.label(id)?.to_string();
        if old == label {
            return Ok(());
        }
        if self.labels.contains_key(label) {
            bail!(TableError::LabelCollision {
                what: self.kind.name(),
                label: label.to_string(),
            });
        }
        self.labels.remove(&old);
        self.labels.insert(label.to_string(), id);
        self.header_mut(id)?.set_label(label.to_string());
        Ok(())
    }

    pub fn set_hidden(&mut self, id: HeaderId, hidden: bool) -> Result<()> {
        self.header_mut(id)?.set_hidden(hidden);
        Ok(())
    }

    /// Moves the run `map[first..first + count]` before (or after) `dest`.
    /// Returns the headers whose position changed.
    pub fn move_run(
        &mut self,
        first: usize,
        count: usize,
        dest: HeaderId,
        after: bool,
    ) -> Result<Vec<HeaderId>> {
        let end = first.saturating_add(count);
        if count == 0 || end > self.map.len() {
            bail!(TableError::not_found(
                self.kind.name(),
                format!("{}..{}", first, end)
            ));
        }
        let dest_pos = self.position(dest)?;
        if (first..end).contains(&dest_pos) {
            bail!(
                "can't move {} run {}..{} relative to one of its own members",
                self.kind.name(),
                first,
                end
            );
        }
        let run: Vec<HeaderId> = self.map.drain(first..end).collect();
        let dest_pos = if dest_pos >= end { dest_pos - count } else { dest_pos };
        let insert_at = if after { dest_pos + 1 } else { dest_pos };
        self.map.splice(insert_at..insert_at, run);

        let lo = first.min(insert_at);
        let hi = (first.max(insert_at) + count).min(self.map.len());
        Ok(self.restamp(lo, hi))
    }

    /// Replaces the map with a permutation of itself. Returns the headers
    /// whose position changed.
    pub fn reorder(&mut self, order: Vec<HeaderId>) -> Result<Vec<HeaderId>> {
        if order.len() != self.map.len() {
            bail!(
                "{} order has {} entries, axis has {}",
                self.kind.name(),
                order.len(),
                self.map.len()
            );
        }
        let mut seen = hashbrown::HashSet::with_capacity(order.len());
        for id in &order {
            if !self.contains(*id) || !seen.insert(*id) {
                bail!(TableError::not_found(self.kind.name(), id.to_string()));
            }
        }
        self.map = order;
        Ok(self.restamp(0, self.map.len()))
    }

    /// Re-stamps positions for `map[lo..hi]`, returning headers that moved.
    fn restamp(&mut self, lo: usize, hi: usize) -> Vec<HeaderId> {
        let mut moved = Vec::new();
        for position in lo..hi {
            let id = self.map[position];
            if let Some(h) = self.pool.get_mut(id) {
                if h.position() != position {
                    moved.push(id);
                }
                h.set_position(position);
            }
        }
        moved
    }

    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.map
            .iter()
            .enumerate()
            .all(|(i, id)| self.pool.get(*id).map(|h| h.position()) == Some(i))
            && self.pool.used() == self.map.len()
            && self.labels.len() == self.map.len()
    }
}
