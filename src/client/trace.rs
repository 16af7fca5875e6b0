//! # Trace Engine
//!
//! A trace is a value-level callback: it fires when a matching cell is read,
//! written, created (written while empty) or unset.
//!
//! ## Scope
//!
//! Every trace has exactly one row selector and one column selector, each of
//! which is `Any`, a header identity or a tag name. There is deliberately no
//! range selector: to trace a set of rows, tag them and trace the tag. Tag
//! selectors are evaluated against the owning client's tag tables at event
//! time, so retagging changes which cells a trace covers.
//!
//! ## Ordering
//!
//! ```text
//! set(r, c, v)
//!   ├─ coerce v (TypeMismatch stops here, no trace fires)
//!   ├─ collect traces: identity-scoped first, then tag-scoped,
//!   │                  each group in client attach + registration order
//!   ├─ run callbacks   (no lock held; callbacks may re-enter the table)
//!   └─ store v
//! get(r, c)
//!   ├─ read value
//!   └─ run READ callbacks
//! ```
//!
//! A failing callback is logged, reported to the client that owns the trace,
//! and never aborts the triggering operation.

use super::{ClientShared, Table};
use crate::error::TableError;
use crate::table::{AxisKind, CoreState, HeaderId};
use crate::types::Value;
use eyre::{bail, Result};
use smallvec::SmallVec;
use std::sync::Arc;

bit_mask! {
    /// Cell events a trace listens for.
    pub struct TraceMask(u8) {
        READ = 0x01,
        WRITE = 0x02,
        CREATE = 0x04,
        UNSET = 0x08,
    }
}

impl TraceMask {
    pub const ALL: Self = Self(0x0f);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceId(u64);

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "trace{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Any,
    Id(HeaderId),
    Tag(String),
}

impl Selector {
    fn matches(&self, id: HeaderId, tags: &super::TagTable) -> bool {
        match self {
            Selector::Any => true,
            Selector::Id(target) => *target == id,
            Selector::Tag(tag) => tags.has(id, tag),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceScope {
    pub row: Selector,
    pub column: Selector,
}

impl TraceScope {
    pub fn new(row: Selector, column: Selector) -> Self {
        Self { row, column }
    }

    pub fn cell(row: HeaderId, column: HeaderId) -> Self {
        Self::new(Selector::Id(row), Selector::Id(column))
    }

    pub fn row(row: HeaderId) -> Self {
        Self::new(Selector::Id(row), Selector::Any)
    }

    pub fn column(column: HeaderId) -> Self {
        Self::new(Selector::Any, Selector::Id(column))
    }

    pub fn row_tag(tag: impl Into<String>) -> Self {
        Self::new(Selector::Tag(tag.into()), Selector::Any)
    }

    pub fn column_tag(tag: impl Into<String>) -> Self {
        Self::new(Selector::Any, Selector::Tag(tag.into()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    pub trace: TraceId,
    pub row: HeaderId,
    pub column: HeaderId,
    /// The subset of the trace's mask that this event triggered.
    pub mask: TraceMask,
    /// New value for writes, current value for reads and unsets.
    pub value: Value,
}

pub trait TraceCallback: Send + Sync {
    fn on_trace(&self, event: &TraceEvent) -> Result<()>;
}

impl<F> TraceCallback for F
where
    F: Fn(&TraceEvent) -> Result<()> + Send + Sync,
{
    fn on_trace(&self, event: &TraceEvent) -> Result<()> {
        self(event)
    }
}

pub(crate) struct Trace {
    id: TraceId,
    scope: TraceScope,
    mask: TraceMask,
    callback: Arc<dyn TraceCallback>,
}

impl Trace {
    fn is_tag_scoped(&self) -> bool {
        matches!(self.scope.row, Selector::Tag(_)) || matches!(self.scope.column, Selector::Tag(_))
    }

    /// True if either selector names `id` on `axis`.
    pub(crate) fn references(&self, axis: AxisKind, id: HeaderId) -> bool {
        let selector = match axis {
            AxisKind::Row => &self.scope.row,
            AxisKind::Column => &self.scope.column,
        };
        *selector == Selector::Id(id)
    }
}

pub(crate) struct PendingTrace {
    owner: Arc<ClientShared>,
    callback: Arc<dyn TraceCallback>,
    event: TraceEvent,
    tagged: bool,
}

pub(crate) type PendingTraces = SmallVec<[PendingTrace; 4]>;

pub(crate) fn collect(
    core: &CoreState,
    row: HeaderId,
    column: HeaderId,
    fired: TraceMask,
    value: &Value,
) -> PendingTraces {
    let mut pending = PendingTraces::new();
    for client in core.live_clients() {
        let state = client.state.lock();
        let row_tags = state.tags(core, AxisKind::Row);
        let column_tags = state.tags(core, AxisKind::Column);
        for trace in &state.traces {
            let mask = trace.mask.intersection(fired);
            if mask.is_empty()
                || !trace.scope.row.matches(row, row_tags)
                || !trace.scope.column.matches(column, column_tags)
            {
                continue;
            }
            pending.push(PendingTrace {
                owner: Arc::clone(&client),
                callback: Arc::clone(&trace.callback),
                event: TraceEvent {
                    trace: trace.id,
                    row,
                    column,
                    mask,
                    value: value.clone(),
                },
                tagged: trace.is_tag_scoped(),
            });
        }
    }
    pending.sort_by_key(|p| p.tagged);
    pending
}

pub(crate) fn dispatch(pending: PendingTraces) {
    for p in pending {
        log::trace!(
            "{} fired {:#04x} on cell ({}, {})",
            p.event.trace,
            p.event.mask.bits(),
            p.event.row,
            p.event.column
        );
        if let Err(err) = p.callback.on_trace(&p.event) {
            log::warn!("{} callback failed: {:#}", p.event.trace, err);
            p.owner
                .report(err.wrap_err(format!("{} callback failed", p.event.trace)));
        }
    }
}

impl Table {
    /// Registers a value trace. Identity selectors must name live headers;
    /// the tag `all` is the same as `Any`. Any other tag selector must be a
    /// valid tag name, or this fails with `ReservedTag`.
    pub fn create_trace(
        &self,
        scope: TraceScope,
        mask: TraceMask,
        callback: impl TraceCallback + 'static,
    ) -> Result<TraceId> {
        let core = self.core.lock();
        let mut normalized = scope;
        for (axis, selector) in [
            (AxisKind::Row, &mut normalized.row),
            (AxisKind::Column, &mut normalized.column),
        ] {
            match selector {
                Selector::Id(id) => {
                    core.axis(axis).header(*id)?;
                }
                Selector::Tag(tag) if tag == crate::config::TAG_ALL => *selector = Selector::Any,
                Selector::Tag(tag) => super::tags::check_name(tag)?,
                Selector::Any => {}
            }
        }
        let mut state = self.client.state.lock();
        state.next_trace += 1;
        let id = TraceId(state.next_trace);
        state.traces.push(Trace {
            id,
            scope: normalized,
            mask,
            callback: Arc::new(callback),
        });
        log::trace!("{} created {}", self.name(), id);
        Ok(id)
    }

    /// Removes a trace. Unknown ids are a no-op returning `false`; a delivery
    /// already in progress is not interrupted.
    pub fn delete_trace(&self, id: TraceId) -> bool {
        let mut state = self.client.state.lock();
        let before = state.traces.len();
        state.traces.retain(|t| t.id != id);
        state.traces.len() != before
    }

    pub fn trace_ids(&self) -> Vec<TraceId> {
        self.client.state.lock().traces.iter().map(|t| t.id).collect()
    }

    /// Scope and mask of one of this client's traces.
    pub fn trace_info(&self, id: TraceId) -> Result<(TraceScope, TraceMask)> {
        let state = self.client.state.lock();
        match state.traces.iter().find(|t| t.id == id) {
            Some(t) => Ok((t.scope.clone(), t.mask)),
            None => bail!(TableError::not_found("trace", id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_ops() {
        let m = TraceMask::WRITE | TraceMask::UNSET;
        assert!(m.contains(TraceMask::WRITE));
        assert!(!m.contains(TraceMask::READ));
        assert_eq!(
            m.intersection(TraceMask::WRITE | TraceMask::CREATE),
            TraceMask::WRITE
        );
        assert!(TraceMask::ALL.contains(m));
    }

    #[test]
    fn references_only_identity_selectors() {
        let r = HeaderId::new(1, 0);
        let trace = Trace {
            id: TraceId(1),
            scope: TraceScope::new(Selector::Id(r), Selector::Tag("x".into())),
            mask: TraceMask::WRITE,
            callback: Arc::new(|_: &TraceEvent| -> Result<()> { Ok(()) }),
        };
        assert!(trace.references(AxisKind::Row, r));
        assert!(!trace.references(AxisKind::Column, r));
        assert!(trace.is_tag_scoped());
    }

    #[test]
    fn unusable_tag_selectors_are_rejected() {
        use crate::error::{ErrorKind, TableError};

        let t = Table::new("t");
        for tag in ["", "end", "42"] {
            let err = t
                .create_trace(TraceScope::row_tag(tag), TraceMask::ALL, |_: &TraceEvent| -> Result<()> {
                    Ok(())
                })
                .unwrap_err();
            assert_eq!(TableError::kind_of(&err), Some(ErrorKind::ReservedTag), "{:?}", tag);
        }
        assert!(t.trace_ids().is_empty());

        let id = t
            .create_trace(TraceScope::column_tag("all"), TraceMask::ALL, |_: &TraceEvent| -> Result<()> {
                Ok(())
            })
            .unwrap();
        assert_eq!(t.trace_info(id).unwrap().0.column, Selector::Any);
    }
}
