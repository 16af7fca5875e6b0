//! # Notify Engine
//!
//! Notifiers are structural callbacks: they fire after a row or column is
//! created, deleted or moved, once the map has been spliced and positions
//! re-stamped.
//!
//! ## Mask Layout
//!
//! ```text
//!  bit   9            8          6..4                2..0
//!  ┌──────────────┬──────────┬───────────────────┬───────────────────┐
//!  │ FOREIGN_ONLY │ WHEN_IDLE │ COL moved/del/cre │ ROW moved/del/cre │
//!  └──────────────┴──────────┴───────────────────┴───────────────────┘
//! ```
//!
//! `WHEN_IDLE` queues the event on the owning client instead of delivering it
//! immediately; the queue is drained by
//! [`Table::flush_pending_notifications`] and identical queued events are
//! coalesced. `FOREIGN_ONLY` suppresses events caused by the client that
//! registered the notifier.
//!
//! ## Retirement
//!
//! A notifier scoped to one row or column receives the `Deleted` event for
//! that header and is then removed. Tag-scoped and unscoped notifiers survive.

use super::{ClientId, ClientShared, Table, TagTable};
use crate::config::{TAG_ALL, TAG_END};
use crate::error::TableError;
use crate::table::{AxisKind, CoreState, HeaderId};
use eyre::{bail, Result};
use std::sync::Arc;

bit_mask! {
    /// Structural events a notifier listens for, plus delivery modifiers.
    pub struct NotifyMask(u16) {
        ROW_CREATED = 0x001,
        ROW_DELETED = 0x002,
        ROW_MOVED = 0x004,
        COLUMN_CREATED = 0x010,
        COLUMN_DELETED = 0x020,
        COLUMN_MOVED = 0x040,
        WHEN_IDLE = 0x100,
        FOREIGN_ONLY = 0x200,
    }
}

impl NotifyMask {
    pub const ROWS: Self = Self(0x007);
    pub const COLUMNS: Self = Self(0x070);
    pub const ALL_EVENTS: Self = Self(0x077);

    pub fn for_event(axis: AxisKind, kind: NotifyKind) -> Self {
        match (axis, kind) {
            (AxisKind::Row, NotifyKind::Created) => Self::ROW_CREATED,
            (AxisKind::Row, NotifyKind::Deleted) => Self::ROW_DELETED,
            (AxisKind::Row, NotifyKind::Moved) => Self::ROW_MOVED,
            (AxisKind::Column, NotifyKind::Created) => Self::COLUMN_CREATED,
            (AxisKind::Column, NotifyKind::Deleted) => Self::COLUMN_DELETED,
            (AxisKind::Column, NotifyKind::Moved) => Self::COLUMN_MOVED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyKind {
    Created,
    Deleted,
    Moved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyScope {
    /// Every event allowed by the mask, on either axis.
    All,
    Row(HeaderId),
    Column(HeaderId),
    RowTag(String),
    ColumnTag(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotifierId(u64);

impl std::fmt::Display for NotifierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "notify{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyEvent {
    pub notifier: NotifierId,
    pub axis: AxisKind,
    pub kind: NotifyKind,
    pub id: HeaderId,
    /// Client whose operation caused the change.
    pub origin: ClientId,
}

pub trait NotifyCallback: Send + Sync {
    fn on_notify(&self, event: &NotifyEvent) -> Result<()>;
}

impl<F> NotifyCallback for F
where
    F: Fn(&NotifyEvent) -> Result<()> + Send + Sync,
{
    fn on_notify(&self, event: &NotifyEvent) -> Result<()> {
        self(event)
    }
}

pub(crate) struct Notifier {
    id: NotifierId,
    scope: NotifyScope,
    mask: NotifyMask,
    callback: Arc<dyn NotifyCallback>,
}

impl Notifier {
    fn matches(&self, change: &Change, tags: &TagTable) -> bool {
        if !self.mask.contains(NotifyMask::for_event(change.axis, change.kind)) {
            return false;
        }
        match (&self.scope, change.axis) {
            (NotifyScope::All, _) => true,
            (NotifyScope::Row(id), AxisKind::Row) | (NotifyScope::Column(id), AxisKind::Column) => {
                *id == change.id
            }
            (NotifyScope::RowTag(tag), AxisKind::Row)
            | (NotifyScope::ColumnTag(tag), AxisKind::Column) => {
                tag == TAG_ALL || tags.has(change.id, tag)
            }
            _ => false,
        }
    }

    /// True for a notifier bound to exactly this header.
    pub(crate) fn is_scoped_to(&self, axis: AxisKind, id: HeaderId) -> bool {
        match (&self.scope, axis) {
            (NotifyScope::Row(target), AxisKind::Row)
            | (NotifyScope::Column(target), AxisKind::Column) => *target == id,
            _ => false,
        }
    }
}

/// One structural change, recorded while the core is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Change {
    pub(crate) axis: AxisKind,
    pub(crate) kind: NotifyKind,
    pub(crate) id: HeaderId,
}

impl Change {
    pub(crate) fn created(axis: AxisKind, id: HeaderId) -> Self {
        Self {
            axis,
            kind: NotifyKind::Created,
            id,
        }
    }

    pub(crate) fn deleted(axis: AxisKind, id: HeaderId) -> Self {
        Self {
            axis,
            kind: NotifyKind::Deleted,
            id,
        }
    }

    pub(crate) fn moved(axis: AxisKind, id: HeaderId) -> Self {
        Self {
            axis,
            kind: NotifyKind::Moved,
            id,
        }
    }
}

pub(crate) struct QueuedNotify {
    callback: Arc<dyn NotifyCallback>,
    event: NotifyEvent,
}

pub(crate) struct PendingNotify {
    owner: Arc<ClientShared>,
    queued: QueuedNotify,
}

/// Matches `changes` against every live client's notifiers. Immediate
/// deliveries are returned; `WHEN_IDLE` deliveries are queued on their owner.
pub(crate) fn collect(
    core: &CoreState,
    changes: &[Change],
    origin: ClientId,
) -> Vec<PendingNotify> {
    let mut immediate = Vec::new();
    if changes.is_empty() {
        return immediate;
    }
    for client in core.live_clients() {
        let mut state = client.state.lock();
        if state.notifiers.is_empty() {
            continue;
        }
        let mut idle = Vec::new();
        for change in changes {
            let tags = state.tags(core, change.axis);
            for notifier in &state.notifiers {
                if notifier.mask.contains(NotifyMask::FOREIGN_ONLY) && client.id == origin {
                    continue;
                }
                if !notifier.matches(change, tags) {
                    continue;
                }
                let queued = QueuedNotify {
                    callback: Arc::clone(&notifier.callback),
                    event: NotifyEvent {
                        notifier: notifier.id,
                        axis: change.axis,
                        kind: change.kind,
                        id: change.id,
                        origin,
                    },
                };
                if notifier.mask.contains(NotifyMask::WHEN_IDLE) {
                    idle.push(queued);
                } else {
                    immediate.push(PendingNotify {
                        owner: Arc::clone(&client),
                        queued,
                    });
                }
            }
        }
        for queued in idle {
            if !state.pending.iter().any(|q| q.event == queued.event) {
                state.pending.push(queued);
            }
        }
    }
    immediate
}

fn deliver(owner: &ClientShared, queued: &QueuedNotify) {
    let event = &queued.event;
    log::trace!(
        "{} fired {:?} for {} {}",
        event.notifier,
        event.kind,
        event.axis.name(),
        event.id
    );
    if let Err(err) = queued.callback.on_notify(event) {
        log::warn!("{} callback failed: {:#}", event.notifier, err);
        owner.report(err.wrap_err(format!("{} callback failed", event.notifier)));
    }
}

pub(crate) fn dispatch(pending: Vec<PendingNotify>) {
    for p in pending {
        deliver(&p.owner, &p.queued);
    }
}

impl Table {
    /// Registers a structural notifier. Row and column scopes must name live
    /// headers; the tag `end` is rejected since it does not denote a stable
    /// set.
    pub fn create_notifier(
        &self,
        scope: NotifyScope,
        mask: NotifyMask,
        callback: impl NotifyCallback + 'static,
    ) -> Result<NotifierId> {
        let core = self.core.lock();
        match &scope {
            NotifyScope::Row(id) => {
                core.axis(AxisKind::Row).header(*id)?;
            }
            NotifyScope::Column(id) => {
                core.axis(AxisKind::Column).header(*id)?;
            }
            NotifyScope::RowTag(tag) | NotifyScope::ColumnTag(tag) if tag == TAG_END => {
                bail!(TableError::ReservedTag(tag.clone()))
            }
            _ => {}
        }
        let mut state = self.client.state.lock();
        state.next_notifier += 1;
        let id = NotifierId(state.next_notifier);
        state.notifiers.push(Notifier {
            id,
            scope,
            mask,
            callback: Arc::new(callback),
        });
        log::trace!("{} created {}", self.name(), id);
        Ok(id)
    }

    /// Removes a notifier and any of its queued events. Unknown ids are a
    /// no-op returning `false`.
    pub fn delete_notifier(&self, id: NotifierId) -> bool {
        let mut state = self.client.state.lock();
        let before = state.notifiers.len();
        state.notifiers.retain(|n| n.id != id);
        state.pending.retain(|q| q.event.notifier != id);
        state.notifiers.len() != before
    }

    pub fn notifier_ids(&self) -> Vec<NotifierId> {
        self.client
            .state
            .lock()
            .notifiers
            .iter()
            .map(|n| n.id)
            .collect()
    }

    pub fn pending_notifications(&self) -> usize {
        self.client.state.lock().pending.len()
    }

    /// Delivers this client's queued `WHEN_IDLE` events in the order they
    /// were raised. Returns how many were delivered.
    pub fn flush_pending_notifications(&self) -> usize {
        let queued = std::mem::take(&mut self.client.state.lock().pending);
        for q in &queued {
            deliver(&self.client, q);
        }
        queued.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier(scope: NotifyScope, mask: NotifyMask) -> Notifier {
        Notifier {
            id: NotifierId(1),
            scope,
            mask,
            callback: Arc::new(|_: &NotifyEvent| -> Result<()> { Ok(()) }),
        }
    }

    #[test]
    fn event_bits_are_per_axis() {
        let n = notifier(NotifyScope::All, NotifyMask::ROW_CREATED);
        let tags = TagTable::new(AxisKind::Row);
        let id = HeaderId::new(0, 0);
        assert!(n.matches(&Change::created(AxisKind::Row, id), &tags));
        assert!(!n.matches(&Change::created(AxisKind::Column, id), &tags));
        assert!(!n.matches(&Change::deleted(AxisKind::Row, id), &tags));
    }

    #[test]
    fn node_scope_matches_only_its_header() {
        let a = HeaderId::new(0, 0);
        let b = HeaderId::new(1, 0);
        let n = notifier(NotifyScope::Row(a), NotifyMask::ROWS);
        let tags = TagTable::new(AxisKind::Row);
        assert!(n.matches(&Change::moved(AxisKind::Row, a), &tags));
        assert!(!n.matches(&Change::moved(AxisKind::Row, b), &tags));
        assert!(n.is_scoped_to(AxisKind::Row, a));
        assert!(!n.is_scoped_to(AxisKind::Column, a));
    }

    #[test]
    fn tag_scope_follows_membership() {
        let a = HeaderId::new(0, 0);
        let mut tags = TagTable::new(AxisKind::Column);
        let n = notifier(NotifyScope::ColumnTag("key".into()), NotifyMask::COLUMNS);
        assert!(!n.matches(&Change::deleted(AxisKind::Column, a), &tags));
        tags.add(a, "key").unwrap();
        assert!(n.matches(&Change::deleted(AxisKind::Column, a), &tags));
        assert!(!n.is_scoped_to(AxisKind::Column, a));
    }
}
