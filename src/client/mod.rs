//! # Client Handles
//!
//! A [`Table`] is a client: a named handle onto one shared [`TableCore`]. Any
//! number of clients may share a core; the core lives as long as its last
//! client.
//!
//! ## Ownership
//!
//! ```text
//!   Table ──Arc──► TableCore ◄──Arc── Table
//!     │               │ Weak              │
//!     └─Arc─► ClientShared ◄──────────────┘ (one per Table)
//! ```
//!
//! The core keeps only `Weak<ClientShared>` references, which it upgrades to
//! fan events out to every live client. Dropping a `Table` unregisters its
//! client and releases everything the client owns: private tags, traces,
//! notifiers, queued notifications and the key index.
//!
//! ## Per-client State
//!
//! | Field | Owner |
//! |-------|-------|
//! | row/column tags | core (shared) or client (private), per axis |
//! | traces, notifiers | client |
//! | idle queue | client, drained by `flush_pending_notifications` |
//! | callback errors | client, drained by `take_callback_errors` |
//! | key index | client |
//! | empty value | client |
//!
//! ## Module Structure
//!
//! - `structure`: create, delete, move, relabel, resolve
//! - `values`: cell access and bulk helpers
//! - `tags`: tag index
//! - `trace`: value-level callbacks
//! - `notify`: structural callbacks
//! - `keys`: primary-key lookup

mod keys;
mod notify;
mod structure;
mod tags;
mod trace;
mod values;

pub use notify::{
    NotifierId, NotifyCallback, NotifyEvent, NotifyKind, NotifyMask, NotifyScope,
};
pub use tags::TagTable;
pub use trace::{Selector, TraceCallback, TraceEvent, TraceId, TraceMask, TraceScope};

pub(crate) use notify::Change;

use crate::config::DEFAULT_EMPTY_VALUE;
use crate::table::{AxisKind, CoreState, HeaderId, TableCore};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    fn next() -> Self {
        Self(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client{}", self.0)
    }
}

/// Whether a client reads and writes the core's tag table for an axis or
/// keeps its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagSharing {
    #[default]
    Shared,
    Private,
}

#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    name: Option<String>,
    row_tags: TagSharing,
    column_tags: TagSharing,
    empty_value: Option<String>,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_row_tags(mut self, sharing: TagSharing) -> Self {
        self.row_tags = sharing;
        self
    }

    pub fn with_column_tags(mut self, sharing: TagSharing) -> Self {
        self.column_tags = sharing;
        self
    }

    /// Private tag tables on both axes.
    pub fn with_private_tags(self) -> Self {
        self.with_row_tags(TagSharing::Private)
            .with_column_tags(TagSharing::Private)
    }

    pub fn with_empty_value(mut self, empty: impl Into<String>) -> Self {
        self.empty_value = Some(empty.into());
        self
    }
}

pub(crate) struct ClientShared {
    pub(crate) id: ClientId,
    pub(crate) name: String,
    pub(crate) state: Mutex<ClientState>,
}

impl ClientShared {
    /// Records a callback failure for the client that owns the callback.
    pub(crate) fn report(&self, err: eyre::Report) {
        self.state.lock().errors.push(err);
    }
}

pub(crate) struct ClientState {
    row_sharing: TagSharing,
    column_sharing: TagSharing,
    row_tags: TagTable,
    column_tags: TagTable,
    pub(crate) traces: Vec<trace::Trace>,
    pub(crate) notifiers: Vec<notify::Notifier>,
    pub(crate) pending: Vec<notify::QueuedNotify>,
    errors: Vec<eyre::Report>,
    empty_value: String,
    pub(crate) keys: keys::KeyIndex,
    pub(crate) next_trace: u64,
    pub(crate) next_notifier: u64,
}

impl ClientState {
    fn new(options: &ClientOptions) -> Self {
        Self {
            row_sharing: options.row_tags,
            column_sharing: options.column_tags,
            row_tags: TagTable::new(AxisKind::Row),
            column_tags: TagTable::new(AxisKind::Column),
            traces: Vec::new(),
            notifiers: Vec::new(),
            pending: Vec::new(),
            errors: Vec::new(),
            empty_value: options
                .empty_value
                .clone()
                .unwrap_or_else(|| DEFAULT_EMPTY_VALUE.to_string()),
            keys: keys::KeyIndex::default(),
            next_trace: 0,
            next_notifier: 0,
        }
    }

    fn sharing(&self, axis: AxisKind) -> TagSharing {
        match axis {
            AxisKind::Row => self.row_sharing,
            AxisKind::Column => self.column_sharing,
        }
    }

    /// The tag table this client sees for `axis`.
    pub(crate) fn tags<'a>(&'a self, core: &'a CoreState, axis: AxisKind) -> &'a TagTable {
        match (self.sharing(axis), axis) {
            (TagSharing::Shared, _) => core.shared_tags(axis),
            (TagSharing::Private, AxisKind::Row) => &self.row_tags,
            (TagSharing::Private, AxisKind::Column) => &self.column_tags,
        }
    }

    pub(crate) fn tags_mut<'a>(
        &'a mut self,
        core: &'a mut CoreState,
        axis: AxisKind,
    ) -> &'a mut TagTable {
        match (self.sharing(axis), axis) {
            (TagSharing::Shared, _) => core.shared_tags_mut(axis),
            (TagSharing::Private, AxisKind::Row) => &mut self.row_tags,
            (TagSharing::Private, AxisKind::Column) => &mut self.column_tags,
        }
    }

    fn reset(&mut self) {
        self.row_tags.clear();
        self.column_tags.clear();
        self.traces.clear();
        self.notifiers.clear();
        self.pending.clear();
        self.keys = keys::KeyIndex::default();
    }
}

/// Drops every registration that names a deleted header: tag memberships in
/// shared and private tables, identity-scoped traces, node-scoped notifiers
/// and key columns.
pub(crate) fn purge_header(core: &mut CoreState, axis: AxisKind, id: HeaderId) {
    core.shared_tags_mut(axis).forget_header(id);
    for client in core.live_clients() {
        let mut state = client.state.lock();
        match axis {
            AxisKind::Row => state.row_tags.forget_header(id),
            AxisKind::Column => {
                state.column_tags.forget_header(id);
                state.keys.forget_column(id);
            }
        }
        state.traces.retain(|t| !t.references(axis, id));
        state.notifiers.retain(|n| !n.is_scoped_to(axis, id));
    }
}

/// A client handle onto a shared table core.
pub struct Table {
    pub(crate) core: Arc<TableCore>,
    pub(crate) client: Arc<ClientShared>,
}

impl Table {
    /// Creates a new empty table with one client.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, ClientOptions::default())
    }

    pub fn with_options(name: impl Into<String>, options: ClientOptions) -> Self {
        Self::join(TableCore::new(name), options)
    }

    pub(crate) fn join(core: Arc<TableCore>, options: ClientOptions) -> Self {
        let id = ClientId::next();
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| format!("{}#{}", core.name(), id.0));
        let client = Arc::new(ClientShared {
            id,
            name,
            state: Mutex::new(ClientState::new(&options)),
        });
        core.lock().register_client(&client);
        log::debug!("{} \"{}\" attached to \"{}\"", id, client.name, core.name());
        Self { core, client }
    }

    /// Opens a sibling client on the same core.
    pub fn share(&self, options: ClientOptions) -> Table {
        Self::join(Arc::clone(&self.core), options)
    }

    /// Repoints this client at `other`'s core. Traces, notifiers, queued
    /// notifications, private tags and keys are dropped first; tag sharing
    /// and the empty value carry over.
    pub fn attach(&mut self, other: &Table) {
        if Arc::ptr_eq(&self.core, &other.core) {
            return;
        }
        self.core.lock().unregister_client(&self.client);
        self.client.state.lock().reset();
        self.core = Arc::clone(&other.core);
        self.core.lock().register_client(&self.client);
        log::debug!(
            "{} \"{}\" re-attached to \"{}\"",
            self.client.id,
            self.client.name,
            self.core.name()
        );
    }

    pub fn id(&self) -> ClientId {
        self.client.id
    }

    pub fn name(&self) -> &str {
        &self.client.name
    }

    pub fn table_name(&self) -> &str {
        self.core.name()
    }

    pub fn client_count(&self) -> usize {
        self.core.lock().live_clients().len()
    }

    pub fn shares_core_with(&self, other: &Table) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    pub(crate) fn core(&self) -> &Arc<TableCore> {
        &self.core
    }

    pub fn created_at(&self) -> u64 {
        self.core.lock().created()
    }

    pub fn modified_at(&self) -> u64 {
        self.core.lock().modified()
    }

    /// Monotonic counter bumped by every mutation.
    pub fn modification_count(&self) -> u64 {
        self.core.lock().mod_count()
    }

    pub fn empty_value(&self) -> String {
        self.client.state.lock().empty_value.clone()
    }

    pub fn set_empty_value(&self, empty: impl Into<String>) {
        self.client.state.lock().empty_value = empty.into();
    }

    /// Drains the failures reported by this client's trace and notify
    /// callbacks, oldest first.
    pub fn take_callback_errors(&self) -> Vec<eyre::Report> {
        std::mem::take(&mut self.client.state.lock().errors)
    }

    /// Runs a structural mutation under the core lock, purges registrations
    /// of deleted headers, then delivers notifications with no lock held.
    pub(crate) fn mutate<T>(&self, f: impl FnOnce(&mut CoreState, &mut Vec<Change>) -> T) -> T {
        let (result, pending) = {
            let mut core = self.core.lock();
            let mut changes = Vec::new();
            let result = f(&mut *core, &mut changes);
            if !changes.is_empty() {
                core.touch();
            }
            let pending = notify::collect(&core, &changes, self.client.id);
            for change in changes.iter().filter(|c| c.kind == NotifyKind::Deleted) {
                purge_header(&mut core, change.axis, change.id);
            }
            (result, pending)
        };
        notify::dispatch(pending);
        result
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        self.core.lock().unregister_client(&self.client);
        log::debug!(
            "{} \"{}\" detached from \"{}\"",
            self.client.id,
            self.client.name,
            self.core.name()
        );
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("client", &self.client.id)
            .field("name", &self.client.name)
            .field("table", &self.core.name())
            .finish()
    }
}
