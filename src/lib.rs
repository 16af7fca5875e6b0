//! # DataTable - Shared In-Memory Tables
//!
//! DataTable is an in-memory, two-dimensional store of string values with
//! optional typed columns. Several independent clients can share one table:
//! each sees the same rows, columns and cells, and each keeps its own
//! tags, value traces and structural notifiers.
//!
//! - **Stable identities**: a row or column keeps its [`HeaderId`] across
//!   moves, sorts and relabels; a deleted identity never comes back to life
//! - **Label, index or tag addressing**: every operation that takes a
//!   [`Spec`] resolves it against the axis in one place
//! - **Re-entrant callbacks**: traces and notifiers run with no lock held and
//!   may freely read or modify the table
//!
//! ## Quick Start
//!
//! ```ignore
//! use datatable::{ColumnType, SortKey, SortOptions, Table};
//!
//! let t = Table::new("people");
//! let name = t.create_column(Some("name"), ColumnType::String)?;
//! let age = t.create_column(Some("age"), ColumnType::Int)?;
//! let r = t.create_row(None)?;
//! t.set(r, name, "Ada")?;
//! t.set(r, age, "36")?;
//!
//! t.sort_rows(&[SortKey::numeric(age).descending()], SortOptions::new().with_apply(true))?;
//! print!("{}", t.dump(&Default::default())?);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  ┌────────────┐  ┌────────────┐
//! │  Table #1  │  │  Table #2  │  │  Table #3  │   clients: tags, traces,
//! └─────┬──────┘  └─────┬──────┘  └─────┬──────┘   notifiers, keys
//!       └───────────────┼───────────────┘
//!                 ┌─────┴──────┐
//!                 │ TableCore  │   one lock: axes, grid, shared tags
//!                 ├────────────┤
//!                 │ row Axis   │   header pool + position map + label index
//!                 │ column Axis│
//!                 │ value grid │   one vector per column, indexed by row slot
//!                 └────────────┘
//! ```
//!
//! A core lives as long as one client refers to it. The core refers back to
//! its clients weakly, only to fan out traces and notifications.
//!
//! ## Module Overview
//!
//! - [`table`]: header pools, axes, the shared core and the header iterator
//! - [`client`]: the [`Table`] handle with tags, traces, notifiers and keys
//! - [`sort`]: multi-key stable row sorting
//! - [`dump`]: the line-oriented text format and restore
//! - [`registry`]: named tables and pluggable import/export formats
//! - [`types`]: [`Value`] and [`ColumnType`]
//! - [`error`]: [`TableError`] and [`ErrorKind`]
//! - [`config`]: capacities, label prefixes, reserved tags, record letters

#[macro_use]
mod macros;

pub mod client;
pub mod config;
pub mod dump;
pub mod error;
pub mod registry;
pub mod sort;
pub mod table;
pub mod types;

pub use client::{
    ClientId, ClientOptions, NotifierId, NotifyCallback, NotifyEvent, NotifyKind, NotifyMask,
    NotifyScope, Selector, Table, TagSharing, TraceCallback, TraceEvent, TraceId, TraceMask,
    TraceScope,
};
pub use dump::{DumpOptions, RestoreOptions, RestoreStats};
pub use error::{ErrorKind, TableError};
pub use registry::{DumpFormat, FormatAdapter, Registry};
pub use sort::{Comparator, SortKey, SortOptions, SortType};
pub use table::{AxisKind, HeaderId, Spec};
pub use types::{ColumnType, Value};
