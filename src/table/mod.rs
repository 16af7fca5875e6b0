//! # Table Storage
//!
//! The storage half of the engine: everything a client handle mutates.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 TableCore                    │
//! │  ┌────────────┐  ┌────────────┐  ┌────────┐  │
//! │  │ Axis(rows) │  │ Axis(cols) │  │  grid  │  │
//! │  │ pool │ map │  │ pool │ map │  │[c][r]  │  │
//! │  │ labels     │  │ labels     │  └────────┘  │
//! │  └────────────┘  └────────────┘              │
//! │  shared tags │ timestamps │ weak clients     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - `header`: `HeaderId`, `Header`, slot/generation `HeaderPool`
//! - `axis`: ordering map, label index, position re-stamping
//! - `core`: `TableCore`, value grid, column types
//! - `iter`: `Spec` and the `HeaderIter` cursor

mod axis;
mod core;
mod header;
mod iter;

pub use axis::Axis;
pub use header::{header_flags, AxisKind, Header, HeaderId, HeaderPool};
pub use iter::{classify, tag_members, HeaderIter, Spec};
pub use self::core::TableCore;

pub(crate) use self::core::CoreState;
