//! # DataTable Configuration Module
//!
//! Compile-time configuration for the table engine. Runtime options are
//! carried by the types that use them (`ClientOptions`, `SortOptions`,
//! `DumpOptions`, `RestoreOptions`).
//!
//! ## Module Organization
//!
//! - [`constants`]: pool sizing, label prefixes, reserved tags, dump record letters

pub mod constants;
pub use constants::*;
