//! # Cell Types
//!
//! - `column_type`: [`ColumnType`], the per-column coercion rule
//! - `value`: [`Value`], a cell with a numeric slot and a cached string
//!
//! ## Usage
//!
//! ```ignore
//! use datatable::types::{ColumnType, Value};
//!
//! let v = Value::text("42").coerce(ColumnType::Int).unwrap();
//! assert_eq!(v.as_i64(), Some(42));
//! ```

mod column_type;
mod value;

pub use column_type::ColumnType;
pub use value::{Number, Value};
