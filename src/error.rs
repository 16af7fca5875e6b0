//! # Table Error Taxonomy
//!
//! Every fallible operation in the crate returns `eyre::Result`. Failures that
//! belong to the table engine itself are raised as a [`TableError`] so callers
//! can recover the kind with [`TableError::kind_of`] and build their own
//! message from the carried context.
//!
//! | Kind | Raised when |
//! |------|-------------|
//! | NotFound | row, column, tag, trace, notifier, table or format unresolved |
//! | DuplicateId | an explicit identity is already live on create |
//! | LabelCollision | create/relabel/restore with a label already in use |
//! | ReservedTag | `all` or `end` passed to a tag mutation |
//! | TypeMismatch | a value cannot be coerced to a typed column |
//! | ComparatorError | a custom sort comparator returned outside {-1, 0, 1} |
//! | FormatError | a malformed dump record |
//! | Io | the byte source or sink of dump/restore failed |
//!
//! `Io` is never constructed here: it is a `std::io::Error` wrapped by the
//! reader or writer, detected by `kind_of` when walking the report chain.

use crate::table::{AxisKind, HeaderId};
use crate::types::ColumnType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    DuplicateId,
    LabelCollision,
    ReservedTag,
    TypeMismatch,
    ComparatorError,
    FormatError,
    Io,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableError {
    /// `creatable` is set when the name was a syntactically valid index or
    /// label, so a resolve-or-create path may create it.
    NotFound {
        what: &'static str,
        name: String,
        creatable: bool,
    },
    DuplicateId {
        axis: AxisKind,
        id: HeaderId,
    },
    LabelCollision {
        what: &'static str,
        label: String,
    },
    ReservedTag(String),
    TypeMismatch {
        column: String,
        expected: ColumnType,
        value: String,
    },
    ComparatorError {
        result: i32,
    },
    FormatError {
        line: usize,
        reason: String,
    },
}

impl TableError {
    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        TableError::NotFound {
            what,
            name: name.into(),
            creatable: false,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TableError::NotFound { .. } => ErrorKind::NotFound,
            TableError::DuplicateId { .. } => ErrorKind::DuplicateId,
            TableError::LabelCollision { .. } => ErrorKind::LabelCollision,
            TableError::ReservedTag(_) => ErrorKind::ReservedTag,
            TableError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            TableError::ComparatorError { .. } => ErrorKind::ComparatorError,
            TableError::FormatError { .. } => ErrorKind::FormatError,
        }
    }

    /// Returns the kind of the first table or I/O error in the report chain.
    pub fn kind_of(report: &eyre::Report) -> Option<ErrorKind> {
        report.chain().find_map(|cause| {
            if let Some(err) = cause.downcast_ref::<TableError>() {
                Some(err.kind())
            } else if cause.downcast_ref::<std::io::Error>().is_some() {
                Some(ErrorKind::Io)
            } else {
                None
            }
        })
    }

    /// Returns true if the report is a `NotFound` that a resolve-or-create
    /// path is allowed to satisfy by creating the header.
    pub fn is_creatable(report: &eyre::Report) -> bool {
        report.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<TableError>(),
                Some(TableError::NotFound {
                    creatable: true,
                    ..
                })
            )
        })
    }
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::NotFound { what, name, .. } => {
                write!(f, "can't find {} \"{}\"", what, name)
            }
            TableError::DuplicateId { axis, id } => {
                write!(f, "{} identity {} is already in use", axis.name(), id)
            }
            TableError::LabelCollision { what, label } => {
                write!(f, "{} label \"{}\" is already in use", what, label)
            }
            TableError::ReservedTag(tag) => write!(f, "tag \"{}\" is reserved", tag),
            TableError::TypeMismatch {
                column,
                expected,
                value,
            } => write!(
                f,
                "can't set column \"{}\" of type {}: \"{}\" is not a valid {}",
                column,
                expected.name(),
                value,
                expected.name()
            ),
            TableError::ComparatorError { result } => write!(
                f,
                "sort comparator returned {}, expected -1, 0 or 1",
                result
            ),
            TableError::FormatError { line, reason } => {
                write!(f, "line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for TableError {}
