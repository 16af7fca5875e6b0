//! # Sort Engine
//!
//! Orders the rows of a table by one or more column keys.
//!
//! ## Comparison
//!
//! Keys are compared left to right and the first non-equal result wins. Rows
//! equal under every key keep their current relative order: the sort is a
//! stable `sort_by` over a snapshot taken in position order.
//!
//! | Type | Compares |
//! |------|----------|
//! | `Ascii` | raw bytes of the text |
//! | `Dictionary` | case-insensitively, digit runs as integers, case breaks ties |
//! | `Numeric` | the numeric view; non-numeric text sorts after numbers |
//! | `Custom` | an injected [`Comparator`] returning -1, 0 or 1 |
//! | `Auto` | `Numeric` for numeric columns, `Ascii` otherwise |
//!
//! Empty cells sort before every non-empty cell, for every type. Descending
//! keys reverse the whole comparison, so empties come last.
//!
//! ## Snapshot and Apply
//!
//! Key values are copied out under the core lock and the lock is released
//! before comparing, so custom comparators may call back into the table. A
//! sort is either returned as a row order or applied as the new row map. An
//! applied sort validates that the row set is unchanged and raises a `Moved`
//! notification for each row whose position changed.

use crate::client::{Change, Table};
use crate::error::TableError;
use crate::table::{AxisKind, HeaderId};
use crate::types::Value;
use eyre::{bail, Result};
use std::cmp::Ordering;
use std::sync::Arc;

pub trait Comparator: Send + Sync {
    fn compare(&self, a: &Value, b: &Value) -> Result<i32>;
}

impl<F> Comparator for F
where
    F: Fn(&Value, &Value) -> Result<i32> + Send + Sync,
{
    fn compare(&self, a: &Value, b: &Value) -> Result<i32> {
        self(a, b)
    }
}

#[derive(Clone, Default)]
pub enum SortType {
    #[default]
    Auto,
    Ascii,
    Dictionary,
    Numeric,
    Custom(Arc<dyn Comparator>),
}

impl std::fmt::Debug for SortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortType::Auto => f.write_str("Auto"),
            SortType::Ascii => f.write_str("Ascii"),
            SortType::Dictionary => f.write_str("Dictionary"),
            SortType::Numeric => f.write_str("Numeric"),
            SortType::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub column: HeaderId,
    pub kind: SortType,
    pub descending: bool,
}

impl SortKey {
    pub fn new(column: HeaderId, kind: SortType) -> Self {
        Self {
            column,
            kind,
            descending: false,
        }
    }

    pub fn ascii(column: HeaderId) -> Self {
        Self::new(column, SortType::Ascii)
    }

    pub fn dictionary(column: HeaderId) -> Self {
        Self::new(column, SortType::Dictionary)
    }

    pub fn numeric(column: HeaderId) -> Self {
        Self::new(column, SortType::Numeric)
    }

    pub fn custom(column: HeaderId, comparator: impl Comparator + 'static) -> Self {
        Self::new(column, SortType::Custom(Arc::new(comparator)))
    }

    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SortOptions {
    apply: bool,
    unique: bool,
}

impl SortOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the result the table's new row order.
    pub fn with_apply(mut self, apply: bool) -> Self {
        self.apply = apply;
        self
    }

    /// Drop rows equal to their predecessor under every key. Only valid for
    /// returned orders.
    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn apply(&self) -> bool {
        self.apply
    }

    pub fn unique(&self) -> bool {
        self.unique
    }
}

/// Dictionary order: letters compare case-insensitively, runs of digits
/// compare as integers, and the first case difference breaks a tie with
/// uppercase first.
pub fn dictionary_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    let mut tie = Ordering::Equal;
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return tie,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let da = take_digits(&mut left);
                let db = take_digits(&mut right);
                let (ta, tb) = (da.trim_start_matches('0'), db.trim_start_matches('0'));
                let ord = ta.len().cmp(&tb.len()).then_with(|| ta.cmp(tb));
                if ord != Ordering::Equal {
                    return ord;
                }
                if tie == Ordering::Equal {
                    tie = db.len().cmp(&da.len());
                }
            }
            (Some(x), Some(y)) => {
                left.next();
                right.next();
                let (lx, ly) = (fold(x), fold(y));
                if lx != ly {
                    return lx.cmp(&ly);
                }
                if tie == Ordering::Equal {
                    tie = x.cmp(&y);
                }
            }
        }
    }
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        digits.push(c);
    }
    digits
}

fn numeric_cmp(a: &Value, b: &Value, ta: &str, tb: &str) -> Ordering {
    match (a.numeric_key(), b.numeric_key()) {
        (Some(x), Some(y)) => x.compare(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => ta.cmp(tb),
    }
}

fn compare_values(kind: &SortType, a: &Value, b: &Value) -> Result<Ordering> {
    let (ta, tb) = match (a.as_str(), b.as_str()) {
        (None, None) => return Ok(Ordering::Equal),
        (None, Some(_)) => return Ok(Ordering::Less),
        (Some(_), None) => return Ok(Ordering::Greater),
        (Some(ta), Some(tb)) => (ta, tb),
    };
    Ok(match kind {
        SortType::Auto | SortType::Ascii => ta.cmp(tb),
        SortType::Dictionary => dictionary_cmp(ta, tb),
        SortType::Numeric => numeric_cmp(a, b, ta, tb),
        SortType::Custom(cmp) => match cmp.compare(a, b)? {
            -1 => Ordering::Less,
            0 => Ordering::Equal,
            1 => Ordering::Greater,
            result => bail!(TableError::ComparatorError { result }),
        },
    })
}

struct SortRow {
    id: HeaderId,
    keys: Vec<Value>,
}

fn compare_rows(keys: &[SortKey], a: &SortRow, b: &SortRow) -> Result<Ordering> {
    for (i, key) in keys.iter().enumerate() {
        let ord = compare_values(&key.kind, &a.keys[i], &b.keys[i])?;
        if ord != Ordering::Equal {
            return Ok(if key.descending { ord.reverse() } else { ord });
        }
    }
    Ok(Ordering::Equal)
}

impl Table {
    /// Sorts rows by `keys`. Returns the new order; with
    /// [`SortOptions::with_apply`] it also becomes the table's row map.
    pub fn sort_rows(&self, keys: &[SortKey], options: SortOptions) -> Result<Vec<HeaderId>> {
        if options.apply && options.unique {
            bail!("a unique sort drops rows and can't be applied to the table");
        }

        let (keys, mut rows) = {
            let core = self.core.lock();
            let mut resolved = Vec::with_capacity(keys.len());
            for key in keys {
                let mut key = key.clone();
                if matches!(key.kind, SortType::Auto) {
                    key.kind = if core.column_type(key.column)?.is_numeric() {
                        SortType::Numeric
                    } else {
                        SortType::Ascii
                    };
                }
                core.columns.header(key.column)?;
                resolved.push(key);
            }
            let mut rows = Vec::with_capacity(core.rows.len());
            for id in core.rows.ids() {
                let mut values = Vec::with_capacity(resolved.len());
                for key in &resolved {
                    values.push(core.value(*id, key.column)?.clone());
                }
                rows.push(SortRow { id: *id, keys: values });
            }
            (resolved, rows)
        };

        let mut failure = None;
        rows.sort_by(|a, b| {
            if failure.is_some() {
                return Ordering::Equal;
            }
            compare_rows(&keys, a, b).unwrap_or_else(|err| {
                failure = Some(err);
                Ordering::Equal
            })
        });
        if let Some(err) = failure {
            return Err(err);
        }

        if options.unique {
            let mut unique: Vec<SortRow> = Vec::with_capacity(rows.len());
            for row in rows {
                match unique.last() {
                    Some(prev) if compare_rows(&keys, prev, &row)? == Ordering::Equal => {}
                    _ => unique.push(row),
                }
            }
            rows = unique;
        }

        let order: Vec<HeaderId> = rows.into_iter().map(|r| r.id).collect();
        log::debug!(
            "{} sorted {} rows by {} keys",
            self.table_name(),
            order.len(),
            keys.len()
        );
        if options.apply {
            self.mutate(|core, changes| {
                let moved = core.axis_mut(AxisKind::Row).reorder(order.clone())?;
                changes.extend(moved.into_iter().map(|id| Change::moved(AxisKind::Row, id)));
                Ok::<_, eyre::Report>(())
            })?;
        }
        Ok(order)
    }
}
