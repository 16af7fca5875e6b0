//! # Header Iteration
//!
//! One cursor type, [`HeaderIter`], walks an axis for every way a caller can
//! name a set of rows or columns:
//!
//! | Spec | Yields |
//! |------|--------|
//! | `Index(n)` | the header at position `n` |
//! | `Label(s)` | the header labelled `s` |
//! | `Range(a, b)` | positions `min(a,b)..=max(a,b)` |
//! | `Tag(t)` | members of tag `t`, in position order |
//! | `All` | every header, in position order |
//! | `Chain(specs)` | union of `specs`, first occurrence wins |
//!
//! ## Raw Specifiers
//!
//! [`classify`] turns a raw string into a `Spec`: digits are an index, the
//! reserved names `all`/`end` are handled next, then labels, then tags. A
//! missing index or label is a `NotFound` flagged `creatable`, which lets
//! value-setting paths create the header on first reference.
//!
//! ## Mutation
//!
//! `HeaderIter` borrows the axis, so the borrow checker already rules out
//! mutating the axis while a cursor is alive. Tag and chain cursors iterate a
//! snapshot taken at construction.

use super::axis::Axis;
use super::header::HeaderId;
use crate::client::TagTable;
use crate::config::{TAG_ALL, TAG_END};
use crate::error::TableError;
use eyre::{bail, Result};
use hashbrown::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spec {
    Index(usize),
    Label(String),
    Range(usize, usize),
    Tag(String),
    All,
    Chain(Vec<Spec>),
}

impl Spec {
    pub fn label(label: impl Into<String>) -> Self {
        Spec::Label(label.into())
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Spec::Tag(tag.into())
    }
}

enum Cursor {
    Positions { next: usize, end: usize },
    Snapshot(std::vec::IntoIter<HeaderId>),
}

pub struct HeaderIter<'a> {
    axis: &'a Axis,
    cursor: Cursor,
}

impl<'a> HeaderIter<'a> {
    pub fn new(axis: &'a Axis, tags: &TagTable, spec: &Spec) -> Result<Self> {
        let cursor = match spec {
            Spec::Index(n) => {
                if *n >= axis.len() {
                    bail!(TableError::NotFound {
                        what: axis.kind().name(),
                        name: n.to_string(),
                        creatable: true,
                    });
                }
                Cursor::Positions {
                    next: *n,
                    end: *n + 1,
                }
            }
            Spec::Label(label) => match axis.find(label) {
                Some(id) => Cursor::Snapshot(vec![id].into_iter()),
                None => bail!(TableError::NotFound {
                    what: axis.kind().name(),
                    name: label.clone(),
                    creatable: true,
                }),
            },
            Spec::Range(a, b) => {
                let (lo, hi) = if a <= b { (*a, *b) } else { (*b, *a) };
                if hi >= axis.len() {
                    bail!(TableError::not_found(axis.kind().name(), hi.to_string()));
                }
                Cursor::Positions {
                    next: lo,
                    end: hi + 1,
                }
            }
            Spec::Tag(tag) => Cursor::Snapshot(tag_members(axis, tags, tag)?.into_iter()),
            Spec::All => Cursor::Positions {
                next: 0,
                end: axis.len(),
            },
            Spec::Chain(specs) => {
                let mut seen = HashSet::new();
                let mut ids = Vec::new();
                for spec in specs {
                    for id in HeaderIter::new(axis, tags, spec)? {
                        if seen.insert(id) {
                            ids.push(id);
                        }
                    }
                }
                Cursor::Snapshot(ids.into_iter())
            }
        };
        Ok(Self { axis, cursor })
    }
}

impl Iterator for HeaderIter<'_> {
    type Item = HeaderId;

    fn next(&mut self) -> Option<HeaderId> {
        match &mut self.cursor {
            Cursor::Positions { next, end } => {
                if *next >= *end {
                    return None;
                }
                let id = self.axis.id_at(*next);
                *next += 1;
                id
            }
            Cursor::Snapshot(iter) => iter.next(),
        }
    }
}

/// Members of `tag` in position order. `all` and `end` are resolved against
/// the axis; any other tag must exist in `tags`.
pub fn tag_members(axis: &Axis, tags: &TagTable, tag: &str) -> Result<Vec<HeaderId>> {
    match tag {
        TAG_ALL => Ok(axis.ids().to_vec()),
        TAG_END => Ok(axis.last().into_iter().collect()),
        _ => {
            let Some(members) = tags.members(tag) else {
                bail!(TableError::not_found("tag", tag));
            };
            let mut ids: Vec<HeaderId> = members
                .iter()
                .copied()
                .filter(|id| axis.contains(*id))
                .collect();
            ids.sort_by_key(|id| axis.position(*id).unwrap_or(usize::MAX));
            Ok(ids)
        }
    }
}

/// Resolves a raw specifier: index, then reserved tag, then label, then tag.
pub fn classify(axis: &Axis, tags: &TagTable, raw: &str) -> Result<Spec> {
    if raw.is_empty() {
        bail!(TableError::not_found(axis.kind().name(), raw));
    }
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return match raw.parse::<usize>() {
            Ok(n) if n < axis.len() => Ok(Spec::Index(n)),
            _ => bail!(TableError::NotFound {
                what: axis.kind().name(),
                name: raw.to_string(),
                creatable: true,
            }),
        };
    }
    match raw {
        TAG_ALL => return Ok(Spec::All),
        TAG_END => {
            return match axis.len() {
                0 => bail!(TableError::not_found(axis.kind().name(), raw)),
                n => Ok(Spec::Index(n - 1)),
            }
        }
        _ => {}
    }
    if axis.find(raw).is_some() {
        return Ok(Spec::Label(raw.to_string()));
    }
    if tags.members(raw).is_some() {
        return Ok(Spec::Tag(raw.to_string()));
    }
    bail!(TableError::NotFound {
        what: axis.kind().name(),
        name: raw.to_string(),
        creatable: true,
    })
}
