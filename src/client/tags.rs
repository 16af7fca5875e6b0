//! # Tag Index
//!
//! A [`TagTable`] maps tag names to sets of header identities for one axis.
//! Because it is keyed by identity, tags follow a row or column through any
//! reordering and disappear only when the header is deleted.
//!
//! ## Reserved Names
//!
//! `all` and `end` are resolved against the axis at lookup time and are never
//! stored. Every mutation rejects them with `ReservedTag`. Names made only of
//! digits are rejected the same way, since they would be shadowed by index
//! resolution.
//!
//! ## Sharing
//!
//! Each client reads and writes either the core's shared table for an axis or
//! a private table of its own, chosen by [`TagSharing`](super::TagSharing)
//! when the client is created. Deleted headers are purged from every table.

use super::Table;
use crate::config::{RESERVED_TAGS, TAG_ALL, TAG_END};
use crate::error::TableError;
use crate::table::{self, AxisKind, HeaderId};
use eyre::{bail, Result};
use hashbrown::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct TagTable {
    kind: AxisKind,
    tags: HashMap<String, HashSet<HeaderId>>,
}

pub(crate) fn check_name(tag: &str) -> Result<()> {
    if RESERVED_TAGS.contains(&tag) || tag.is_empty() || tag.bytes().all(|b| b.is_ascii_digit())
    {
        bail!(TableError::ReservedTag(tag.to_string()));
    }
    Ok(())
}

impl TagTable {
    pub fn new(kind: AxisKind) -> Self {
        Self {
            kind,
            tags: HashMap::new(),
        }
    }

    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    pub fn add(&mut self, id: HeaderId, tag: &str) -> Result<()> {
        check_name(tag)?;
        self.tags.entry(tag.to_string()).or_default().insert(id);
        Ok(())
    }

    /// Removes `tag` from one header. The tag itself stays known even when
    /// its last member is removed.
    pub fn remove(&mut self, id: HeaderId, tag: &str) -> Result<bool> {
        check_name(tag)?;
        Ok(self
            .tags
            .get_mut(tag)
            .map(|members| members.remove(&id))
            .unwrap_or(false))
    }

    pub fn has(&self, id: HeaderId, tag: &str) -> bool {
        self.tags
            .get(tag)
            .map(|members| members.contains(&id))
            .unwrap_or(false)
    }

    pub fn members(&self, tag: &str) -> Option<&HashSet<HeaderId>> {
        self.tags.get(tag)
    }

    /// Removes the tag from every header.
    pub fn forget(&mut self, tag: &str) -> Result<bool> {
        check_name(tag)?;
        Ok(self.tags.remove(tag).is_some())
    }

    pub fn forget_header(&mut self, id: HeaderId) {
        for members in self.tags.values_mut() {
            members.remove(&id);
        }
    }

    /// Tags carried by `id`, sorted by name.
    pub fn tags_of(&self, id: HeaderId) -> Vec<String> {
        let mut names: Vec<String> = self
            .tags
            .iter()
            .filter(|(_, members)| members.contains(&id))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tags.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn clear(&mut self) {
        self.tags.clear();
    }
}

impl Table {
    pub fn add_tag(&self, axis: AxisKind, id: HeaderId, tag: &str) -> Result<()> {
        let mut core = self.core.lock();
        core.axis(axis).header(id)?;
        let mut state = self.client.state.lock();
        state.tags_mut(&mut core, axis).add(id, tag)
    }

    pub fn remove_tag(&self, axis: AxisKind, id: HeaderId, tag: &str) -> Result<bool> {
        let mut core = self.core.lock();
        core.axis(axis).header(id)?;
        let mut state = self.client.state.lock();
        state.tags_mut(&mut core, axis).remove(id, tag)
    }

    /// `all` covers every live header and `end` the last one.
    pub fn has_tag(&self, axis: AxisKind, id: HeaderId, tag: &str) -> Result<bool> {
        let core = self.core.lock();
        let axis_ref = core.axis(axis);
        axis_ref.header(id)?;
        match tag {
            TAG_ALL => Ok(true),
            TAG_END => Ok(axis_ref.last() == Some(id)),
            _ => {
                let state = self.client.state.lock();
                Ok(state.tags(&core, axis).has(id, tag))
            }
        }
    }

    /// Members of a tag in position order. `all` is always the full axis.
    pub fn tag_members(&self, axis: AxisKind, tag: &str) -> Result<Vec<HeaderId>> {
        let core = self.core.lock();
        let state = self.client.state.lock();
        table::tag_members(core.axis(axis), state.tags(&core, axis), tag)
    }

    pub fn forget_tag(&self, axis: AxisKind, tag: &str) -> Result<bool> {
        let mut core = self.core.lock();
        let mut state = self.client.state.lock();
        state.tags_mut(&mut core, axis).forget(tag)
    }

    pub fn tags_of(&self, axis: AxisKind, id: HeaderId) -> Result<Vec<String>> {
        let core = self.core.lock();
        core.axis(axis).header(id)?;
        let state = self.client.state.lock();
        Ok(state.tags(&core, axis).tags_of(id))
    }

    pub fn tag_names(&self, axis: AxisKind) -> Vec<String> {
        let core = self.core.lock();
        let state = self.client.state.lock();
        state.tags(&core, axis).names()
    }
}
