//! # Header Pool
//!
//! Rows and columns are both represented by a [`Header`] living in a slot of
//! a [`HeaderPool`]. A header's permanent identity is a [`HeaderId`], the
//! pair of its slot index and the slot's generation at allocation time.
//!
//! ## Slot Lifecycle
//!
//! ```text
//!   free ──alloc──> live (slot 3, gen 0) ──free──> free (slot 3, gen 1)
//!                                                    │
//!                                  alloc ────────────┘
//!                                    │
//!                                    v
//!                              live (slot 3, gen 1)
//! ```
//!
//! Freeing a header bumps its slot's generation, so `HeaderId { 3, 0 }` never
//! resolves again even after slot 3 is recycled. The only way to hand out an
//! older generation is [`HeaderPool::alloc_at`], the explicit reissue path.
//!
//! The pool's capacity is the number of slots, live or free. The value grid
//! sizes every column vector by the row pool's capacity, so slot indices are
//! also cell offsets.

use crate::config::{MAX_EXPLICIT_SLOT, MIN_POOL_GROWTH, POOL_GROWTH_FACTOR};
use crate::error::TableError;
use eyre::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    Row,
    Column,
}

impl AxisKind {
    pub fn name(&self) -> &'static str {
        match self {
            AxisKind::Row => "row",
            AxisKind::Column => "column",
        }
    }
}

/// Permanent identity of a row or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeaderId {
    slot: u32,
    generation: u32,
}

impl HeaderId {
    pub fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub fn slot(&self) -> usize {
        self.slot as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for HeaderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.slot, self.generation)
    }
}

pub mod header_flags {
    pub const HIDDEN: u8 = 0x01;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    label: String,
    position: usize,
    flags: u8,
}

impl Header {
    pub(crate) fn new(label: String) -> Self {
        Self {
            label,
            position: 0,
            flags: 0,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_hidden(&self) -> bool {
        self.flags & header_flags::HIDDEN != 0
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.label = label;
    }

    pub(crate) fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    pub(crate) fn set_hidden(&mut self, hidden: bool) {
        if hidden {
            self.flags |= header_flags::HIDDEN;
        } else {
            self.flags &= !header_flags::HIDDEN;
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    header: Option<Header>,
}

#[derive(Debug)]
pub struct HeaderPool {
    kind: AxisKind,
    slots: Vec<Slot>,
    free: Vec<u32>,
    used: usize,
    initial_capacity: usize,
}

impl HeaderPool {
    pub fn new(kind: AxisKind, initial_capacity: usize) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            free: Vec::new(),
            used: 0,
            initial_capacity: initial_capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn get(&self, id: HeaderId) -> Option<&Header> {
        self.slots
            .get(id.slot())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.header.as_ref())
    }

    pub fn get_mut(&mut self, id: HeaderId) -> Option<&mut Header> {
        self.slots
            .get_mut(id.slot())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.header.as_mut())
    }

    pub fn contains(&self, id: HeaderId) -> bool {
        self.get(id).is_some()
    }

    /// Makes sure at least `additional` slots are on the free list.
    pub fn reserve(&mut self, additional: usize) {
        if self.free.len() >= additional {
            return;
        }
        let needed = additional - self.free.len();
        let current = self.slots.len();
        let step = if current == 0 {
            self.initial_capacity
        } else {
            (current * (POOL_GROWTH_FACTOR - 1)).max(MIN_POOL_GROWTH)
        };
        self.grow_to(current + step.max(needed));
    }

    fn grow_to(&mut self, new_capacity: usize) {
        let old = self.slots.len();
        if new_capacity <= old {
            return;
        }
        self.slots.extend((old..new_capacity).map(|_| Slot {
            generation: 0,
            header: None,
        }));
        // Popped from the back, so push in reverse to hand out low slots first.
        self.free.extend((old..new_capacity).rev().map(|s| s as u32));
    }

    pub fn alloc(&mut self, header: Header) -> HeaderId {
        self.reserve(1);
        let slot = self.free.pop().unwrap_or_default();
        let entry = &mut self.slots[slot as usize];
        entry.header = Some(header);
        self.used += 1;
        HeaderId::new(slot, entry.generation)
    }

    /// Places a header at an explicit identity. Fails with `DuplicateId` if
    /// the slot currently holds a live header, whatever its generation, and
    /// with `NotFound` if the slot is at or past [`MAX_EXPLICIT_SLOT`].
    pub fn alloc_at(&mut self, id: HeaderId, header: Header) -> Result<()> {
        if id.slot() >= MAX_EXPLICIT_SLOT {
            bail!(TableError::not_found(self.kind.name(), id.to_string()));
        }
        if id.slot() >= self.slots.len() {
            self.grow_to(id.slot() + 1);
        }
        if self.slots[id.slot()].header.is_some() {
            bail!(TableError::DuplicateId {
                axis: self.kind,
                id,
            });
        }
        self.free.retain(|&s| s as usize != id.slot());
        let entry = &mut self.slots[id.slot()];
        entry.generation = id.generation;
        entry.header = Some(header);
        self.used += 1;
        Ok(())
    }

    /// Releases a header and retires its identity.
    pub fn free(&mut self, id: HeaderId) -> Option<Header> {
        let entry = self
            .slots
            .get_mut(id.slot())
            .filter(|s| s.generation == id.generation)?;
        let header = entry.header.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.slot);
        self.used -= 1;
        Some(header)
    }
}
