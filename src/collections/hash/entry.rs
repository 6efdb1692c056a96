//! Entry arena.
//!
//! Entries are allocated once and addressed by [`EntryId`] for as long as they
//! live in the map. Bins never own entries directly: a chain is a list threaded
//! through `Links::next`, a tree additionally uses `parent/left/right/red`.
//! Resizing and treeification only rewrite links, never move an entry.
//!
//! Links are kept in a separate vector from the payload so the tree balancing
//! code can work on `&mut LinkTable` alone while reading keys from the slots.

use core::ops::{Index, IndexMut};

use super::error::CapacityError;
use crate::GhostCell;

/// Stable handle of an entry inside an [`EntryArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct EntryId(u32);

impl EntryId {
    #[inline(always)]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Structural links of an entry. Chain bins only use `next`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Links {
    pub(crate) next: Option<EntryId>,
    pub(crate) prev: Option<EntryId>,
    pub(crate) parent: Option<EntryId>,
    pub(crate) left: Option<EntryId>,
    pub(crate) right: Option<EntryId>,
    pub(crate) red: bool,
}

impl Links {
    /// Drops everything but the list successor.
    #[inline]
    pub(crate) fn clear_tree(&mut self) {
        *self = Links {
            next: self.next,
            ..Links::default()
        };
    }
}

/// A stored key/value pair with its cached spread hash.
pub(crate) struct Entry<'brand, K, V> {
    pub(crate) hash: u32,
    /// Tie-break for tree placement when neither hash nor key order decides.
    pub(crate) seq: u64,
    pub(crate) key: K,
    pub(crate) value: GhostCell<'brand, V>,
}

enum Slot<'brand, K, V> {
    Occupied(Entry<'brand, K, V>),
    Vacant { next_free: Option<EntryId> },
}

/// Link storage indexed by [`EntryId`].
#[derive(Debug, Default)]
pub(crate) struct LinkTable(Vec<Links>);

impl Index<EntryId> for LinkTable {
    type Output = Links;

    #[inline(always)]
    fn index(&self, id: EntryId) -> &Links {
        &self.0[id.index()]
    }
}

impl IndexMut<EntryId> for LinkTable {
    #[inline(always)]
    fn index_mut(&mut self, id: EntryId) -> &mut Links {
        &mut self.0[id.index()]
    }
}

/// Slot storage indexed by [`EntryId`].
pub(crate) struct Slots<'brand, K, V>(Vec<Slot<'brand, K, V>>);

impl<'brand, K, V> Slots<'brand, K, V> {
    #[inline]
    pub(crate) fn get(&self, id: EntryId) -> Option<&Entry<'brand, K, V>> {
        match self.0.get(id.index()) {
            Some(Slot::Occupied(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Iterates occupied slots in id order, in parallel.
    #[cfg(feature = "parallel")]
    pub(crate) fn par_occupied(&self) -> impl rayon::iter::ParallelIterator<Item = &Entry<'brand, K, V>>
    where
        K: Sync,
        V: Send + Sync,
    {
        use rayon::prelude::*;

        self.0.par_iter().filter_map(|slot| match slot {
            Slot::Occupied(entry) => Some(entry),
            Slot::Vacant { .. } => None,
        })
    }
}

impl<'brand, K, V> Index<EntryId> for Slots<'brand, K, V> {
    type Output = Entry<'brand, K, V>;

    #[inline(always)]
    fn index(&self, id: EntryId) -> &Entry<'brand, K, V> {
        match &self.0[id.index()] {
            Slot::Occupied(entry) => entry,
            Slot::Vacant { .. } => panic!("entry {} is not live", id.0),
        }
    }
}

impl<'brand, K, V> IndexMut<EntryId> for Slots<'brand, K, V> {
    #[inline(always)]
    fn index_mut(&mut self, id: EntryId) -> &mut Entry<'brand, K, V> {
        match &mut self.0[id.index()] {
            Slot::Occupied(entry) => entry,
            Slot::Vacant { .. } => panic!("entry {} is not live", id.0),
        }
    }
}

/// Owns every entry of a map plus its links. Freed ids are recycled.
pub(crate) struct EntryArena<'brand, K, V> {
    pub(crate) slots: Slots<'brand, K, V>,
    pub(crate) links: LinkTable,
    free_head: Option<EntryId>,
    len: usize,
    next_seq: u64,
}

impl<'brand, K, V> EntryArena<'brand, K, V> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Slots(Vec::new()),
            links: LinkTable::default(),
            free_head: None,
            len: 0,
            next_seq: 0,
        }
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Stores a new entry with cleared links.
    pub(crate) fn alloc(&mut self, hash: u32, key: K, value: V) -> Result<EntryId, CapacityError> {
        let seq = self.next_seq;
        let entry = Entry {
            hash,
            seq,
            key,
            value: GhostCell::new(value),
        };
        let id = match self.free_head {
            Some(id) => {
                let slot = &mut self.slots.0[id.index()];
                self.free_head = match *slot {
                    Slot::Vacant { next_free } => next_free,
                    Slot::Occupied(_) => unreachable!("free list points at a live entry"),
                };
                *slot = Slot::Occupied(entry);
                self.links[id] = Links::default();
                id
            }
            None => {
                let index = self.slots.0.len();
                let raw = u32::try_from(index).map_err(|_| CapacityError {
                    required: self.len + 1,
                    max_capacity: u32::MAX as usize,
                })?;
                self.slots.0.push(Slot::Occupied(entry));
                self.links.0.push(Links::default());
                EntryId(raw)
            }
        };
        self.next_seq += 1;
        self.len += 1;
        Ok(id)
    }

    /// Frees an entry. The caller must already have unlinked it from its bin.
    pub(crate) fn free(&mut self, id: EntryId) -> Entry<'brand, K, V> {
        let slot = core::mem::replace(
            &mut self.slots.0[id.index()],
            Slot::Vacant {
                next_free: self.free_head,
            },
        );
        match slot {
            Slot::Occupied(entry) => {
                self.free_head = Some(id);
                self.links[id] = Links::default();
                self.len -= 1;
                entry
            }
            Slot::Vacant { .. } => panic!("double free of entry {}", id.0),
        }
    }

    /// Drops every entry and resets the id space.
    pub(crate) fn clear(&mut self) {
        self.slots.0.clear();
        self.links.0.clear();
        self.free_head = None;
        self.len = 0;
    }

    /// Moves every live entry out, in id order.
    pub(crate) fn into_entries(self) -> IntoEntries<'brand, K, V> {
        IntoEntries {
            slots: self.slots.0.into_iter(),
            remaining: self.len,
        }
    }
}

/// Owning iterator over the live entries of an arena.
pub(crate) struct IntoEntries<'brand, K, V> {
    slots: std::vec::IntoIter<Slot<'brand, K, V>>,
    remaining: usize,
}

impl<'brand, K, V> Iterator for IntoEntries<'brand, K, V> {
    type Item = Entry<'brand, K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Slot::Occupied(entry) = slot {
                self.remaining -= 1;
                return Some(entry);
            }
        }
        None
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
