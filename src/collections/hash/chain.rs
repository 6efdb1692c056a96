//! Chain bins: short singly-linked lists of entries.

use core::borrow::Borrow;

use super::entry::{EntryId, LinkTable, Slots};

/// A non-empty chain threaded through `Links::next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChainBin {
    pub(crate) head: EntryId,
    pub(crate) tail: EntryId,
    pub(crate) len: usize,
}

impl ChainBin {
    /// A chain holding a single entry.
    #[inline]
    pub(crate) fn single(links: &mut LinkTable, id: EntryId) -> Self {
        links[id].next = None;
        Self {
            head: id,
            tail: id,
            len: 1,
        }
    }

    /// Looks `key` up, comparing the cached hash before the key itself.
    #[inline]
    pub(crate) fn find<K, V, Q>(&self, slots: &Slots<'_, K, V>, links: &LinkTable, hash: u32, key: &Q) -> Option<EntryId>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        ListIter::new(links, Some(self.head)).find(|&id| {
            let entry = &slots[id];
            entry.hash == hash && entry.key.borrow() == key
        })
    }

    /// Appends a freshly allocated entry.
    #[inline]
    pub(crate) fn push_back(&mut self, links: &mut LinkTable, id: EntryId) {
        links[id].next = None;
        links[self.tail].next = Some(id);
        self.tail = id;
        self.len += 1;
    }

    /// Unlinks `id` from the chain, returning whether it was found. The chain
    /// is empty afterwards when `len` drops to zero; the caller then clears
    /// the bin.
    pub(crate) fn unlink(&mut self, links: &mut LinkTable, id: EntryId) -> bool {
        let mut prev: Option<EntryId> = None;
        let mut cur = Some(self.head);
        while let Some(c) = cur {
            let next = links[c].next;
            if c == id {
                match prev {
                    Some(p) => links[p].next = next,
                    None => {
                        if let Some(n) = next {
                            self.head = n;
                        }
                    }
                }
                if self.tail == id {
                    if let Some(p) = prev {
                        self.tail = p;
                    }
                }
                links[id].next = None;
                self.len -= 1;
                return true;
            }
            prev = cur;
            cur = next;
        }
        false
    }
}

/// Walks a list through `Links::next`.
pub(crate) struct ListIter<'a> {
    links: &'a LinkTable,
    cur: Option<EntryId>,
}

impl<'a> ListIter<'a> {
    #[inline]
    pub(crate) fn new(links: &'a LinkTable, head: Option<EntryId>) -> Self {
        Self { links, cur: head }
    }
}

impl Iterator for ListIter<'_> {
    type Item = EntryId;

    #[inline]
    fn next(&mut self) -> Option<EntryId> {
        let id = self.cur?;
        self.cur = self.links[id].next;
        Some(id)
    }
}

/// One half of a bin split during resize, built by relinking in order.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ListPart {
    pub(crate) head: Option<EntryId>,
    pub(crate) tail: Option<EntryId>,
    pub(crate) len: usize,
}

impl ListPart {
    #[inline]
    fn push(&mut self, links: &mut LinkTable, id: EntryId) {
        links[id].next = None;
        match self.tail {
            Some(t) => links[t].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
    }

    /// Turns the part into a chain, dropping any tree links it carried.
    pub(crate) fn into_chain(self, links: &mut LinkTable) -> Option<ChainBin> {
        let (head, tail) = (self.head?, self.tail?);
        let mut cur = Some(head);
        while let Some(id) = cur {
            links[id].clear_tree();
            cur = links[id].next;
        }
        Some(ChainBin {
            head,
            tail,
            len: self.len,
        })
    }
}

/// Partitions the list starting at `head` on `hash & bit`.
///
/// Entries with the bit clear go to the first part (same index in the doubled
/// table), the rest to the second (`index + bit`). Relative order is kept.
pub(crate) fn split_list<K, V>(
    slots: &Slots<'_, K, V>,
    links: &mut LinkTable,
    head: Option<EntryId>,
    bit: usize,
) -> (ListPart, ListPart) {
    let mut lo = ListPart::default();
    let mut hi = ListPart::default();
    let mut cur = head;
    while let Some(id) = cur {
        cur = links[id].next;
        if slots[id].hash as usize & bit == 0 {
            lo.push(links, id);
        } else {
            hi.push(links, id);
        }
    }
    (lo, hi)
}
