//! Tree bins: red-black trees over arena entries.
//!
//! Entries are ordered by spread hash, then by the map's natural key order when
//! one is configured, then by insertion sequence number. The sequence number only
//! decides where a node is placed; lookups never consult it and instead probe
//! both subtrees when hash and order cannot tell keys apart.
//!
//! Besides the tree shape, every tree bin keeps its entries on a doubly linked
//! list (`next`/`prev`). Splitting and untreeifying walk that list, so neither
//! needs an explicit traversal stack.

use core::borrow::Borrow;
use core::cmp::Ordering;

use super::chain::{ChainBin, ListIter, ListPart};
use super::entry::{EntryId, LinkTable, Slots};
use super::table::Bin;

/// Natural key order used to place colliding keys inside a tree bin.
pub(crate) type KeyOrder<K> = fn(&K, &K) -> Ordering;

/// A non-empty red-black tree bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TreeBin {
    pub(crate) root: EntryId,
    pub(crate) first: EntryId,
    pub(crate) len: usize,
}

impl TreeBin {
    /// Builds a tree from the list starting at `head`.
    ///
    /// List order is kept; `prev` links are rebuilt from it.
    pub(crate) fn from_list<K, V>(
        slots: &Slots<'_, K, V>,
        links: &mut LinkTable,
        head: EntryId,
        order: Option<KeyOrder<K>>,
    ) -> Self {
        let mut root: Option<EntryId> = None;
        let mut prev: Option<EntryId> = None;
        let mut len = 0;
        let mut cur = Some(head);
        while let Some(id) = cur {
            cur = links[id].next;
            links[id].clear_tree();
            links[id].prev = prev;
            attach(slots, links, &mut root, id, order);
            prev = Some(id);
            len += 1;
        }
        Self {
            // `head` was attached first, so the tree is non-empty.
            root: root.unwrap_or(head),
            first: head,
            len,
        }
    }

    /// Looks `key` up, probing both subtrees where hashes tie.
    #[inline]
    pub(crate) fn find<K, V, Q>(&self, slots: &Slots<'_, K, V>, links: &LinkTable, hash: u32, key: &Q) -> Option<EntryId>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        find_from(slots, links, Some(self.root), hash, key, &|_: &K| None)
    }

    /// Looks `key` up, letting `side` pick a subtree where hashes tie.
    ///
    /// `side` compares `key` against a stored key; `None` searches both subtrees.
    #[inline]
    pub(crate) fn find_by<K, V, Q>(
        &self,
        slots: &Slots<'_, K, V>,
        links: &LinkTable,
        hash: u32,
        key: &Q,
        side: &dyn Fn(&K) -> Option<Ordering>,
    ) -> Option<EntryId>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        find_from(slots, links, Some(self.root), hash, key, side)
    }

    /// Looks up an owned key, letting the natural order pick a side on hash ties.
    #[inline]
    pub(crate) fn find_owned<K, V>(
        &self,
        slots: &Slots<'_, K, V>,
        links: &LinkTable,
        hash: u32,
        key: &K,
        order: Option<KeyOrder<K>>,
    ) -> Option<EntryId>
    where
        K: Eq,
    {
        match order {
            Some(cmp) => find_from(slots, links, Some(self.root), hash, key, &|other: &K| Some(cmp(key, other))),
            None => self.find(slots, links, hash, key),
        }
    }

    /// Inserts a freshly allocated entry that is known not to be present.
    pub(crate) fn insert<K, V>(&mut self, slots: &Slots<'_, K, V>, links: &mut LinkTable, id: EntryId, order: Option<KeyOrder<K>>) {
        links[id] = Default::default();
        links[id].next = Some(self.first);
        links[self.first].prev = Some(id);
        self.first = id;

        let mut root = Some(self.root);
        attach(slots, links, &mut root, id, order);
        if let Some(root) = root {
            self.root = root;
        }
        self.len += 1;
    }

    /// Detaches `id` from the tree and the list.
    ///
    /// Returns `None` when the bin is left empty.
    pub(crate) fn remove(mut self, links: &mut LinkTable, id: EntryId) -> Option<Self> {
        let (prev, next) = (links[id].prev, links[id].next);
        match prev {
            Some(p) => links[p].next = next,
            None => {
                if let Some(n) = next {
                    self.first = n;
                }
            }
        }
        if let Some(n) = next {
            links[n].prev = prev;
        }

        let mut root = Some(self.root);
        delete(links, &mut root, id);
        links[id] = Default::default();
        self.len -= 1;

        match root {
            Some(root) if self.len > 0 => {
                self.root = root;
                Some(self)
            }
            _ => None,
        }
    }

    /// Converts the bin back into a chain in list order.
    pub(crate) fn untreeify(self, links: &mut LinkTable) -> ChainBin {
        let mut tail = self.first;
        let mut cur = Some(self.first);
        while let Some(id) = cur {
            cur = links[id].next;
            links[id].clear_tree();
            tail = id;
        }
        ChainBin {
            head: self.first,
            tail,
            len: self.len,
        }
    }

    /// Rebuilds one half of a split: a chain when small enough, else a tree.
    pub(crate) fn rebuild_part<K, V>(
        slots: &Slots<'_, K, V>,
        links: &mut LinkTable,
        part: ListPart,
        untreeify_threshold: usize,
        order: Option<KeyOrder<K>>,
    ) -> Bin {
        match part.head {
            None => Bin::Empty,
            Some(_) if part.len <= untreeify_threshold => part.into_chain(links).map_or(Bin::Empty, Bin::Chain),
            Some(head) => Bin::Tree(Self::from_list(slots, links, head, order)),
        }
    }

    /// Height of the tree. Used by invariant checks and tests.
    pub(crate) fn height(&self, links: &LinkTable) -> usize {
        fn go(links: &LinkTable, node: Option<EntryId>) -> usize {
            match node {
                None => 0,
                Some(id) => 1 + go(links, links[id].left).max(go(links, links[id].right)),
            }
        }
        go(links, Some(self.root))
    }

    /// Checks colouring, parent links, hash order and list membership.
    ///
    /// Returns a description of the first violation.
    pub(crate) fn check<K, V>(&self, slots: &Slots<'_, K, V>, links: &LinkTable) -> Result<(), String> {
        if links[self.root].parent.is_some() {
            return Err("root has a parent".into());
        }
        if links[self.root].red {
            return Err("root is red".into());
        }
        let mut count = 0;
        black_height(slots, links, Some(self.root), &mut count)?;
        if count != self.len {
            return Err(format!("tree holds {count} nodes, bin records {}", self.len));
        }
        let mut listed = 0;
        let mut prev = None;
        for id in ListIter::new(links, Some(self.first)) {
            if links[id].prev != prev {
                return Err("list prev link broken".into());
            }
            prev = Some(id);
            listed += 1;
        }
        if listed != self.len {
            return Err(format!("list holds {listed} nodes, bin records {}", self.len));
        }
        Ok(())
    }
}

// ===== SEARCH =====

fn find_from<K, V, Q>(
    slots: &Slots<'_, K, V>,
    links: &LinkTable,
    start: Option<EntryId>,
    hash: u32,
    key: &Q,
    side: &dyn Fn(&K) -> Option<Ordering>,
) -> Option<EntryId>
where
    K: Borrow<Q>,
    Q: Eq + ?Sized,
{
    let mut node = start;
    while let Some(id) = node {
        let entry = &slots[id];
        let (left, right) = (links[id].left, links[id].right);
        node = match entry.hash.cmp(&hash) {
            Ordering::Greater => left,
            Ordering::Less => right,
            Ordering::Equal => {
                if entry.key.borrow() == key {
                    return Some(id);
                }
                match (left, right) {
                    (None, other) | (other, None) => other,
                    (Some(l), Some(r)) => match side(&entry.key) {
                        Some(Ordering::Less) => Some(l),
                        Some(Ordering::Greater) => Some(r),
                        _ => {
                            if let Some(found) = find_from(slots, links, Some(r), hash, key, side) {
                                return Some(found);
                            }
                            Some(l)
                        }
                    },
                }
            }
        };
    }
    None
}

// ===== RED-BLACK BALANCING =====

/// Whether `id` sorts before `other` for placement purposes.
#[inline]
fn goes_left<K, V>(slots: &Slots<'_, K, V>, id: EntryId, other: EntryId, order: Option<KeyOrder<K>>) -> bool {
    let (new, node) = (&slots[id], &slots[other]);
    match new.hash.cmp(&node.hash) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => match order.map(|cmp| cmp(&new.key, &node.key)) {
            Some(Ordering::Less) => true,
            Some(Ordering::Greater) => false,
            _ => new.seq < node.seq,
        },
    }
}

/// Links `id` as a leaf at its ordered position and rebalances.
fn attach<K, V>(
    slots: &Slots<'_, K, V>,
    links: &mut LinkTable,
    root: &mut Option<EntryId>,
    id: EntryId,
    order: Option<KeyOrder<K>>,
) {
    let Some(mut parent) = *root else {
        links[id].red = false;
        *root = Some(id);
        return;
    };
    loop {
        let left = goes_left(slots, id, parent, order);
        let child = if left { links[parent].left } else { links[parent].right };
        match child {
            Some(c) => parent = c,
            None => {
                if left {
                    links[parent].left = Some(id);
                } else {
                    links[parent].right = Some(id);
                }
                links[id].parent = Some(parent);
                break;
            }
        }
    }
    insert_fixup(links, root, id);
}

#[inline(always)]
fn is_red(links: &LinkTable, node: Option<EntryId>) -> bool {
    node.map_or(false, |id| links[id].red)
}

#[inline(always)]
fn set_black(links: &mut LinkTable, node: Option<EntryId>) {
    if let Some(id) = node {
        links[id].red = false;
    }
}

#[inline(always)]
fn left_of(links: &LinkTable, node: Option<EntryId>) -> Option<EntryId> {
    node.and_then(|id| links[id].left)
}

#[inline(always)]
fn right_of(links: &LinkTable, node: Option<EntryId>) -> Option<EntryId> {
    node.and_then(|id| links[id].right)
}

/// Replaces `old` with `new` in `old`'s parent (or as root).
fn replace_child(links: &mut LinkTable, root: &mut Option<EntryId>, old: EntryId, new: Option<EntryId>) {
    let parent = links[old].parent;
    match parent {
        None => *root = new,
        Some(p) => {
            if links[p].left == Some(old) {
                links[p].left = new;
            } else {
                links[p].right = new;
            }
        }
    }
    if let Some(n) = new {
        links[n].parent = parent;
    }
}

fn rotate_left(links: &mut LinkTable, root: &mut Option<EntryId>, p: EntryId) {
    let Some(r) = links[p].right else { return };
    let rl = links[r].left;
    links[p].right = rl;
    if let Some(rl) = rl {
        links[rl].parent = Some(p);
    }
    replace_child(links, root, p, Some(r));
    links[r].left = Some(p);
    links[p].parent = Some(r);
}

fn rotate_right(links: &mut LinkTable, root: &mut Option<EntryId>, p: EntryId) {
    let Some(l) = links[p].left else { return };
    let lr = links[l].right;
    links[p].left = lr;
    if let Some(lr) = lr {
        links[lr].parent = Some(p);
    }
    replace_child(links, root, p, Some(l));
    links[l].right = Some(p);
    links[p].parent = Some(l);
}

fn insert_fixup(links: &mut LinkTable, root: &mut Option<EntryId>, mut x: EntryId) {
    links[x].red = true;
    loop {
        let Some(xp) = links[x].parent else { break };
        if !links[xp].red {
            break;
        }
        // A red parent is never the root, so the grandparent exists.
        let Some(xpp) = links[xp].parent else { break };
        if links[xpp].left == Some(xp) {
            let uncle = links[xpp].right;
            if is_red(links, uncle) {
                set_black(links, uncle);
                links[xp].red = false;
                links[xpp].red = true;
                x = xpp;
                continue;
            }
            if links[xp].right == Some(x) {
                x = xp;
                rotate_left(links, root, x);
            }
            let Some(xp) = links[x].parent else { break };
            let Some(xpp) = links[xp].parent else { break };
            links[xp].red = false;
            links[xpp].red = true;
            rotate_right(links, root, xpp);
        } else {
            let uncle = links[xpp].left;
            if is_red(links, uncle) {
                set_black(links, uncle);
                links[xp].red = false;
                links[xpp].red = true;
                x = xpp;
                continue;
            }
            if links[xp].left == Some(x) {
                x = xp;
                rotate_right(links, root, x);
            }
            let Some(xp) = links[x].parent else { break };
            let Some(xpp) = links[xp].parent else { break };
            links[xp].red = false;
            links[xpp].red = true;
            rotate_left(links, root, xpp);
        }
    }
    set_black(links, *root);
}

/// Unlinks `z` from the tree. When `z` has two children its in-order successor
/// is relinked into `z`'s position; entries never trade payloads.
fn delete(links: &mut LinkTable, root: &mut Option<EntryId>, z: EntryId) {
    let (z_left, z_right) = (links[z].left, links[z].right);
    let removed_red;
    let x;
    let x_parent;

    match (z_left, z_right) {
        (None, child) | (child, None) => {
            removed_red = links[z].red;
            x = child;
            x_parent = links[z].parent;
            replace_child(links, root, z, child);
        }
        (Some(zl), Some(zr)) => {
            let mut y = zr;
            while let Some(l) = links[y].left {
                y = l;
            }
            removed_red = links[y].red;
            x = links[y].right;
            if links[y].parent == Some(z) {
                x_parent = Some(y);
            } else {
                x_parent = links[y].parent;
                replace_child(links, root, y, x);
                links[y].right = Some(zr);
                links[zr].parent = Some(y);
            }
            replace_child(links, root, z, Some(y));
            links[y].left = Some(zl);
            links[zl].parent = Some(y);
            links[y].red = links[z].red;
        }
    }

    if !removed_red {
        delete_fixup(links, root, x, x_parent);
    }
}

fn delete_fixup(links: &mut LinkTable, root: &mut Option<EntryId>, mut x: Option<EntryId>, mut x_parent: Option<EntryId>) {
    while x != *root && !is_red(links, x) {
        let Some(p) = x_parent else { break };
        if links[p].left == x {
            let mut w = links[p].right;
            if is_red(links, w) {
                set_black(links, w);
                links[p].red = true;
                rotate_left(links, root, p);
                w = links[p].right;
            }
            if !is_red(links, left_of(links, w)) && !is_red(links, right_of(links, w)) {
                if let Some(w) = w {
                    links[w].red = true;
                }
                x = Some(p);
                x_parent = links[p].parent;
            } else {
                if !is_red(links, right_of(links, w)) {
                    set_black(links, left_of(links, w));
                    if let Some(wid) = w {
                        links[wid].red = true;
                        rotate_right(links, root, wid);
                    }
                    w = links[p].right;
                }
                if let Some(wid) = w {
                    links[wid].red = links[p].red;
                }
                links[p].red = false;
                set_black(links, right_of(links, w));
                rotate_left(links, root, p);
                x = *root;
                x_parent = None;
            }
        } else {
            let mut w = links[p].left;
            if is_red(links, w) {
                set_black(links, w);
                links[p].red = true;
                rotate_right(links, root, p);
                w = links[p].left;
            }
            if !is_red(links, left_of(links, w)) && !is_red(links, right_of(links, w)) {
                if let Some(w) = w {
                    links[w].red = true;
                }
                x = Some(p);
                x_parent = links[p].parent;
            } else {
                if !is_red(links, left_of(links, w)) {
                    set_black(links, right_of(links, w));
                    if let Some(wid) = w {
                        links[wid].red = true;
                        rotate_left(links, root, wid);
                    }
                    w = links[p].left;
                }
                if let Some(wid) = w {
                    links[wid].red = links[p].red;
                }
                links[p].red = false;
                set_black(links, left_of(links, w));
                rotate_right(links, root, p);
                x = *root;
                x_parent = None;
            }
        }
    }
    set_black(links, x);
}

/// Black height of the subtree at `node`, counting nodes into `count`.
fn black_height<K, V>(
    slots: &Slots<'_, K, V>,
    links: &LinkTable,
    node: Option<EntryId>,
    count: &mut usize,
) -> Result<usize, String> {
    let Some(id) = node else { return Ok(1) };
    *count += 1;
    let l = links[id];
    if l.red && (is_red(links, l.left) || is_red(links, l.right)) {
        return Err("red node with red child".into());
    }
    for child in [l.left, l.right].into_iter().flatten() {
        if links[child].parent != Some(id) {
            return Err("child does not point back at its parent".into());
        }
    }
    let hash = slots[id].hash;
    if l.left.map_or(false, |c| slots[c].hash > hash) || l.right.map_or(false, |c| slots[c].hash < hash) {
        return Err("children out of hash order".into());
    }
    let left = black_height(slots, links, l.left, count)?;
    let right = black_height(slots, links, l.right, count)?;
    if left != right {
        return Err("unequal black heights".into());
    }
    Ok(left + usize::from(!l.red))
}
