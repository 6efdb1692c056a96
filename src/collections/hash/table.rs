//! The bin array and its growth.

use core::borrow::Borrow;
use core::cmp::Ordering;

use super::chain::{split_list, ChainBin};
use super::entry::{EntryId, LinkTable, Slots};
use super::spread::bin_index;
use super::stats::{BinKind, BinStats};
use super::tree::{KeyOrder, TreeBin};

/// One slot of the table. Conversions between variants are explicit state
/// transitions performed by the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Bin {
    #[default]
    Empty,
    Chain(ChainBin),
    Tree(TreeBin),
}

impl Bin {
    /// Number of entries in the bin.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        match self {
            Bin::Empty => 0,
            Bin::Chain(chain) => chain.len,
            Bin::Tree(tree) => tree.len,
        }
    }

    /// First entry of the bin's list.
    #[inline]
    pub(crate) fn head(&self) -> Option<EntryId> {
        match self {
            Bin::Empty => None,
            Bin::Chain(chain) => Some(chain.head),
            Bin::Tree(tree) => Some(tree.first),
        }
    }

    #[inline]
    pub(crate) fn find<K, V, Q>(&self, slots: &Slots<'_, K, V>, links: &LinkTable, hash: u32, key: &Q) -> Option<EntryId>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        match self {
            Bin::Empty => None,
            Bin::Chain(chain) => chain.find(slots, links, hash, key),
            Bin::Tree(tree) => tree.find(slots, links, hash, key),
        }
    }

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
        match self {
            Bin::Tree(tree) => tree.find_by(slots, links, hash, key, side),
            other => other.find(slots, links, hash, key),
        }
    }

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
        match self {
            Bin::Tree(tree) => tree.find_owned(slots, links, hash, key, order),
            other => other.find(slots, links, hash, key),
        }
    }

    pub(crate) fn kind(&self) -> BinKind {
        match self {
            Bin::Empty => BinKind::Empty,
            Bin::Chain(chain) => BinKind::Chain(chain.len),
            Bin::Tree(tree) => BinKind::Tree(tree.len),
        }
    }
}

/// Power-of-two array of bins.
#[derive(Debug)]
pub(crate) struct Table {
    bins: Box<[Bin]>,
}

impl Table {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Self {
            bins: vec![Bin::Empty; capacity].into_boxed_slice(),
        }
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.bins.len()
    }

    #[inline(always)]
    pub(crate) fn index(&self, hash: u32) -> usize {
        bin_index(hash, self.bins.len())
    }

    #[inline(always)]
    pub(crate) fn bin(&self, index: usize) -> Bin {
        self.bins[index]
    }

    #[inline(always)]
    pub(crate) fn set(&mut self, index: usize, bin: Bin) {
        self.bins[index] = bin;
    }

    #[inline]
    pub(crate) fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// Empties every bin, keeping the capacity.
    pub(crate) fn clear(&mut self) {
        self.bins.fill(Bin::Empty);
    }

    /// Doubles the table.
    ///
    /// Every bin splits into the bin at the same index and the one at
    /// `index + old_capacity`, chosen per entry by the single hash bit
    /// `old_capacity`. Hashes are never recomputed. Halves of a tree bin that
    /// shrink to `untreeify_threshold` or below become chains; a tree whose
    /// entries all land on one side is kept as is.
    pub(crate) fn grow<K, V>(
        &mut self,
        slots: &Slots<'_, K, V>,
        links: &mut LinkTable,
        untreeify_threshold: usize,
        order: Option<KeyOrder<K>>,
    ) {
        let old_capacity = self.capacity();
        let mut bins = vec![Bin::Empty; old_capacity * 2].into_boxed_slice();

        for (index, bin) in self.bins.iter().enumerate() {
            let (lo, hi) = match *bin {
                Bin::Empty => continue,
                Bin::Chain(chain) => {
                    let (lo, hi) = split_list(slots, links, Some(chain.head), old_capacity);
                    (
                        lo.into_chain(links).map_or(Bin::Empty, Bin::Chain),
                        hi.into_chain(links).map_or(Bin::Empty, Bin::Chain),
                    )
                }
                Bin::Tree(tree) => {
                    let (lo, hi) = split_list(slots, links, Some(tree.first), old_capacity);
                    #[cfg(feature = "tracing")]
                    tracing::trace!(index, lo = lo.len, hi = hi.len, "splitting tree bin");
                    if hi.len == 0 && lo.len > untreeify_threshold {
                        (Bin::Tree(tree), Bin::Empty)
                    } else if lo.len == 0 && hi.len > untreeify_threshold {
                        (Bin::Empty, Bin::Tree(tree))
                    } else {
                        (
                            TreeBin::rebuild_part(slots, links, lo, untreeify_threshold, order),
                            TreeBin::rebuild_part(slots, links, hi, untreeify_threshold, order),
                        )
                    }
                }
            };
            bins[index] = lo;
            bins[index + old_capacity] = hi;
        }

        self.bins = bins;
    }

    /// Rebuilds every tree bin, e.g. after the placement order changed.
    pub(crate) fn rebuild_trees<K, V>(&mut self, slots: &Slots<'_, K, V>, links: &mut LinkTable, order: Option<KeyOrder<K>>) {
        for bin in self.bins.iter_mut() {
            if let Bin::Tree(tree) = *bin {
                *bin = Bin::Tree(TreeBin::from_list(slots, links, tree.first, order));
            }
        }
    }

    pub(crate) fn stats(&self, links: &LinkTable) -> BinStats {
        let mut stats = BinStats {
            capacity: self.capacity(),
            ..BinStats::default()
        };
        for bin in self.bins.iter() {
            match bin {
                Bin::Empty => stats.empty_bins += 1,
                Bin::Chain(chain) => {
                    stats.len += chain.len;
                    stats.chain_bins += 1;
                    stats.longest_chain = stats.longest_chain.max(chain.len);
                }
                Bin::Tree(tree) => {
                    stats.len += tree.len;
                    stats.tree_bins += 1;
                    stats.largest_tree = stats.largest_tree.max(tree.len);
                    stats.tallest_tree = stats.tallest_tree.max(tree.height(links));
                }
            }
        }
        stats
    }
}
