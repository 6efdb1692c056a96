//! `BrandedBinMap`: a bucketed hash map with token-gated values.
//!
//! Each bin of the table holds either a short chain of entries or, once a
//! chain grows past the treeify threshold, a red-black tree ordered by hash.
//! Trees bound the cost of adversarial or low-quality hashes to `O(log n)`
//! per bin, chains keep the common case cheap.
//!
//! Key properties:
//! - **Stable entries**: entries live in an arena and are addressed by id, so
//!   growth and bin conversions only relink them.
//! - **Single-bit split**: doubling the table moves each entry either to the
//!   same index or to `index + old_capacity`, decided by one hash bit.
//! - **Hysteresis**: trees go back to chains only at or below the untreeify
//!   threshold, which sits strictly below the treeify threshold.
//! - **Ghost token gating**: values sit in `GhostCell`s, so `get_mut` works
//!   through `&self` given the brand's `&mut GhostToken`.

use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem;
use std::collections::hash_map::RandomState;

use super::chain::ChainBin;
use super::config::BinMapConfig;
use super::entry::{Entry, EntryArena, EntryId, IntoEntries, LinkTable, Slots};
use super::error::{CapacityError, ConfigError};
use super::invariants::{check_table, invariant_assert_msg};
use super::order::{HashOrder, NaturalOrder, TreeOrder};
use super::spread::{bin_index, spread_hash, table_size_for, MAX_CAPACITY};
use super::stats::{BinKind, BinStats};
use super::table::{Bin, Table};
use super::tree::{KeyOrder, TreeBin};
use crate::GhostToken;

/// Hash map with chain and tree bins and token-gated values.
///
/// `O` fixes how keys sharing a hash are placed in tree bins; see
/// [`with_natural_order`](Self::with_natural_order).
pub struct BrandedBinMap<'brand, K, V, S = RandomState, O = HashOrder> {
    table: Table,
    arena: EntryArena<'brand, K, V>,
    config: BinMapConfig,
    /// Entry count above which the table doubles.
    threshold: usize,
    hash_builder: S,
    /// Natural order used to place colliding keys in tree bins. Set exactly
    /// when `O` is `NaturalOrder`.
    key_order: Option<KeyOrder<K>>,
    _order: PhantomData<O>,
}

impl<'brand, K, V> BrandedBinMap<'brand, K, V, RandomState>
where
    K: Eq + Hash,
{
    /// Creates an empty map with the default configuration.
    #[inline]
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    /// Creates an empty map with at least `capacity` bins.
    ///
    /// The bin count is rounded up to a power of two and clamped to
    /// `MAX_CAPACITY`.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }

    /// Creates an empty map from an explicit configuration.
    pub fn with_config(config: BinMapConfig) -> Result<Self, ConfigError> {
        Self::with_config_and_hasher(config, RandomState::new())
    }
}

impl<'brand, K, V, S> BrandedBinMap<'brand, K, V, S> {
    /// Creates an empty map using `hash_builder` to hash keys.
    #[inline]
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::from_parts(BinMapConfig::default(), hash_builder)
    }

    /// Creates an empty map with at least `capacity` bins and the given hasher.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        let config = BinMapConfig::default().with_initial_capacity(capacity.min(MAX_CAPACITY));
        Self::from_parts(config, hash_builder)
    }

    /// Creates an empty map from a configuration and a hasher.
    pub fn with_config_and_hasher(config: BinMapConfig, hash_builder: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(config, hash_builder))
    }

    fn from_parts(config: BinMapConfig, hash_builder: S) -> Self {
        let capacity = table_size_for(config.initial_capacity).min(config.max_capacity);
        Self {
            table: Table::with_capacity(capacity),
            arena: EntryArena::new(),
            threshold: config.threshold_for(capacity),
            config,
            hash_builder,
            key_order: None,
            _order: PhantomData,
        }
    }

    /// Places colliding keys of tree bins by their natural order.
    ///
    /// Lookups then descend a single path even when many keys share a hash,
    /// at the cost of requiring `Q: Ord` for borrowed lookup keys. Existing
    /// tree bins are rebuilt.
    pub fn with_natural_order(self) -> BrandedBinMap<'brand, K, V, S, NaturalOrder>
    where
        K: Ord,
    {
        let order: KeyOrder<K> = Ord::cmp;
        let mut map = BrandedBinMap {
            table: self.table,
            arena: self.arena,
            config: self.config,
            threshold: self.threshold,
            hash_builder: self.hash_builder,
            key_order: Some(order),
            _order: PhantomData,
        };
        map.table.rebuild_trees(&map.arena.slots, &mut map.arena.links, map.key_order);
        map
    }
}

impl<'brand, K, V, S, O> BrandedBinMap<'brand, K, V, S, O> {

    /// Returns the number of entries.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Returns `true` if the map holds no entries.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }

    /// Number of bins in the table.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// The configuration the map was built with.
    #[inline]
    pub fn config(&self) -> &BinMapConfig {
        &self.config
    }

    /// The map's hasher.
    #[inline]
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Removes every entry. The table keeps its capacity.
    pub fn clear(&mut self) {
        self.table.clear();
        self.arena.clear();
    }

    /// Iterates over key-value pairs, bin by bin in table order.
    #[inline]
    pub fn iter<'a>(&'a self, token: &'a GhostToken<'brand>) -> Iter<'a, 'brand, K, V> {
        Iter {
            raw: self.raw_iter(),
            slots: &self.arena.slots,
            token,
        }
    }

    /// Iterates over keys in table order. Keys are not token-gated.
    #[inline]
    pub fn keys(&self) -> Keys<'_, 'brand, K, V> {
        Keys {
            raw: self.raw_iter(),
            slots: &self.arena.slots,
        }
    }

    /// Iterates over values in table order.
    #[inline]
    pub fn values<'a>(&'a self, token: &'a GhostToken<'brand>) -> Values<'a, 'brand, K, V> {
        Values {
            raw: self.raw_iter(),
            slots: &self.arena.slots,
            token,
        }
    }

    /// Applies `f` to every entry with mutable access to its value.
    pub fn for_each_mut<F>(&self, token: &mut GhostToken<'brand>, mut f: F)
    where
        F: FnMut(&K, &mut V),
    {
        for id in self.raw_iter() {
            let entry = &self.arena.slots[id];
            f(&entry.key, entry.value.borrow_mut(token));
        }
    }

    /// Applies `f` to every value mutably.
    pub fn for_each_value_mut<F>(&self, token: &mut GhostToken<'brand>, mut f: F)
    where
        F: FnMut(&mut V),
    {
        self.for_each_mut(token, |_, value| f(value));
    }

    /// Census of the bin layout.
    pub fn stats(&self) -> BinStats {
        self.table.stats(&self.arena.links)
    }

    /// Representation of the bin at `index`, or `None` past the end of the table.
    pub fn bin_kind(&self, index: usize) -> Option<BinKind> {
        self.table.bins().get(index).map(Bin::kind)
    }

    /// Walks the whole table and reports the first broken structural invariant.
    pub fn check_invariants(&self) -> Result<(), String> {
        check_table(&self.table, &self.arena)
    }

    /// Asserts the structural invariants in debug builds.
    pub fn validate_invariants(&self) {
        if cfg!(debug_assertions) {
            invariant_assert_msg(self.check_invariants());
        }
    }

    /// Iterates over values in parallel.
    #[cfg(feature = "parallel")]
    pub fn par_values<'a>(
        &'a self,
        token: &'a GhostToken<'brand>,
    ) -> impl rayon::iter::ParallelIterator<Item = &'a V> + use<'a, 'brand, K, V, S, O>
    where
        K: Sync,
        V: Send + Sync,
    {
        use rayon::iter::ParallelIterator;

        self.arena.slots.par_occupied().map(move |entry| entry.value.borrow(token))
    }

    #[inline]
    fn raw_iter(&self) -> RawIter<'_> {
        RawIter {
            bins: self.table.bins(),
            links: &self.arena.links,
            cur: None,
            remaining: self.arena.len(),
        }
    }

    /// Fails when holding `required` entries would need a table larger than
    /// `max_capacity`.
    #[inline]
    fn check_room(&self, required: usize) -> Result<(), CapacityError> {
        if required > self.config.threshold_for(self.config.max_capacity) {
            return Err(CapacityError {
                required,
                max_capacity: self.config.max_capacity,
            });
        }
        Ok(())
    }

    fn grow(&mut self) {
        self.table.grow(
            &self.arena.slots,
            &mut self.arena.links,
            self.config.untreeify_threshold,
            self.key_order,
        );
        self.threshold = self.config.threshold_for(self.table.capacity());
        #[cfg(feature = "tracing")]
        tracing::debug!(capacity = self.table.capacity(), len = self.arena.len(), "grew bin table");
    }

    /// Links a freshly allocated entry into its bin, then converts or grows.
    fn link_new(&mut self, id: EntryId) {
        let index = self.table.index(self.arena.slots[id].hash);
        let bin = match self.table.bin(index) {
            Bin::Empty => Bin::Chain(ChainBin::single(&mut self.arena.links, id)),
            Bin::Chain(mut chain) => {
                chain.push_back(&mut self.arena.links, id);
                Bin::Chain(chain)
            }
            Bin::Tree(mut tree) => {
                tree.insert(&self.arena.slots, &mut self.arena.links, id, self.key_order);
                Bin::Tree(tree)
            }
        };
        self.table.set(index, bin);

        if let Bin::Chain(chain) = bin {
            if chain.len >= self.config.treeify_threshold {
                self.treeify_or_grow(index);
            }
        }
        while self.arena.len() > self.threshold && self.table.capacity() < self.config.max_capacity {
            self.grow();
        }
    }

    /// Converts the chain at `index` into a tree, or doubles the table instead
    /// while it is below `min_treeify_capacity`.
    fn treeify_or_grow(&mut self, index: usize) {
        // A validated config keeps `min_treeify_capacity <= max_capacity`.
        if self.table.capacity() < self.config.min_treeify_capacity {
            self.grow();
            return;
        }
        if let Bin::Chain(chain) = self.table.bin(index) {
            let tree = TreeBin::from_list(&self.arena.slots, &mut self.arena.links, chain.head, self.key_order);
            #[cfg(feature = "tracing")]
            tracing::debug!(index, len = tree.len, "treeified bin");
            self.table.set(index, Bin::Tree(tree));
        }
    }

    /// Unlinks `id` from the bin at `index`, turning a shrunken tree back into
    /// a chain. The entry itself stays allocated.
    fn detach(&mut self, index: usize, id: EntryId) {
        let links = &mut self.arena.links;
        let bin = match self.table.bin(index) {
            Bin::Empty => Bin::Empty,
            Bin::Chain(mut chain) => {
                chain.unlink(links, id);
                if chain.len == 0 {
                    Bin::Empty
                } else {
                    Bin::Chain(chain)
                }
            }
            Bin::Tree(tree) => match tree.remove(links, id) {
                None => Bin::Empty,
                Some(tree) if tree.len <= self.config.untreeify_threshold => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(index, len = tree.len, "untreeified bin");
                    Bin::Chain(tree.untreeify(links))
                }
                Some(tree) => Bin::Tree(tree),
            },
        };
        self.table.set(index, bin);
    }

    /// Removes every entry for which `f` returns `false`.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut doomed = Vec::new();
        for (index, bin) in self.table.bins().iter().enumerate() {
            let mut cur = bin.head();
            while let Some(id) = cur {
                cur = self.arena.links[id].next;
                let Entry { key, value, .. } = &mut self.arena.slots[id];
                if !f(key, value.get_mut()) {
                    doomed.push((index, id));
                }
            }
        }
        for (index, id) in doomed {
            self.detach(index, id);
            self.arena.free(id);
        }
    }
}

impl<'brand, K, V, S, O> BrandedBinMap<'brand, K, V, S, O>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Finds the bin index and entry id of `key`.
    #[inline]
    fn locate<Q>(&self, key: &Q) -> Option<(usize, EntryId)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        O: TreeOrder<K, Q>,
    {
        if self.is_empty() {
            return None;
        }
        let hash = spread_hash(&self.hash_builder, key);
        let index = self.table.index(hash);
        let id = self.table.bin(index).find_by(
            &self.arena.slots,
            &self.arena.links,
            hash,
            key,
            &|stored: &K| O::compare(key, stored),
        )?;
        Some((index, id))
    }

    #[inline]
    fn find_owned(&self, hash: u32, key: &K) -> Option<EntryId> {
        let bin = self.table.bin(self.table.index(hash));
        bin.find_owned(&self.arena.slots, &self.arena.links, hash, key, self.key_order)
    }

    /// Bin index `key` maps to in the current table.
    #[inline]
    pub fn bin_index<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
    {
        bin_index(spread_hash(&self.hash_builder, key), self.table.capacity())
    }

    /// Returns `true` if the map holds `key`.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        O: TreeOrder<K, Q>,
    {
        self.locate(key).is_some()
    }

    /// Returns a shared reference to the value stored for `key`.
    #[inline]
    pub fn get<'a, Q>(&'a self, token: &'a GhostToken<'brand>, key: &Q) -> Option<&'a V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        O: TreeOrder<K, Q>,
    {
        let (_, id) = self.locate(key)?;
        Some(self.arena.slots[id].value.borrow(token))
    }

    /// Returns a mutable reference to the value stored for `key`.
    #[inline]
    pub fn get_mut<'a, Q>(&'a self, token: &'a mut GhostToken<'brand>, key: &Q) -> Option<&'a mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        O: TreeOrder<K, Q>,
    {
        let (_, id) = self.locate(key)?;
        Some(self.arena.slots[id].value.borrow_mut(token))
    }

    /// Returns the stored key and value for `key`.
    pub fn get_key_value<'a, Q>(&'a self, token: &'a GhostToken<'brand>, key: &Q) -> Option<(&'a K, &'a V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        O: TreeOrder<K, Q>,
    {
        let (_, id) = self.locate(key)?;
        let entry = &self.arena.slots[id];
        Some((&entry.key, entry.value.borrow(token)))
    }

    /// Inserts a key-value pair, returning the previous value for `key`.
    ///
    /// Replacing an existing key never fails. Adding a new key fails with
    /// [`CapacityError`] when the table is already as large as
    /// `max_capacity` allows and full; the map is left untouched.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>, CapacityError> {
        let hash = spread_hash(&self.hash_builder, &key);
        if let Some(id) = self.find_owned(hash, &key) {
            let slot = self.arena.slots[id].value.get_mut();
            return Ok(Some(mem::replace(slot, value)));
        }
        self.check_room(self.len() + 1)?;
        let id = self.arena.alloc(hash, key, value)?;
        self.link_new(id);
        Ok(None)
    }

    /// Inserts a key-value pair, returning the previous value for `key`.
    ///
    /// # Panics
    ///
    /// Panics if the map cannot grow to hold a new key. See
    /// [`try_insert`](Self::try_insert).
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.try_insert(key, value) {
            Ok(previous) => previous,
            Err(err) => panic!("{err}"),
        }
    }

    /// Returns the value for `key`, inserting `f()` first if it is absent.
    pub fn get_or_insert_with<F>(&mut self, key: K, f: F) -> Result<&mut V, CapacityError>
    where
        F: FnOnce() -> V,
    {
        let hash = spread_hash(&self.hash_builder, &key);
        let id = match self.find_owned(hash, &key) {
            Some(id) => id,
            None => {
                self.check_room(self.len() + 1)?;
                let id = self.arena.alloc(hash, key, f())?;
                self.link_new(id);
                id
            }
        };
        Ok(self.arena.slots[id].value.get_mut())
    }

    /// Removes `key`, returning its value.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        O: TreeOrder<K, Q>,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes `key`, returning the stored key and its value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        O: TreeOrder<K, Q>,
    {
        let (index, id) = self.locate(key)?;
        self.detach(index, id);
        let entry = self.arena.free(id);
        Some((entry.key, entry.value.into_inner()))
    }

    /// Grows the table so `additional` more entries fit without resizing.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), CapacityError> {
        let required = self.len().checked_add(additional).ok_or(CapacityError {
            required: usize::MAX,
            max_capacity: self.config.max_capacity,
        })?;
        self.check_room(required)?;
        while self.threshold < required && self.table.capacity() < self.config.max_capacity {
            self.grow();
        }
        Ok(())
    }

    /// Grows the table so `additional` more entries fit without resizing.
    ///
    /// # Panics
    ///
    /// Panics if that would exceed `max_capacity`.
    pub fn reserve(&mut self, additional: usize) {
        if let Err(err) = self.try_reserve(additional) {
            panic!("{err}");
        }
    }
}

// ===== ITERATORS =====

/// Walks bins in table order and each bin's list in list order.
struct RawIter<'a> {
    bins: &'a [Bin],
    links: &'a LinkTable,
    cur: Option<EntryId>,
    remaining: usize,
}

impl Iterator for RawIter<'_> {
    type Item = EntryId;

    #[inline]
    fn next(&mut self) -> Option<EntryId> {
        loop {
            if let Some(id) = self.cur {
                self.cur = self.links[id].next;
                self.remaining -= 1;
                return Some(id);
            }
            let (bin, rest) = self.bins.split_first()?;
            self.bins = rest;
            self.cur = bin.head();
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Iterator over `(&K, &V)` pairs of a [`BrandedBinMap`].
pub struct Iter<'a, 'brand, K, V> {
    raw: RawIter<'a>,
    slots: &'a Slots<'brand, K, V>,
    token: &'a GhostToken<'brand>,
}

impl<'a, 'brand, K, V> Iterator for Iter<'a, 'brand, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let id = self.raw.next()?;
        let slots = self.slots;
        let entry = &slots[id];
        Some((&entry.key, entry.value.borrow(self.token)))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, '_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, '_, K, V> {}

/// Iterator over the keys of a [`BrandedBinMap`].
pub struct Keys<'a, 'brand, K, V> {
    raw: RawIter<'a>,
    slots: &'a Slots<'brand, K, V>,
}

impl<'a, 'brand, K, V> Iterator for Keys<'a, 'brand, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<&'a K> {
        let id = self.raw.next()?;
        let slots = self.slots;
        Some(&slots[id].key)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, '_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, '_, K, V> {}

/// Iterator over the values of a [`BrandedBinMap`].
pub struct Values<'a, 'brand, K, V> {
    raw: RawIter<'a>,
    slots: &'a Slots<'brand, K, V>,
    token: &'a GhostToken<'brand>,
}

impl<'a, 'brand, K, V> Iterator for Values<'a, 'brand, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        let id = self.raw.next()?;
        let slots = self.slots;
        Some(slots[id].value.borrow(self.token))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, '_, K, V> {}
impl<K, V> FusedIterator for Values<'_, '_, K, V> {}

/// Consuming iterator for [`BrandedBinMap`], in allocation order.
pub struct IntoIter<'brand, K, V> {
    entries: IntoEntries<'brand, K, V>,
}

impl<'brand, K, V> Iterator for IntoIter<'brand, K, V> {
    type Item = (K, V);

    #[inline]
    fn next(&mut self) -> Option<(K, V)> {
        self.entries
            .next()
            .map(|entry| (entry.key, entry.value.into_inner()))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<'_, K, V> {}
impl<K, V> FusedIterator for IntoIter<'_, K, V> {}

// ===== TRAIT IMPLEMENTATIONS =====

impl<'brand, K, V, S, O> crate::collections::BrandedCollection<'brand> for BrandedBinMap<'brand, K, V, S, O> {
    #[inline(always)]
    fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }

    #[inline(always)]
    fn len(&self) -> usize {
        self.arena.len()
    }
}

impl<'brand, K, V, S> Default for BrandedBinMap<'brand, K, V, S>
where
    S: Default,
{
    #[inline]
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<'brand, K, V, S, O> fmt::Debug for BrandedBinMap<'brand, K, V, S, O>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Values need a token, so only keys are shown.
        f.debug_struct("BrandedBinMap")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<'brand, K, V, S, O> IntoIterator for BrandedBinMap<'brand, K, V, S, O> {
    type Item = (K, V);
    type IntoIter = IntoIter<'brand, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            entries: self.arena.into_entries(),
        }
    }
}

impl<'brand, K, V, S> FromIterator<(K, V)> for BrandedBinMap<'brand, K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

impl<'brand, K, V, S, O> Extend<(K, V)> for BrandedBinMap<'brand, K, V, S, O>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        // The hint may count duplicates, so a failed reservation is not fatal.
        let _ = self.try_reserve(lower);

        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::hash::Hasher;

    /// Hashes integers to themselves so tests can aim keys at bins.
    #[derive(Debug, Default, Clone, Copy)]
    struct IdentityState;

    struct IdentityHasher(u64);

    impl Hasher for IdentityHasher {
        fn finish(&self) -> u64 {
            self.0
        }

        fn write(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.0 = (self.0 << 8) | u64::from(b);
            }
        }

        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
    }

    impl BuildHasher for IdentityState {
        type Hasher = IdentityHasher;

        fn build_hasher(&self) -> IdentityHasher {
            IdentityHasher(0)
        }
    }

    /// Ordered key whose hash is the same for every instance.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    struct Collide(u32);

    impl Hash for Collide {
        fn hash<H: Hasher>(&self, state: &mut H) {
            state.write_u64(7);
        }
    }

    fn identity_map<'brand>(config: BinMapConfig) -> BrandedBinMap<'brand, u64, u64, IdentityState> {
        BrandedBinMap::with_config_and_hasher(config, IdentityState).unwrap()
    }

    /// Keys that land in bin 5 for every capacity up to 64.
    fn bin5(k: u64) -> u64 {
        k * 64 + 5
    }

    #[test]
    fn put_replaces_and_reports_previous() {
        GhostToken::new(|token| {
            let mut map = BrandedBinMap::new();
            assert_eq!(map.insert("a", 1), None);
            assert_eq!(map.insert("b", 2), None);
            assert_eq!(map.insert("a", 3), Some(1));
            assert_eq!(map.len(), 2);
            assert_eq!(map.get(&token, "a"), Some(&3));
            assert_eq!(map.get(&token, "b"), Some(&2));
            assert_eq!(map.get(&token, "c"), None);
            map.validate_invariants();
        });
    }

    #[test]
    fn grows_when_load_exceeded() {
        GhostToken::new(|token| {
            let mut map = identity_map(BinMapConfig::default());
            for k in 0..12u64 {
                map.insert(k, k * 10);
            }
            assert_eq!(map.capacity(), 16);
            map.insert(12, 120);
            assert_eq!(map.capacity(), 32);
            for k in 0..13u64 {
                assert_eq!(map.get(&token, &k), Some(&(k * 10)));
            }
            map.check_invariants().unwrap();
        });
    }

    #[test]
    fn remove_missing_is_none() {
        let mut map: BrandedBinMap<'_, &str, i32> = BrandedBinMap::new();
        assert_eq!(map.remove("x"), None);
        map.insert("x", 1);
        assert_eq!(map.remove_entry("x"), Some(("x", 1)));
        assert_eq!(map.remove("x"), None);
        assert!(map.is_empty());
    }

    #[test]
    fn treeifies_then_untreeifies_with_hysteresis() {
        GhostToken::new(|token| {
            let mut map = identity_map(BinMapConfig::default().with_initial_capacity(64));
            for k in 0..7 {
                map.insert(bin5(k), k);
            }
            assert_eq!(map.bin_kind(5), Some(BinKind::Chain(7)));
            map.insert(bin5(7), 7);
            assert_eq!(map.bin_kind(5), Some(BinKind::Tree(8)));
            assert_eq!(map.capacity(), 64);
            map.check_invariants().unwrap();

            assert_eq!(map.remove(&bin5(0)), Some(0));
            assert_eq!(map.bin_kind(5), Some(BinKind::Tree(7)));
            assert_eq!(map.remove(&bin5(1)), Some(1));
            assert_eq!(map.bin_kind(5), Some(BinKind::Chain(6)));
            for k in 2..8 {
                assert_eq!(map.get(&token, &bin5(k)), Some(&k));
            }
            map.check_invariants().unwrap();
        });
    }

    #[test]
    fn small_table_grows_instead_of_treeifying() {
        let mut map = identity_map(BinMapConfig::default());
        for k in 0..8 {
            map.insert(bin5(k), k);
        }
        assert_eq!(map.capacity(), 32);
        assert_eq!(map.bin_kind(5), Some(BinKind::Chain(8)));

        map.insert(bin5(8), 8);
        assert_eq!(map.capacity(), 64);
        assert_eq!(map.bin_kind(5), Some(BinKind::Chain(9)));

        map.insert(bin5(9), 9);
        assert_eq!(map.bin_kind(5), Some(BinKind::Tree(10)));
        map.check_invariants().unwrap();
    }

    #[test]
    fn capacity_error_leaves_map_untouched() {
        GhostToken::new(|token| {
            let config = BinMapConfig::default().with_max_capacity(32).with_min_treeify_capacity(32);
            let mut map = identity_map(config);
            for k in 0..24u64 {
                assert_eq!(map.try_insert(k, k), Ok(None));
            }
            assert_eq!(map.capacity(), 32);
            assert_eq!(
                map.try_insert(24, 24),
                Err(CapacityError { required: 25, max_capacity: 32 })
            );
            assert_eq!(map.len(), 24);
            assert!(!map.contains_key(&24));

            // Replacing still works at the limit.
            assert_eq!(map.try_insert(3, 300), Ok(Some(3)));
            assert_eq!(map.get(&token, &3), Some(&300));
            assert!(map.try_reserve(1).is_err());
            assert_eq!(map.try_reserve(0), Ok(()));
            assert!(map.get_or_insert_with(99, || 0).is_err());
            map.check_invariants().unwrap();
        });
    }

    #[test]
    fn reserve_grows_ahead_of_inserts() {
        let mut map = identity_map(BinMapConfig::default());
        map.reserve(100);
        assert_eq!(map.capacity(), 256);
        let before = map.capacity();
        for k in 0..100 {
            map.insert(k, k);
        }
        assert_eq!(map.capacity(), before);
        assert_eq!(
            map.try_reserve(usize::MAX),
            Err(CapacityError {
                required: usize::MAX,
                max_capacity: MAX_CAPACITY
            })
        );
    }

    #[test]
    fn get_or_insert_with_runs_once() {
        GhostToken::new(|token| {
            let mut map = BrandedBinMap::new();
            let mut calls = 0;
            for _ in 0..3 {
                *map.get_or_insert_with("hits", || {
                    calls += 1;
                    0
                })
                .unwrap() += 1;
            }
            assert_eq!(calls, 1);
            assert_eq!(map.get(&token, "hits"), Some(&3));
        });
    }

    #[test]
    fn get_mut_and_for_each_mut_need_the_token() {
        GhostToken::new(|mut token| {
            let map: BrandedBinMap<'_, &str, i32> = [("a", 1), ("b", 2)].into_iter().collect();
            *map.get_mut(&mut token, "a").unwrap() += 10;
            map.for_each_mut(&mut token, |_, v| *v *= 2);
            map.for_each_value_mut(&mut token, |v| *v += 1);
            assert_eq!(map.get_key_value(&token, "a"), Some((&"a", &23)));
            assert_eq!(map.get(&token, "b"), Some(&5));
        });
    }

    #[test]
    fn retain_drops_entries_across_bin_kinds() {
        GhostToken::new(|token| {
            let mut map = identity_map(BinMapConfig::default().with_initial_capacity(64));
            for k in 0..12 {
                map.insert(bin5(k), k);
                map.insert(k * 64 + 9, k);
            }
            assert_eq!(map.bin_kind(5), Some(BinKind::Tree(12)));

            map.retain(|_, v| {
                *v += 100;
                *v % 2 == 0
            });
            assert_eq!(map.len(), 12);
            assert_eq!(map.bin_kind(5), Some(BinKind::Chain(6)));
            assert_eq!(map.get(&token, &bin5(4)), Some(&104));
            assert_eq!(map.get(&token, &bin5(5)), None);
            map.check_invariants().unwrap();
        });
    }

    #[test]
    fn iteration_follows_table_order() {
        GhostToken::new(|token| {
            let mut map = identity_map(BinMapConfig::default());
            map.insert(17, 1);
            map.insert(1, 2);
            map.insert(3, 3);
            let iter = map.iter(&token);
            assert_eq!(iter.len(), 3);
            let pairs: Vec<_> = iter.map(|(k, v)| (*k, *v)).collect();
            assert_eq!(pairs, vec![(17, 1), (1, 2), (3, 3)]);
            assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![17, 1, 3]);
            assert_eq!(map.values(&token).sum::<u64>(), 6);
        });
    }

    #[test]
    fn into_iter_yields_everything() {
        let mut map = identity_map(BinMapConfig::default());
        for k in 0..40 {
            map.insert(k, k + 1);
        }
        map.remove(&7);
        let mut pairs: Vec<_> = map.into_iter().collect();
        pairs.sort_unstable();
        assert_eq!(pairs.len(), 39);
        assert!(pairs.iter().all(|&(k, v)| v == k + 1 && k != 7));
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut map = identity_map(BinMapConfig::default());
        for k in 0..100 {
            map.insert(k, k);
        }
        let capacity = map.capacity();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.capacity(), capacity);
        assert_eq!(map.stats().empty_bins, capacity);
        map.insert(1, 1);
        map.check_invariants().unwrap();
    }

    #[test]
    fn natural_order_rebuilds_existing_trees() {
        GhostToken::new(|token| {
            let config = BinMapConfig::default().with_initial_capacity(64);
            let mut map: BrandedBinMap<'_, Collide, u32, IdentityState> =
                BrandedBinMap::with_config_and_hasher(config, IdentityState).unwrap();
            for k in (0..20).rev() {
                map.insert(Collide(k), k);
            }
            assert_eq!(map.bin_kind(7), Some(BinKind::Tree(20)));

            let mut map = map.with_natural_order();
            map.check_invariants().unwrap();
            for k in 20..40 {
                assert_eq!(map.insert(Collide(k), k), None);
            }
            assert_eq!(map.insert(Collide(3), 33), Some(3));
            for k in 0..40 {
                assert!(map.contains_key(&Collide(k)));
            }
            assert_eq!(map.get(&token, &Collide(3)), Some(&33));
            map.check_invariants().unwrap();
        });
    }

    #[test]
    fn stats_and_debug_describe_layout() {
        let mut map = identity_map(BinMapConfig::default().with_initial_capacity(64));
        for k in 0..9 {
            map.insert(bin5(k), k);
        }
        map.insert(6, 0);
        let stats = map.stats();
        assert_eq!(stats.capacity, 64);
        assert_eq!(stats.len, 10);
        assert_eq!((stats.chain_bins, stats.tree_bins), (1, 1));
        assert_eq!(stats.largest_tree, 9);
        assert_eq!(stats.longest_chain, 1);
        assert!(stats.tallest_tree >= 4);

        let small: BrandedBinMap<'_, u64, u64, IdentityState> = [(1, 1)].into_iter().collect();
        assert_eq!(
            format!("{small:?}"),
            "BrandedBinMap { len: 1, capacity: 16, keys: [1], .. }"
        );
    }

    #[test]
    fn bin_index_matches_spread_hash() {
        let map = identity_map(BinMapConfig::default());
        assert_eq!(map.bin_index(&17), 1);
        assert_eq!(map.bin_index(&(1u64 << 16)), 1);
        assert_eq!(map.bin_kind(16), None);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn par_values_sees_every_value() {
        use rayon::iter::ParallelIterator;

        GhostToken::new(|token| {
            let map: BrandedBinMap<'_, u32, u64> = (0..1000u32).map(|i| (i, u64::from(i))).collect();
            let sum: u64 = map.par_values(&token).sum();
            assert_eq!(sum, 999 * 1000 / 2);
        });
    }

    #[test]
    fn rejects_invalid_config() {
        let config = BinMapConfig::default().with_tree_thresholds(4, 5);
        assert!(matches!(
            BrandedBinMap::<u64, u64>::with_config(config),
            Err(ConfigError::ThresholdsOverlap { .. })
        ));
    }
}
