//! `ActiveBinMap`: a BrandedBinMap bundled with its GhostToken.
//!
//! Holding the token exclusively lets the wrapper expose a plain
//! `put`/`get`/`remove` surface without threading the token through every call.

use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};

use super::bin_map::{BrandedBinMap, Iter, Keys, Values};
use super::error::CapacityError;
use super::order::{HashOrder, TreeOrder};
use super::stats::BinStats;
use crate::GhostToken;

/// A mutable map reference paired with a mutable reference to its token.
pub struct ActiveBinMap<'a, 'brand, K, V, S, O = HashOrder> {
    map: &'a mut BrandedBinMap<'brand, K, V, S, O>,
    token: &'a mut GhostToken<'brand>,
}

impl<'a, 'brand, K, V, S, O> ActiveBinMap<'a, 'brand, K, V, S, O>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Creates a new active map handle.
    pub fn new(map: &'a mut BrandedBinMap<'brand, K, V, S, O>, token: &'a mut GhostToken<'brand>) -> Self {
        Self { map, token }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of bins in the table.
    pub fn capacity(&self) -> usize {
        self.map.capacity()
    }

    /// Clears the map.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Returns a shared reference to the value stored for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        O: TreeOrder<K, Q>,
    {
        self.map.get(self.token, key)
    }

    /// Returns a mutable reference to the value stored for `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        O: TreeOrder<K, Q>,
    {
        self.map.get_mut(self.token, key)
    }

    /// Returns true if the map contains a value for `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        O: TreeOrder<K, Q>,
    {
        self.map.contains_key(key)
    }

    /// Inserts a key-value pair, returning the previous value.
    ///
    /// # Panics
    ///
    /// Panics when the map cannot grow. See [`try_put`](Self::try_put).
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        self.map.insert(key, value)
    }

    /// Fallible twin of [`put`](Self::put).
    pub fn try_put(&mut self, key: K, value: V) -> Result<Option<V>, CapacityError> {
        self.map.try_insert(key, value)
    }

    /// Returns the value for `key`, inserting `f()` first if it is absent.
    pub fn get_or_insert_with<F>(&mut self, key: K, f: F) -> Result<&mut V, CapacityError>
    where
        F: FnOnce() -> V,
    {
        self.map.get_or_insert_with(key, f)
    }

    /// Removes `key`, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        O: TreeOrder<K, Q>,
    {
        self.map.remove(key)
    }

    /// Reserves room for `additional` more entries.
    pub fn reserve(&mut self, additional: usize) {
        self.map.reserve(additional);
    }

    /// Iterates over keys.
    pub fn keys(&self) -> Keys<'_, 'brand, K, V> {
        self.map.keys()
    }

    /// Iterates over values.
    pub fn values(&self) -> Values<'_, 'brand, K, V> {
        self.map.values(self.token)
    }

    /// Iterates over key-value pairs.
    pub fn iter(&self) -> Iter<'_, 'brand, K, V> {
        self.map.iter(self.token)
    }

    /// Iterates over entries mutably.
    ///
    /// A mutable iterator would have to hand out `&mut V` tied to one token
    /// borrow per item, which `Iterator` cannot express, so this is a visitor.
    pub fn for_each_mut<F>(&mut self, f: F)
    where
        F: FnMut(&K, &mut V),
    {
        self.map.for_each_mut(self.token, f)
    }

    /// Census of the bin layout.
    pub fn stats(&self) -> BinStats {
        self.map.stats()
    }
}

/// Extension trait to create an [`ActiveBinMap`] from a [`BrandedBinMap`].
pub trait ActivateBinMap<'brand, K, V, S, O = HashOrder> {
    /// Activates the map with the given token, returning a handle that bundles them.
    fn activate<'a>(&'a mut self, token: &'a mut GhostToken<'brand>) -> ActiveBinMap<'a, 'brand, K, V, S, O>;
}

impl<'brand, K, V, S, O> ActivateBinMap<'brand, K, V, S, O> for BrandedBinMap<'brand, K, V, S, O>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn activate<'a>(&'a mut self, token: &'a mut GhostToken<'brand>) -> ActiveBinMap<'a, 'brand, K, V, S, O> {
        ActiveBinMap::new(self, token)
    }
}
