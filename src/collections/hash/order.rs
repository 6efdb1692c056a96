//! Placement orders for keys that share a hash inside a tree bin.
//!
//! A map's order is part of its type. [`HashOrder`] maps accept any borrowed
//! lookup key and probe both subtrees on hash ties. [`NaturalOrder`] maps place
//! colliding keys by `Ord`, so lookups require `Q: Ord` and descend one path.

use core::borrow::Borrow;
use core::cmp::Ordering;

/// Ties are broken by insertion order only. This is the default.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HashOrder;

/// Ties are broken by the keys' `Ord` implementation.
///
/// Obtained through [`BrandedBinMap::with_natural_order`](super::BrandedBinMap::with_natural_order).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NaturalOrder;

/// Compares a lookup key against a stored key for tree descent.
pub trait TreeOrder<K, Q: ?Sized> {
    /// Where `key` sorts relative to `stored`, or `None` when the order
    /// cannot tell and both subtrees must be searched.
    fn compare(key: &Q, stored: &K) -> Option<Ordering>;
}

impl<K, Q: ?Sized> TreeOrder<K, Q> for HashOrder {
    #[inline(always)]
    fn compare(_: &Q, _: &K) -> Option<Ordering> {
        None
    }
}

impl<K, Q> TreeOrder<K, Q> for NaturalOrder
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    // `Borrow` requires `Ord` on `Q` to agree with `Ord` on `K`, which is the
    // order entries were placed by.
    #[inline(always)]
    fn compare(key: &Q, stored: &K) -> Option<Ordering> {
        Some(key.cmp(stored.borrow()))
    }
}
