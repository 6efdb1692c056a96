//! `GhostToken`: the capability that gates access to stored map values.
//!
//! A token is zero-sized and branded with an invariant lifetime. Every
//! [`GhostCell`](crate::GhostCell) created for the same brand can only be read
//! through `&GhostToken<'brand>` and only be written through
//! `&mut GhostToken<'brand>`.
//!
//! ## Linearity
//!
//! `GhostToken<'brand>` is not `Copy`/`Clone`. Any API that hands out `&mut V`
//! takes `&mut GhostToken<'brand>`, and the borrow checker rules out two live
//! mutable borrows of the same token.

use core::marker::PhantomData;

/// Marker that is invariant in `'id`, so brands cannot be shrunk or unified.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InvariantLifetime<'id>(PhantomData<fn(&'id ()) -> &'id ()>);

impl<'id> InvariantLifetime<'id> {
    /// Creates the marker.
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

/// A zero-sized token controlling access to the cells of one brand.
#[derive(Debug)]
pub struct GhostToken<'brand>(InvariantLifetime<'brand>);

impl<'brand> GhostToken<'brand> {
    /// Creates a fresh brand and runs `f` with its token.
    ///
    /// # Example
    ///
    /// ```rust
    /// use binmap::{BrandedBinMap, GhostToken};
    ///
    /// let total = GhostToken::new(|mut token| {
    ///     let mut map = BrandedBinMap::new();
    ///     map.insert("a", 1);
    ///     *map.get_mut(&mut token, "a").unwrap() += 41;
    ///     *map.get(&token, "a").unwrap()
    /// });
    /// assert_eq!(total, 42);
    /// ```
    pub fn new<F, R>(f: F) -> R
    where
        F: for<'new_brand> FnOnce(GhostToken<'new_brand>) -> R,
    {
        f(GhostToken(InvariantLifetime::new()))
    }
}

// SAFETY: the token carries no data. A shared `&GhostToken` only unlocks shared
// reads, which the cells already bound by `T: Sync`; exclusive access still
// needs `&mut GhostToken`, which cannot coexist with shared borrows.
unsafe impl<'brand> Sync for GhostToken<'brand> {}
