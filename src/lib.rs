//! # `binmap` - Bucketed hash map with chain and tree bins
//!
//! A hash map whose bins start out as short chains and turn into red-black
//! trees once a chain reaches the treeify threshold. Stored values are
//! protected by ghost tokens, the same branded capability pattern used across
//! the toolkit.
//!
//! ## Design
//!
//! - **Spread hashing**: the hasher output is folded to 32 bits and its upper
//!   half mixed into the lower one before the bin index is taken from the low
//!   bits.
//! - **Power-of-two table**: `index = (capacity - 1) & hash`. Doubling splits
//!   every bin into a low and a high half on one hash bit.
//! - **Tree bins**: a chain of `treeify_threshold` entries becomes a tree if the
//!   table has at least `min_treeify_capacity` bins, otherwise the table grows.
//!   Trees fall back to chains at `untreeify_threshold` entries or fewer.
//! - **Fallible growth**: [`BrandedBinMap::try_insert`] reports
//!   [`CapacityError`] before mutating anything when the table cannot grow.
//!
//! ## Core Abstractions
//!
//! 1. **Ghost Tokens** (`GhostToken<'brand>`):
//!    - Zero-sized linear capabilities
//!    - Branded with lifetime parameters for type-level separation
//!
//! 2. **Ghost Cells** (`GhostCell<'brand, T>`):
//!    - Safe interior mutability through token gating
//!    - No runtime borrow checking overhead
//!
//! 3. **Branded Bin Map** (`BrandedBinMap<'brand, K, V, S>`):
//!    - Keys are freely readable, values need the token
//!    - `ActiveBinMap` bundles a map with its token for token-free calls
//!
//! ## Example
//!
//! ```rust
//! use binmap::{ActivateBinMap, BinKind, BinMapConfig, BrandedBinMap, GhostToken};
//!
//! GhostToken::new(|mut token| {
//!     let mut map = BrandedBinMap::with_config(BinMapConfig::default()).unwrap();
//!     map.insert("a", 1);
//!     map.insert("b", 2);
//!     assert_eq!(map.insert("a", 3), Some(1));
//!     assert_eq!(map.get(&token, "a"), Some(&3));
//!
//!     let index = map.bin_index("b");
//!     assert!(matches!(map.bin_kind(index), Some(BinKind::Chain(_))));
//!
//!     let mut active = map.activate(&mut token);
//!     *active.get_mut("b").unwrap() += 40;
//!     assert_eq!(active.get("b"), Some(&42));
//! });
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cell;
pub mod collections;
pub mod token;

pub use cell::GhostCell;
pub use collections::hash::{
    ActivateBinMap, ActiveBinMap, BinKind, BinMapConfig, BinStats, BrandedBinMap, CapacityError, ConfigError,
    HashOrder, NaturalOrder, TreeOrder,
};
pub use collections::BrandedCollection;
pub use token::GhostToken;

// Compile-time assertions for memory layout
const _: () = {
    use core::mem;

    // Tokens are ZSTs.
    assert!(mem::size_of::<GhostToken<'static>>() == 0);

    // `GhostCell` is `repr(transparent)` over `UnsafeCell<T>`.
    assert!(mem::size_of::<GhostCell<'static, i32>>() == mem::size_of::<core::cell::UnsafeCell<i32>>());
    assert!(mem::align_of::<GhostCell<'static, i32>>() == mem::align_of::<core::cell::UnsafeCell<i32>>());
};
