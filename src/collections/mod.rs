//! Collections optimized for Ghost-style usage.
//!
//! - `hash`: the bucketed hash map and its token-bundling wrapper.

pub mod hash;

pub use hash::{ActivateBinMap, ActiveBinMap, BrandedBinMap};

/// Common surface of the branded collections.
pub trait BrandedCollection<'brand> {
    /// Returns `true` if the collection holds no elements.
    fn is_empty(&self) -> bool;

    /// Number of elements.
    fn len(&self) -> usize;
}
