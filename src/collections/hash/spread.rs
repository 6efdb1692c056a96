//! Hash spreading and bin indexing.
//!
//! Bin indices only use the low `log2(capacity)` bits of a hash. Folding the
//! high half of the hasher output down and then mixing bits 16..32 into the low
//! half keeps keys that differ only in their upper bits from piling into one
//! bin.

use core::hash::{BuildHasher, Hash, Hasher};

/// Largest table the map will grow to. Bit 30 is the highest bit a 32-bit spread
/// hash can contribute to an index while doubling stays within `u32`.
pub const MAX_CAPACITY: usize = 1 << 30;

/// Smallest table the map allocates.
pub const MIN_CAPACITY: usize = 16;

/// Mixes the high-order bits of a 64-bit hasher output into the low 32 bits.
#[inline(always)]
pub fn spread(raw: u64) -> u32 {
    let h = (raw ^ (raw >> 32)) as u32;
    h ^ (h >> 16)
}

/// Hashes `key` with `hash_builder` and spreads the result.
#[inline]
pub fn spread_hash<Q, S>(hash_builder: &S, key: &Q) -> u32
where
    Q: Hash + ?Sized,
    S: BuildHasher,
{
    let mut hasher = hash_builder.build_hasher();
    key.hash(&mut hasher);
    spread(hasher.finish())
}

/// Bin index of `hash` in a table of `capacity` bins.
///
/// `capacity` must be a power of two, so the mask is equivalent to a modulo.
#[inline(always)]
pub fn bin_index(hash: u32, capacity: usize) -> usize {
    debug_assert!(capacity.is_power_of_two());
    (capacity - 1) & hash as usize
}

/// Rounds a requested capacity up to the table size actually allocated.
#[inline]
pub fn table_size_for(requested: usize) -> usize {
    requested
        .max(MIN_CAPACITY)
        .checked_next_power_of_two()
        .unwrap_or(MAX_CAPACITY)
        .min(MAX_CAPACITY)
}
