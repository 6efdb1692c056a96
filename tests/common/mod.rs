//! Hashers and keys that let tests aim entries at chosen bins.

#![allow(dead_code)]

use std::hash::{BuildHasher, Hash, Hasher};

/// Hashes integers to themselves. Spreading leaves values below `1 << 16`
/// unchanged, so `key & (capacity - 1)` is the bin index.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityState;

pub struct IdentityHasher(u64);

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

/// A key with an explicit hash, so distinct keys can share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Collide {
    pub hash: u64,
    pub id: u32,
}

impl Collide {
    pub fn new(hash: u64, id: u32) -> Self {
        Self { hash, id }
    }
}

impl Hash for Collide {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}
