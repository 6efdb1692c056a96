//! Hash-based collections optimized for Ghost-style usage.
//!
//! [`BrandedBinMap`] stores entries in a power-of-two table of bins. A bin is
//! a short chain until it reaches the treeify threshold, then a red-black tree;
//! the table doubles once the load factor is exceeded.

pub mod active;
pub mod bin_map;
mod chain;
pub mod config;
mod entry;
pub mod error;
mod invariants;
pub mod order;
pub mod spread;
pub mod stats;
mod table;
mod tree;

pub use active::{ActivateBinMap, ActiveBinMap};
pub use bin_map::BrandedBinMap;
pub use config::BinMapConfig;
pub use error::{CapacityError, ConfigError};
pub use order::{HashOrder, NaturalOrder, TreeOrder};
pub use stats::{BinKind, BinStats};
