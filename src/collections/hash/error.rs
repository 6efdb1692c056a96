//! Error types for the bin map.

use core::fmt;

/// The table cannot grow far enough to hold another entry.
///
/// Returned before any mutation happens, so the map is left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityError {
    /// Number of entries the operation needed room for.
    pub required: usize,
    /// Largest table the map is allowed to allocate.
    pub max_capacity: usize,
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bin map capacity exhausted: {} entries do not fit in {} bins",
            self.required, self.max_capacity
        )
    }
}

impl std::error::Error for CapacityError {}

/// A rejected [`BinMapConfig`](super::BinMapConfig).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// The load factor must be finite and strictly positive.
    InvalidLoadFactor(f32),
    /// Trees need at least two entries to be worth building.
    TreeifyThresholdTooSmall(usize),
    /// The untreeify threshold must sit strictly below the treeify threshold.
    ThresholdsOverlap {
        /// Chain length that triggers treeification.
        treeify: usize,
        /// Tree size that triggers conversion back to a chain.
        untreeify: usize,
    },
    /// The maximum capacity must be a power of two between `MIN_CAPACITY` and
    /// `MAX_CAPACITY`.
    InvalidMaxCapacity(usize),
    /// Tables could never grow large enough to treeify, so chains would grow
    /// without bound.
    MinTreeifyCapacityTooLarge {
        /// Configured minimum capacity for treeification.
        min_treeify: usize,
        /// Configured maximum capacity.
        max: usize,
    },
    /// The initial capacity rounds up past the maximum capacity.
    InitialCapacityTooLarge {
        /// Requested initial capacity.
        initial: usize,
        /// Configured maximum capacity.
        max: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::InvalidLoadFactor(lf) => write!(f, "load factor must be positive and finite, got {lf}"),
            Self::TreeifyThresholdTooSmall(t) => write!(f, "treeify threshold must be at least 2, got {t}"),
            Self::ThresholdsOverlap { treeify, untreeify } => write!(
                f,
                "untreeify threshold {untreeify} must be below treeify threshold {treeify}"
            ),
            Self::InvalidMaxCapacity(max) => {
                write!(f, "max capacity must be a power of two between 16 and 2^30, got {max}")
            }
            Self::MinTreeifyCapacityTooLarge { min_treeify, max } => {
                write!(f, "min treeify capacity {min_treeify} exceeds max capacity {max}")
            }
            Self::InitialCapacityTooLarge { initial, max } => {
                write!(f, "initial capacity {initial} exceeds max capacity {max}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
