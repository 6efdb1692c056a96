//! Construction-time tuning for [`BrandedBinMap`](super::BrandedBinMap).

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::spread::{table_size_for, MAX_CAPACITY, MIN_CAPACITY};

/// Table sizing and bin-conversion thresholds.
///
/// Fixed for the lifetime of a map. Deserializes with per-field defaults, so a
/// JSON document only needs to name what it overrides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinMapConfig {
    /// Requested bin count, rounded up to a power of two (minimum 16).
    pub initial_capacity: usize,
    /// Fill ratio above which the table doubles.
    pub load_factor: f32,
    /// Chain length at which a bin becomes a tree.
    pub treeify_threshold: usize,
    /// Tree size at or below which a bin goes back to a chain.
    pub untreeify_threshold: usize,
    /// Smallest table on which bins are treeified; smaller tables grow instead.
    pub min_treeify_capacity: usize,
    /// Largest table the map may allocate.
    pub max_capacity: usize,
}

impl Default for BinMapConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
            load_factor: 0.75,
            treeify_threshold: 8,
            untreeify_threshold: 6,
            min_treeify_capacity: 64,
            max_capacity: MAX_CAPACITY,
        }
    }
}

impl BinMapConfig {
    /// Sets the initial capacity.
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Sets the load factor.
    pub fn with_load_factor(mut self, load_factor: f32) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Sets both bin-conversion thresholds.
    pub fn with_tree_thresholds(mut self, treeify: usize, untreeify: usize) -> Self {
        self.treeify_threshold = treeify;
        self.untreeify_threshold = untreeify;
        self
    }

    /// Sets the minimum capacity for treeification.
    pub fn with_min_treeify_capacity(mut self, min_treeify_capacity: usize) -> Self {
        self.min_treeify_capacity = min_treeify_capacity;
        self
    }

    /// Sets the maximum capacity.
    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Checks every field, returning the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.load_factor.is_finite() || self.load_factor <= 0.0 {
            return Err(ConfigError::InvalidLoadFactor(self.load_factor));
        }
        if self.treeify_threshold < 2 {
            return Err(ConfigError::TreeifyThresholdTooSmall(self.treeify_threshold));
        }
        if self.untreeify_threshold >= self.treeify_threshold {
            return Err(ConfigError::ThresholdsOverlap {
                treeify: self.treeify_threshold,
                untreeify: self.untreeify_threshold,
            });
        }
        if !self.max_capacity.is_power_of_two() || !(MIN_CAPACITY..=MAX_CAPACITY).contains(&self.max_capacity) {
            return Err(ConfigError::InvalidMaxCapacity(self.max_capacity));
        }
        if self.min_treeify_capacity > self.max_capacity {
            return Err(ConfigError::MinTreeifyCapacityTooLarge {
                min_treeify: self.min_treeify_capacity,
                max: self.max_capacity,
            });
        }
        if table_size_for(self.initial_capacity) > self.max_capacity
            || self.initial_capacity > self.max_capacity
        {
            return Err(ConfigError::InitialCapacityTooLarge {
                initial: self.initial_capacity,
                max: self.max_capacity,
            });
        }
        Ok(())
    }

    /// Number of entries a table of `capacity` bins holds before it must grow.
    #[inline]
    pub fn threshold_for(&self, capacity: usize) -> usize {
        let t = capacity as f64 * f64::from(self.load_factor);
        if t >= usize::MAX as f64 {
            usize::MAX
        } else {
            t as usize
        }
    }
}
