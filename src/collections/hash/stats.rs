//! Census of a map's bin layout.

use serde::Serialize;

/// Representation of a single bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinKind {
    /// No entries.
    Empty,
    /// A linked chain holding this many entries.
    Chain(usize),
    /// A red-black tree holding this many entries.
    Tree(usize),
}

impl BinKind {
    /// Number of entries in the bin.
    pub fn len(self) -> usize {
        match self {
            BinKind::Empty => 0,
            BinKind::Chain(n) | BinKind::Tree(n) => n,
        }
    }

    /// Returns `true` for an empty bin.
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Returns `true` for a tree bin.
    pub fn is_tree(self) -> bool {
        matches!(self, BinKind::Tree(_))
    }
}

/// Aggregate shape of the table, useful to spot hash-quality problems.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BinStats {
    /// Number of bins.
    pub capacity: usize,
    /// Entries counted across all bins.
    pub len: usize,
    /// Bins holding nothing.
    pub empty_bins: usize,
    /// Bins stored as chains.
    pub chain_bins: usize,
    /// Bins stored as trees.
    pub tree_bins: usize,
    /// Length of the longest chain.
    pub longest_chain: usize,
    /// Entry count of the largest tree.
    pub largest_tree: usize,
    /// Height of the tallest tree bin, in nodes.
    pub tallest_tree: usize,
}
