//! Structural self-checks for the bin table.
//!
//! Release builds never run these on their own; tests call
//! [`check_table`] directly and debug builds route it through
//! [`invariant_assert_msg`].

use super::chain::ListIter;
use super::entry::EntryArena;
use super::spread::bin_index;
use super::table::{Bin, Table};

/// Debug-asserts that a structural check passed.
#[inline(always)]
pub(crate) fn invariant_assert_msg(result: Result<(), String>) {
    if let Err(message) = result {
        debug_assert!(false, "bin map invariant violated: {message}");
    }
}

/// Walks every bin and returns the first violation found.
pub(crate) fn check_table<K, V>(table: &Table, arena: &EntryArena<'_, K, V>) -> Result<(), String> {
    let capacity = table.capacity();
    if !capacity.is_power_of_two() {
        return Err(format!("capacity {capacity} is not a power of two"));
    }

    let mut total = 0;
    for (index, bin) in table.bins().iter().enumerate() {
        let mut listed = 0;
        let mut last = None;
        for id in ListIter::new(&arena.links, bin.head()) {
            let entry = arena
                .slots
                .get(id)
                .ok_or_else(|| format!("bin {index} links a freed entry"))?;
            let home = bin_index(entry.hash, capacity);
            if home != index {
                return Err(format!("entry with hash {:#x} sits in bin {index}, belongs in {home}", entry.hash));
            }
            listed += 1;
            last = Some(id);
            if listed > arena.len() {
                return Err(format!("bin {index} list does not terminate"));
            }
        }
        if listed != bin.len() {
            return Err(format!("bin {index} links {listed} entries, records {}", bin.len()));
        }
        match bin {
            Bin::Empty => {}
            Bin::Chain(chain) => {
                if last != Some(chain.tail) {
                    return Err(format!("bin {index} chain tail is stale"));
                }
            }
            Bin::Tree(tree) => tree
                .check(&arena.slots, &arena.links)
                .map_err(|err| format!("bin {index}: {err}"))?,
        }
        total += listed;
    }

    if total != arena.len() {
        return Err(format!("bins hold {total} entries, map records {}", arena.len()));
    }
    Ok(())
}
