mod common;

use binmap::{BinMapConfig, BrandedBinMap, GhostToken, TreeOrder};
use common::{Collide, IdentityState};
use proptest::prelude::*;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::{BuildHasher, Hash};

#[derive(Debug, Clone)]
enum Operation {
    Insert(u16, u32),
    Get(u16),
    Remove(u16),
}

fn operations() -> impl Strategy<Value = Vec<Operation>> {
    proptest::collection::vec(
        prop_oneof![
            3 => (any::<u16>(), any::<u32>()).prop_map(|(k, v)| Operation::Insert(k, v)),
            1 => any::<u16>().prop_map(Operation::Get),
            2 => any::<u16>().prop_map(Operation::Remove),
        ],
        1..400,
    )
}

/// Replays `ops` against the map and `HashMap`, comparing every result.
fn run_model<'brand, K, S, O>(
    map: &mut BrandedBinMap<'brand, K, u32, S, O>,
    token: &GhostToken<'brand>,
    ops: Vec<Operation>,
    key_of: impl Fn(u16) -> K,
) where
    K: Eq + Hash + Clone + Debug,
    S: BuildHasher,
    O: TreeOrder<K, K>,
{
    let mut std_map = HashMap::new();

    for op in ops {
        match op {
            Operation::Insert(k, v) => {
                let key = key_of(k);
                let std_res = std_map.insert(key.clone(), v);
                let map_res = map.insert(key, v);
                assert_eq!(std_res, map_res, "Insert result mismatch for key {}", k);
            }
            Operation::Get(k) => {
                let key = key_of(k);
                assert_eq!(std_map.get(&key), map.get(token, &key), "Get result mismatch for key {}", k);
            }
            Operation::Remove(k) => {
                let key = key_of(k);
                let std_res = std_map.remove(&key);
                let map_res = map.remove(&key);
                assert_eq!(std_res, map_res, "Remove result mismatch for key {}", k);
            }
        }
    }

    // Final consistency check
    assert_eq!(map.len(), std_map.len(), "Length mismatch");
    map.check_invariants().unwrap();
    for (k, v) in map.iter(token) {
        assert_eq!(std_map.get(k), Some(v), "Final content mismatch for key {:?}", k);
    }
}

proptest! {
    #[test]
    fn test_bin_map_matches_std_map(ops in operations()) {
        GhostToken::new(|token| {
            let mut map = BrandedBinMap::new();
            run_model(&mut map, &token, ops, |k| k);
        });
    }

    #[test]
    fn test_bin_map_matches_std_map_under_collisions(ops in operations()) {
        // Eight hashes for the whole key space, so occupied bins hold long
        // collision runs and flip between chains and trees.
        let config = BinMapConfig::default().with_initial_capacity(64);
        GhostToken::new(|token| {
            let mut map = BrandedBinMap::with_config_and_hasher(config, IdentityState).unwrap();
            run_model(&mut map, &token, ops, |k| Collide::new(u64::from(k % 8) * 64 + 3, u32::from(k)));
        });
    }

    #[test]
    fn test_natural_order_matches_std_map(ops in operations()) {
        let config = BinMapConfig::default().with_tree_thresholds(4, 2);
        GhostToken::new(|token| {
            let mut map = BrandedBinMap::with_config_and_hasher(config, IdentityState)
                .unwrap()
                .with_natural_order();
            run_model(&mut map, &token, ops, |k| Collide::new(u64::from(k % 3), u32::from(k)));
        });
    }

    #[test]
    fn test_values_are_readable_through_token(entries in proptest::collection::hash_map(any::<u32>(), any::<u32>(), 0..200)) {
        GhostToken::new(|token| {
            let map: BrandedBinMap<'_, u32, u32> = entries.clone().into_iter().collect();
            prop_assert_eq!(map.len(), entries.len());
            for (k, v) in &entries {
                prop_assert_eq!(map.get(&token, k), Some(v));
            }
            prop_assert_eq!(map.values(&token).count(), entries.len());
            Ok(())
        })?;
    }
}
