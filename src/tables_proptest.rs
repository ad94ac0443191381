#![cfg(test)]

// Property tests kept inside the crate so they can call the private
// `assert_invariants` checks after every operation.

use crate::config::TableConfig;
use crate::control_byte_map::ControlByteMap;
use crate::error::{CapacityError, InsertError};
use crate::hash::BuildIdentityHasher;
use crate::node_map::{Handle, NodeMap};
use crate::node_set::NodeSet;
use crate::red_black_tree::RedBlackTree;
use crate::robin_hood_map::RobinHoodMap;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

// Small key space so duplicates, growth and deletion chains all happen.
#[derive(Clone, Debug)]
enum Op {
    Insert(u16, i32),
    Set(u16, i32),
    Remove(u16),
    Find(u16),
    Mutate(u16, i32),
    Rehash(usize),
    Clear,
    Iterate,
}

fn arb_ops(keys: u16, caps: Vec<usize>) -> impl Strategy<Value = Vec<Op>> {
    let key = 0..keys;
    let op = prop_oneof![
        6 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        2 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Set(k, v)),
        4 => key.clone().prop_map(Op::Remove),
        3 => key.clone().prop_map(Op::Find),
        1 => (key, any::<i32>()).prop_map(|(k, d)| Op::Mutate(k, d)),
        1 => proptest::sample::select(caps).prop_map(Op::Rehash),
        1 => Just(Op::Clear),
        1 => Just(Op::Iterate),
    ];
    proptest::collection::vec(op, 1..200)
}

fn model_entries(model: &HashMap<u16, i32>) -> Vec<(u16, i32)> {
    let mut v: Vec<(u16, i32)> = model.iter().map(|(k, v)| (*k, *v)).collect();
    v.sort_unstable();
    v
}

// Property: RobinHoodMap behaves like std's HashMap.
// - Duplicate insert is rejected without touching the stored value.
// - Removal closes gaps so every live key stays findable.
// - Explicit rehash below `len` fails with TooSmall and leaves the map intact.
// - Occupancy, probe distances and home ordering hold after every step.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_robin_hood_matches_model(ops in arb_ops(96, vec![1, 2, 8, 32, 64, 128, 256])) {
        let mut sut: RobinHoodMap<u16, i32> =
            RobinHoodMap::with_config(TableConfig::robin_hood().with_capacity(8), Default::default());
        let mut model: HashMap<u16, i32> = HashMap::new();
        for op in ops {
            match op {
                Op::Insert(k, v) => match sut.insert(k, v) {
                    Ok(()) => {
                        prop_assert!(!model.contains_key(&k));
                        model.insert(k, v);
                    }
                    Err(e) => {
                        prop_assert!(e.is_duplicate_key(), "unexpected {e}");
                        prop_assert!(model.contains_key(&k));
                    }
                },
                Op::Set(k, v) => {
                    prop_assert_eq!(sut.set(k, v).unwrap(), model.insert(k, v));
                }
                Op::Remove(k) => {
                    prop_assert_eq!(sut.remove(&k), model.remove(&k).map(|v| (k, v)));
                }
                Op::Find(k) => {
                    prop_assert_eq!(sut.find(&k), model.get(&k));
                    prop_assert_eq!(sut.contains(&k), model.contains_key(&k));
                }
                Op::Mutate(k, d) => {
                    if let Some(v) = sut.find_mut(&k) {
                        *v = v.wrapping_add(d);
                    }
                    if let Some(v) = model.get_mut(&k) {
                        *v = v.wrapping_add(d);
                    }
                }
                Op::Rehash(cap) => match sut.rehash(cap) {
                    Ok(()) => prop_assert_eq!(sut.capacity(), cap),
                    Err(CapacityError::TooSmall { requested, len }) => {
                        prop_assert_eq!(requested, cap);
                        prop_assert_eq!(len, model.len());
                        prop_assert!(cap < model.len());
                    }
                    Err(e) => prop_assert!(false, "unexpected {e}"),
                },
                Op::Clear => {
                    sut.clear();
                    model.clear();
                }
                Op::Iterate => {
                    let mut got: Vec<(u16, i32)> = sut.iter().map(|(k, v)| (*k, *v)).collect();
                    got.sort_unstable();
                    prop_assert_eq!(got, model_entries(&model));
                }
            }
            prop_assert_eq!(sut.len(), model.len());
            sut.assert_invariants();
        }
    }
}

// Property: ControlByteMap behaves like std's HashMap until it is full.
// - Inserting a new key into a table with no vacant slot yields TableFull.
// - Tombstones are reused and a rehash purges them.
// - Control bytes, the mirrored tail and counters stay consistent.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_control_byte_matches_model(ops in arb_ops(80, vec![8, 16, 32, 64])) {
        let mut sut: ControlByteMap<u16, i32> = ControlByteMap::with_capacity(32);
        let mut model: HashMap<u16, i32> = HashMap::new();
        for op in ops {
            match op {
                Op::Insert(k, v) | Op::Set(k, v) if sut.len() == sut.capacity() && !model.contains_key(&k) => {
                    let r = if matches!(op, Op::Insert(..)) {
                        sut.insert(k, v)
                    } else {
                        sut.set(k, v).map(|_| ())
                    };
                    prop_assert!(matches!(r, Err(InsertError::TableFull)));
                }
                Op::Insert(k, v) => match sut.insert(k, v) {
                    Ok(()) => {
                        prop_assert!(!model.contains_key(&k));
                        model.insert(k, v);
                    }
                    Err(e) => {
                        prop_assert!(e.is_duplicate_key(), "unexpected {e}");
                        prop_assert!(model.contains_key(&k));
                    }
                },
                Op::Set(k, v) => {
                    prop_assert_eq!(sut.set(k, v).unwrap(), model.insert(k, v));
                }
                Op::Remove(k) => {
                    prop_assert_eq!(sut.remove(&k), model.remove(&k).map(|v| (k, v)));
                }
                Op::Find(k) => {
                    prop_assert_eq!(sut.find(&k), model.get(&k));
                }
                Op::Mutate(k, d) => {
                    if let Some(v) = sut.find_mut(&k) {
                        *v = v.wrapping_add(d);
                    }
                    if let Some(v) = model.get_mut(&k) {
                        *v = v.wrapping_add(d);
                    }
                }
                Op::Rehash(cap) => match sut.rehash(cap) {
                    Ok(()) => {
                        prop_assert_eq!(sut.capacity(), cap);
                        prop_assert_eq!(sut.tombstones(), 0);
                    }
                    Err(e) => {
                        prop_assert!(e.is_too_small(), "unexpected {e}");
                        prop_assert!(cap < model.len());
                    }
                },
                Op::Clear => {
                    sut.clear();
                    model.clear();
                    prop_assert_eq!(sut.tombstones(), 0);
                }
                Op::Iterate => {
                    let mut got: Vec<(u16, i32)> = sut.iter().map(|(k, v)| (*k, *v)).collect();
                    got.sort_unstable();
                    prop_assert_eq!(got, model_entries(&model));
                }
            }
            prop_assert_eq!(sut.len(), model.len());
            sut.assert_invariants();
        }
    }
}

// Property: NodeMap behaves like std's HashMap and its handles stay valid.
// - Handles returned by insert resolve to their entry across growth and
//   explicit rehash until the entry is removed.
// - Handles of removed entries never resolve again.
// - A value keeps its address from insert until removal, through arena
//   growth and rehash alike.
// - Every node is linked in exactly the bucket its hash selects.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_node_map_matches_model(ops in arb_ops(64, vec![1, 3, 7, 32, 100])) {
        let mut sut: NodeMap<u16, i32, BuildIdentityHasher> =
            NodeMap::with_config(TableConfig::node_map().with_capacity(4), BuildIdentityHasher);
        let mut model: HashMap<u16, i32> = HashMap::new();
        let mut live: HashMap<u16, Handle> = HashMap::new();
        let mut stale: Vec<Handle> = Vec::new();
        let mut addrs: HashMap<u16, *const i32> = HashMap::new();
        for op in ops {
            match op {
                Op::Insert(k, v) => match sut.insert(k, v) {
                    Ok(h) => {
                        prop_assert!(!model.contains_key(&k));
                        model.insert(k, v);
                        live.insert(k, h);
                        addrs.insert(k, h.value(&sut).unwrap());
                    }
                    Err(e) => {
                        prop_assert!(e.is_duplicate_key(), "unexpected {e}");
                        prop_assert!(model.contains_key(&k));
                    }
                },
                Op::Set(k, v) => {
                    prop_assert_eq!(sut.set(k, v).unwrap(), model.insert(k, v));
                    live.insert(k, sut.handle(&k).unwrap());
                    addrs.entry(k).or_insert(sut.find(&k).unwrap());
                }
                Op::Remove(k) => {
                    // Alternate between key and handle removal.
                    let got = match live.remove(&k) {
                        Some(h) if k % 2 == 0 => {
                            stale.push(h);
                            sut.remove_handle(h)
                        }
                        Some(h) => {
                            stale.push(h);
                            sut.remove(&k)
                        }
                        None => sut.remove(&k),
                    };
                    prop_assert_eq!(got, model.remove(&k).map(|v| (k, v)));
                    addrs.remove(&k);
                }
                Op::Find(k) => {
                    prop_assert_eq!(sut.find(&k), model.get(&k));
                }
                Op::Mutate(k, d) => {
                    if let Some(h) = live.get(&k) {
                        let v = h.value_mut(&mut sut).unwrap();
                        *v = v.wrapping_add(d);
                    }
                    if let Some(v) = model.get_mut(&k) {
                        *v = v.wrapping_add(d);
                    }
                }
                Op::Rehash(cap) => {
                    sut.rehash(cap).unwrap();
                    prop_assert_eq!(sut.capacity(), cap);
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                    stale.extend(live.drain().map(|(_, h)| h));
                    addrs.clear();
                }
                Op::Iterate => {
                    let mut got: Vec<(u16, i32)> = sut.iter().map(|(k, v)| (*k, *v)).collect();
                    got.sort_unstable();
                    prop_assert_eq!(got, model_entries(&model));
                }
            }
            prop_assert_eq!(sut.len(), model.len());
            for (k, h) in &live {
                prop_assert_eq!(h.key(&sut), Some(k));
                prop_assert_eq!(h.value(&sut), model.get(k));
            }
            for h in &stale {
                prop_assert!(h.value(&sut).is_none());
            }
            for (k, p) in &addrs {
                prop_assert_eq!(sut.find(k).map(|v| v as *const i32), Some(*p));
            }
            sut.assert_invariants();
        }
    }
}

// Property: NodeSet and RedBlackTree behave like std's BTreeSet.
// - Duplicates are rejected.
// - The tree keeps its coloring rules, black heights, parent links and
//   ascending in-order walk after every insert and remove.
// - Tree depth stays within 2 * log2(len + 1).
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_sets_match_model(ops in arb_ops(128, vec![2, 16, 64])) {
        let mut set: NodeSet<u16> = NodeSet::with_capacity(2);
        let mut tree: RedBlackTree<u16> = RedBlackTree::new();
        let mut model: BTreeSet<u16> = BTreeSet::new();
        for op in ops {
            match op {
                Op::Insert(k, _) | Op::Set(k, _) => {
                    let fresh = model.insert(k);
                    prop_assert_eq!(set.insert(k).is_ok(), fresh);
                    prop_assert_eq!(tree.insert(k).is_ok(), fresh);
                }
                Op::Remove(k) | Op::Mutate(k, _) => {
                    let want = model.take(&k);
                    prop_assert_eq!(set.remove(&k), want);
                    prop_assert_eq!(tree.remove(&k), want);
                }
                Op::Find(k) => {
                    prop_assert_eq!(set.find(&k), model.get(&k));
                    prop_assert_eq!(tree.get(&k), model.get(&k));
                }
                Op::Rehash(cap) => set.rehash(cap).unwrap(),
                Op::Clear => {
                    set.clear();
                    tree.clear();
                    model.clear();
                }
                Op::Iterate => {
                    prop_assert!(tree.iter().eq(model.iter()));
                    prop_assert_eq!(tree.min(), model.first());
                    prop_assert_eq!(tree.max(), model.last());
                    let mut got: Vec<u16> = set.iter().copied().collect();
                    got.sort_unstable();
                    prop_assert!(got.iter().eq(model.iter()));
                }
            }
            prop_assert_eq!(set.len(), model.len());
            prop_assert_eq!(tree.len(), model.len());
            let bound = 2.0 * ((model.len() + 1) as f64).log2();
            prop_assert!(tree.depth() as f64 <= bound + 1e-9, "depth {} over {}", tree.depth(), bound);
            set.assert_invariants();
            tree.assert_invariants();
        }
    }
}
