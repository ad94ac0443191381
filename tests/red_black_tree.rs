// RedBlackTree integration suite.
//
// Behaviors exercised:
// - Ordered traversal under natural and custom orderings.
// - Balance: depth stays within 2 * log2(len + 1) through inserts and
//   removals in adversarial orders.
// - Uniqueness and value ownership.
use probe_containers::{Comparator, InsertError, Natural, RedBlackTree};
use std::cmp::Ordering;

fn collect<T: Clone, C>(t: &RedBlackTree<T, C>) -> Vec<T> {
    let mut out = Vec::new();
    t.visit_in_order(|v| out.push(v.clone()));
    out
}

fn depth_bound(len: usize) -> usize {
    (2.0 * ((len + 1) as f64).log2()).floor() as usize
}

// Test: basic scenario with natural ordering.
// Verifies: in-order output before and after removing the root value, and
// the depth bound.
#[test]
fn insert_visit_remove() {
    let mut t = RedBlackTree::new();
    for v in [5, 3, 8, 1, 4, 7, 9] {
        t.insert(v).unwrap();
    }
    assert_eq!(collect(&t), vec![1, 3, 4, 5, 7, 8, 9]);
    assert_eq!(t.remove(&5), Some(5));
    assert_eq!(collect(&t), vec![1, 3, 4, 7, 8, 9]);
    assert!(t.depth() as f64 <= 2.0 * 6f64.log2() + 1.0);
    assert!(!t.contains(&5));
    assert_eq!(t.len(), 6);
}

// Test: adversarial orders.
// Verifies: ascending, descending and interleaved inserts all stay within
// the height bound, and removals keep it.
#[test]
fn stays_balanced() {
    let orders: [Vec<u32>; 3] = [
        (0..2048).collect(),
        (0..2048).rev().collect(),
        (0..2048).map(|i| if i % 2 == 0 { i / 2 } else { 2047 - i / 2 }).collect(),
    ];
    for order in orders {
        let mut t = RedBlackTree::new();
        for v in &order {
            t.insert(*v).unwrap();
        }
        assert!(t.depth() <= depth_bound(t.len()), "depth {}", t.depth());
        for v in order.iter().filter(|v| *v % 3 != 0) {
            assert_eq!(t.remove(v), Some(*v));
        }
        assert!(t.depth() <= depth_bound(t.len()), "depth {}", t.depth());
        assert!(t.iter().copied().eq((0..2048).filter(|v| v % 3 == 0)));
    }
}

// Test: comparator implementations.
// Verifies: a closure and a named comparator both drive ordering and
// equality.
#[test]
fn custom_comparators() {
    struct ByLen;
    impl Comparator<String> for ByLen {
        fn compare(&self, a: &String, b: &String) -> Ordering {
            a.len().cmp(&b.len())
        }
    }
    let mut t = RedBlackTree::with_comparator(ByLen);
    for w in ["ccc", "a", "bb", "dddd"] {
        t.insert(w.to_string()).unwrap();
    }
    assert_eq!(
        t.insert("zz".to_string()),
        Err(InsertError::DuplicateKey)
    );
    assert_eq!(collect(&t), ["a", "bb", "ccc", "dddd"]);
    assert_eq!(t.get(&"xx".to_string()).map(String::as_str), Some("bb"));

    let mut rev = RedBlackTree::with_comparator(|a: &i64, b: &i64| b.cmp(a));
    for v in -5..5i64 {
        rev.insert(v).unwrap();
    }
    assert_eq!(rev.min(), Some(&4));
    assert_eq!(rev.max(), Some(&-5));
    assert_eq!(Natural.compare(&1, &2), Ordering::Less);
}

// Test: traversals.
// Verifies: pre-order visits a node before its children, post-order after.
#[test]
fn traversal_orders() {
    let mut t = RedBlackTree::new();
    for v in 1..=7 {
        t.insert(v).unwrap();
    }
    let mut pre = Vec::new();
    t.visit_pre_order(|v| pre.push(*v));
    let mut post = Vec::new();
    t.visit_post_order(|v| post.push(*v));
    // The root comes first in pre-order and last in post-order.
    assert_eq!(pre.first(), post.last());
    let mut sorted_pre = pre.clone();
    sorted_pre.sort_unstable();
    assert_eq!(sorted_pre, (1..=7).collect::<Vec<_>>());
    assert_eq!(post.len(), 7);
}

// Test: empty tree.
#[test]
fn empty_tree_queries() {
    let mut t: RedBlackTree<u8> = RedBlackTree::default();
    assert_eq!(t.depth(), 0);
    assert_eq!(t.min(), None);
    assert_eq!(t.remove(&0), None);
    t.insert(3).unwrap();
    t.clear();
    assert!(t.is_empty());
    assert_eq!(format!("{t:?}"), "{}");
}
