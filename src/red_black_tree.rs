//! RedBlackTree: an ordered set of unique values.
//!
//! Nodes live in a `SlotMap` and link to each other by key, parent links
//! included. Rebalancing follows the classic recoloring and rotation cases,
//! so the longest root-to-leaf path is at most twice the shortest and
//! `depth() <= 2 * log2(len + 1)`.
//!
//! Ordering comes from a [`Comparator`]. [`Natural`] uses `Ord`; any
//! `Fn(&T, &T) -> Ordering` closure works too.

use core::cmp::Ordering;
use core::fmt;
use core::mem;

use slotmap::{new_key_type, SlotMap};

use crate::error::{CapacityError, InsertError};
use crate::reentrancy::DebugReentrancy;

new_key_type! {
    struct NodeKey;
}

const MAX_NODES: usize = (u32::MAX - 1) as usize;

/// Total order over `T` used by a [`RedBlackTree`].
pub trait Comparator<T: ?Sized> {
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

/// Orders by `T: Ord`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Natural;

impl<T: Ord + ?Sized> Comparator<T> for Natural {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

impl<T: ?Sized, F> Comparator<T> for F
where
    F: Fn(&T, &T) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self(a, b)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Debug)]
struct Node<T> {
    left: Option<NodeKey>,
    right: Option<NodeKey>,
    parent: Option<NodeKey>,
    color: Color,
    value: T,
}

/// Arena plus root. All structural edits live here so the tree's public
/// methods only borrow fields.
struct Links<T> {
    nodes: SlotMap<NodeKey, Node<T>>,
    root: Option<NodeKey>,
}

impl<T> Links<T> {
    fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
        }
    }

    #[inline]
    fn left(&self, k: NodeKey) -> Option<NodeKey> {
        self.nodes[k].left
    }
    #[inline]
    fn right(&self, k: NodeKey) -> Option<NodeKey> {
        self.nodes[k].right
    }
    #[inline]
    fn parent(&self, k: NodeKey) -> Option<NodeKey> {
        self.nodes[k].parent
    }
    /// Absent children count as black.
    #[inline]
    fn is_red(&self, k: Option<NodeKey>) -> bool {
        k.map_or(false, |k| self.nodes[k].color == Color::Red)
    }
    #[inline]
    fn set_color(&mut self, k: Option<NodeKey>, color: Color) {
        if let Some(k) = k {
            self.nodes[k].color = color;
        }
    }

    fn leftmost(&self, mut k: NodeKey) -> NodeKey {
        while let Some(l) = self.left(k) {
            k = l;
        }
        k
    }

    fn rightmost(&self, mut k: NodeKey) -> NodeKey {
        while let Some(r) = self.right(k) {
            k = r;
        }
        k
    }

    /// In-order successor by parent links.
    fn successor(&self, k: NodeKey) -> Option<NodeKey> {
        if let Some(r) = self.right(k) {
            return Some(self.leftmost(r));
        }
        let mut child = k;
        let mut up = self.parent(k);
        while let Some(p) = up {
            if self.left(p) == Some(child) {
                return Some(p);
            }
            child = p;
            up = self.parent(p);
        }
        None
    }

    fn find<C: Comparator<T>>(&self, cmp: &C, v: &T) -> Option<NodeKey> {
        let mut cur = self.root;
        while let Some(k) = cur {
            cur = match cmp.compare(v, &self.nodes[k].value) {
                Ordering::Less => self.left(k),
                Ordering::Greater => self.right(k),
                Ordering::Equal => return Some(k),
            };
        }
        None
    }

    /// Point whichever link of `old`'s parent held `old` at `new`.
    fn replace_child(&mut self, parent: Option<NodeKey>, old: NodeKey, new: Option<NodeKey>) {
        match parent {
            None => self.root = new,
            Some(p) if self.left(p) == Some(old) => self.nodes[p].left = new,
            Some(p) => self.nodes[p].right = new,
        }
    }

    fn rotate_left(&mut self, x: NodeKey) {
        let Some(y) = self.right(x) else { return };
        let y_left = self.left(y);
        self.nodes[x].right = y_left;
        if let Some(b) = y_left {
            self.nodes[b].parent = Some(x);
        }
        let xp = self.parent(x);
        self.nodes[y].parent = xp;
        self.replace_child(xp, x, Some(y));
        self.nodes[y].left = Some(x);
        self.nodes[x].parent = Some(y);
    }

    fn rotate_right(&mut self, x: NodeKey) {
        let Some(y) = self.left(x) else { return };
        let y_right = self.right(y);
        self.nodes[x].left = y_right;
        if let Some(b) = y_right {
            self.nodes[b].parent = Some(x);
        }
        let xp = self.parent(x);
        self.nodes[y].parent = xp;
        self.replace_child(xp, x, Some(y));
        self.nodes[y].right = Some(x);
        self.nodes[x].parent = Some(y);
    }

    fn insert<C: Comparator<T>>(&mut self, cmp: &C, value: T) -> Result<(), InsertError> {
        let mut parent = None;
        let mut went_left = false;
        let mut cur = self.root;
        while let Some(k) = cur {
            parent = Some(k);
            match cmp.compare(&value, &self.nodes[k].value) {
                Ordering::Less => {
                    went_left = true;
                    cur = self.left(k);
                }
                Ordering::Greater => {
                    went_left = false;
                    cur = self.right(k);
                }
                Ordering::Equal => return Err(InsertError::DuplicateKey),
            }
        }
        if self.nodes.len() >= MAX_NODES {
            return Err(CapacityError::Overflow.into());
        }
        self.nodes.try_reserve(1).map_err(CapacityError::from)?;
        let z = self.nodes.insert(Node {
            left: None,
            right: None,
            parent,
            color: Color::Red,
            value,
        });
        match parent {
            None => self.root = Some(z),
            Some(p) if went_left => self.nodes[p].left = Some(z),
            Some(p) => self.nodes[p].right = Some(z),
        }
        self.insert_fixup(z);
        Ok(())
    }

    fn insert_fixup(&mut self, mut z: NodeKey) {
        loop {
            let Some(p) = self.parent(z) else { break };
            if self.nodes[p].color == Color::Black {
                break;
            }
            // A red parent is never the root, so the grandparent exists.
            let Some(g) = self.parent(p) else { break };
            if self.left(g) == Some(p) {
                let uncle = self.right(g);
                if self.is_red(uncle) {
                    self.set_color(Some(p), Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(Some(g), Color::Red);
                    z = g;
                    continue;
                }
                if self.right(p) == Some(z) {
                    z = p;
                    self.rotate_left(z);
                }
                let p = self.parent(z);
                self.set_color(p, Color::Black);
                self.set_color(Some(g), Color::Red);
                self.rotate_right(g);
            } else {
                let uncle = self.left(g);
                if self.is_red(uncle) {
                    self.set_color(Some(p), Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(Some(g), Color::Red);
                    z = g;
                    continue;
                }
                if self.left(p) == Some(z) {
                    z = p;
                    self.rotate_right(z);
                }
                let p = self.parent(z);
                self.set_color(p, Color::Black);
                self.set_color(Some(g), Color::Red);
                self.rotate_left(g);
            }
        }
        self.set_color(self.root, Color::Black);
    }

    /// Move `v` into `u`'s place under `u`'s parent.
    fn transplant(&mut self, u: NodeKey, v: Option<NodeKey>) {
        let up = self.parent(u);
        self.replace_child(up, u, v);
        if let Some(v) = v {
            self.nodes[v].parent = up;
        }
    }

    /// Remove the value at `z`. With two children, `z` takes over its
    /// in-order successor's value and the successor node is spliced out
    /// instead.
    fn remove(&mut self, z: NodeKey) -> Option<T> {
        let target = match (self.left(z), self.right(z)) {
            (Some(_), Some(r)) => self.leftmost(r),
            _ => z,
        };
        // `target` has at most one child.
        let child = self.left(target).or(self.right(target));
        let parent = self.parent(target);
        let color = self.nodes[target].color;
        self.transplant(target, child);
        let node = self.nodes.remove(target)?;
        let value = if target == z {
            node.value
        } else {
            mem::replace(&mut self.nodes[z].value, node.value)
        };
        if color == Color::Black {
            self.remove_fixup(child, parent);
        }
        Some(value)
    }

    /// Restore black heights after a black node left the path through `x`.
    /// `x` may be absent, so its parent is tracked separately.
    fn remove_fixup(&mut self, mut x: Option<NodeKey>, mut parent: Option<NodeKey>) {
        while x != self.root && !self.is_red(x) {
            let Some(p) = parent else { break };
            if self.left(p) == x {
                let mut w = self.right(p);
                if self.is_red(w) {
                    self.set_color(w, Color::Black);
                    self.set_color(Some(p), Color::Red);
                    self.rotate_left(p);
                    w = self.right(p);
                }
                let Some(mut wk) = w else { break };
                if !self.is_red(self.left(wk)) && !self.is_red(self.right(wk)) {
                    self.set_color(Some(wk), Color::Red);
                    x = Some(p);
                    parent = self.parent(p);
                } else {
                    if !self.is_red(self.right(wk)) {
                        self.set_color(self.left(wk), Color::Black);
                        self.set_color(Some(wk), Color::Red);
                        self.rotate_right(wk);
                        match self.right(p) {
                            Some(k) => wk = k,
                            None => break,
                        }
                    }
                    self.nodes[wk].color = self.nodes[p].color;
                    self.set_color(Some(p), Color::Black);
                    self.set_color(self.right(wk), Color::Black);
                    self.rotate_left(p);
                    x = self.root;
                    parent = None;
                }
            } else {
                let mut w = self.left(p);
                if self.is_red(w) {
                    self.set_color(w, Color::Black);
                    self.set_color(Some(p), Color::Red);
                    self.rotate_right(p);
                    w = self.left(p);
                }
                let Some(mut wk) = w else { break };
                if !self.is_red(self.left(wk)) && !self.is_red(self.right(wk)) {
                    self.set_color(Some(wk), Color::Red);
                    x = Some(p);
                    parent = self.parent(p);
                } else {
                    if !self.is_red(self.left(wk)) {
                        self.set_color(self.right(wk), Color::Black);
                        self.set_color(Some(wk), Color::Red);
                        self.rotate_left(wk);
                        match self.left(p) {
                            Some(k) => wk = k,
                            None => break,
                        }
                    }
                    self.nodes[wk].color = self.nodes[p].color;
                    self.set_color(Some(p), Color::Black);
                    self.set_color(self.left(wk), Color::Black);
                    self.rotate_right(p);
                    x = self.root;
                    parent = None;
                }
            }
        }
        self.set_color(x, Color::Black);
    }

    fn depth(&self, k: Option<NodeKey>) -> usize {
        match k {
            None => 0,
            Some(k) => 1 + self.depth(self.left(k)).max(self.depth(self.right(k))),
        }
    }

    fn pre_order(&self, k: Option<NodeKey>, f: &mut impl FnMut(&T)) {
        if let Some(k) = k {
            f(&self.nodes[k].value);
            self.pre_order(self.left(k), f);
            self.pre_order(self.right(k), f);
        }
    }

    fn post_order(&self, k: Option<NodeKey>, f: &mut impl FnMut(&T)) {
        if let Some(k) = k {
            self.post_order(self.left(k), f);
            self.post_order(self.right(k), f);
            f(&self.nodes[k].value);
        }
    }
}

/// Balanced binary search tree of unique values.
pub struct RedBlackTree<T, C = Natural> {
    links: Links<T>,
    cmp: C,
    reentrancy: DebugReentrancy,
}

impl<T: Ord> RedBlackTree<T> {
    pub fn new() -> Self {
        Self::with_comparator(Natural)
    }
}

impl<T: Ord> Default for RedBlackTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> RedBlackTree<T, C> {
    pub fn len(&self) -> usize {
        self.links.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.nodes.is_empty()
    }

    /// Smallest value, or `None` when empty.
    pub fn min(&self) -> Option<&T> {
        let k = self.links.leftmost(self.links.root?);
        Some(&self.links.nodes[k].value)
    }

    /// Largest value, or `None` when empty.
    pub fn max(&self) -> Option<&T> {
        let k = self.links.rightmost(self.links.root?);
        Some(&self.links.nodes[k].value)
    }

    /// Nodes on the longest root-to-leaf path; 0 for an empty tree.
    pub fn depth(&self) -> usize {
        let _g = self.reentrancy.enter();
        self.links.depth(self.links.root)
    }

    /// Call `f` on every value in ascending order.
    pub fn visit_in_order(&self, mut f: impl FnMut(&T)) {
        let _g = self.reentrancy.enter();
        let mut cur = self.links.root.map(|r| self.links.leftmost(r));
        while let Some(k) = cur {
            f(&self.links.nodes[k].value);
            cur = self.links.successor(k);
        }
    }

    /// Call `f` on each node before its subtrees.
    pub fn visit_pre_order(&self, mut f: impl FnMut(&T)) {
        let _g = self.reentrancy.enter();
        self.links.pre_order(self.links.root, &mut f);
    }

    /// Call `f` on each node after its subtrees.
    pub fn visit_post_order(&self, mut f: impl FnMut(&T)) {
        let _g = self.reentrancy.enter();
        self.links.post_order(self.links.root, &mut f);
    }

    /// Ascending iterator.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            links: &self.links,
            next: self.links.root.map(|r| self.links.leftmost(r)),
            remaining: self.len(),
        }
    }

    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        self.links.nodes.clear();
        self.links.root = None;
    }
}

impl<T, C> RedBlackTree<T, C>
where
    C: Comparator<T>,
{
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            links: Links::new(),
            cmp,
            reentrancy: DebugReentrancy::new(),
        }
    }

    /// Add `value`. An equal value already in the tree leaves it unchanged
    /// and yields [`InsertError::DuplicateKey`].
    pub fn insert(&mut self, value: T) -> Result<(), InsertError> {
        let _g = self.reentrancy.enter();
        self.links.insert(&self.cmp, value)
    }

    pub fn contains(&self, value: &T) -> bool {
        let _g = self.reentrancy.enter();
        self.links.find(&self.cmp, value).is_some()
    }

    /// Stored value equal to `value`.
    pub fn get(&self, value: &T) -> Option<&T> {
        let _g = self.reentrancy.enter();
        let k = self.links.find(&self.cmp, value)?;
        Some(&self.links.nodes[k].value)
    }

    /// Remove and return the stored value equal to `value`.
    pub fn remove(&mut self, value: &T) -> Option<T> {
        let _g = self.reentrancy.enter();
        let k = self.links.find(&self.cmp, value)?;
        self.links.remove(k)
    }

    /// Checks root color, red-red edges, black heights, parent links and
    /// ordering.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        fn walk<T, C: Comparator<T>>(
            t: &RedBlackTree<T, C>,
            k: Option<NodeKey>,
            parent: Option<NodeKey>,
            count: &mut usize,
        ) -> usize {
            let Some(k) = k else { return 1 };
            let l = &t.links;
            *count += 1;
            assert_eq!(l.parent(k), parent, "broken parent link");
            if l.nodes[k].color == Color::Red {
                assert!(!l.is_red(l.left(k)) && !l.is_red(l.right(k)), "red node with red child");
            }
            if let Some(c) = l.left(k) {
                assert_eq!(t.cmp.compare(&l.nodes[c].value, &l.nodes[k].value), Ordering::Less);
            }
            if let Some(c) = l.right(k) {
                assert_eq!(t.cmp.compare(&l.nodes[c].value, &l.nodes[k].value), Ordering::Greater);
            }
            let lh = walk(t, l.left(k), Some(k), count);
            let rh = walk(t, l.right(k), Some(k), count);
            assert_eq!(lh, rh, "unequal black heights");
            lh + usize::from(l.nodes[k].color == Color::Black)
        }
        assert!(!self.links.is_red(self.links.root), "red root");
        let mut count = 0;
        walk(self, self.links.root, None, &mut count);
        assert_eq!(count, self.len());
        let v: Vec<&T> = self.iter().collect();
        for w in v.windows(2) {
            assert_eq!(self.cmp.compare(w[0], w[1]), Ordering::Less, "in-order not ascending");
        }
    }
}

impl<T: fmt::Debug, C> fmt::Debug for RedBlackTree<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Ascending iterator over a [`RedBlackTree`].
pub struct Iter<'a, T> {
    links: &'a Links<T>,
    next: Option<NodeKey>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let k = self.next?;
        self.next = self.links.successor(k);
        self.remaining -= 1;
        Some(&self.links.nodes[k].value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T, C> IntoIterator for &'a RedBlackTree<T, C> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn in_order<T: Clone, C>(t: &RedBlackTree<T, C>) -> Vec<T> {
        let mut out = Vec::new();
        t.visit_in_order(|v| out.push(v.clone()));
        out
    }

    #[test]
    fn small_tree_insert_and_remove() {
        let mut t = RedBlackTree::new();
        for v in [5, 3, 8, 1, 4, 7, 9] {
            t.insert(v).unwrap();
            t.assert_invariants();
        }
        assert_eq!(in_order(&t), vec![1, 3, 4, 5, 7, 8, 9]);
        assert_eq!(t.remove(&5), Some(5));
        t.assert_invariants();
        assert_eq!(in_order(&t), vec![1, 3, 4, 7, 8, 9]);
        // 2 * log2(6 + 1) < 6
        assert!(t.depth() <= 5);
        assert_eq!((t.min(), t.max()), (Some(&1), Some(&9)));
    }

    #[test]
    fn duplicate_rejected() {
        let mut t = RedBlackTree::new();
        t.insert("a").unwrap();
        assert!(t.insert("a").unwrap_err().is_duplicate_key());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn empty_tree() {
        let mut t: RedBlackTree<i32> = RedBlackTree::default();
        assert_eq!(t.depth(), 0);
        assert!(t.min().is_none() && t.max().is_none());
        assert!(t.remove(&1).is_none());
        assert_eq!(t.iter().count(), 0);
        t.assert_invariants();
    }

    /// Invariant: ascending inserts stay within the red-black height bound.
    #[test]
    fn sequential_inserts_stay_balanced() {
        let mut t = RedBlackTree::new();
        for v in 0..1000u32 {
            t.insert(v).unwrap();
        }
        t.assert_invariants();
        // 2 * log2(1001) < 20
        assert!(t.depth() <= 19, "depth {}", t.depth());
        for v in (0..1000u32).step_by(2) {
            assert_eq!(t.remove(&v), Some(v));
        }
        t.assert_invariants();
        assert_eq!(t.len(), 500);
        assert!(t.iter().copied().eq((1..1000u32).step_by(2)));
    }

    #[test]
    fn remove_every_shape() {
        // Removal order mixes leaves, single-child and two-child nodes.
        let mut t = RedBlackTree::new();
        for v in 1..=31 {
            t.insert(v).unwrap();
        }
        for v in [16, 1, 31, 8, 24, 2, 30, 15, 17, 4, 12, 20, 28] {
            assert_eq!(t.remove(&v), Some(v));
            t.assert_invariants();
            assert!(!t.contains(&v));
        }
        assert_eq!(t.len(), 18);
        for v in in_order(&t) {
            t.remove(&v).unwrap();
            t.assert_invariants();
        }
        assert!(t.is_empty());
    }

    #[test]
    fn traversal_orders() {
        let mut t = RedBlackTree::new();
        for v in [2, 1, 3] {
            t.insert(v).unwrap();
        }
        let mut pre = Vec::new();
        t.visit_pre_order(|v| pre.push(*v));
        let mut post = Vec::new();
        t.visit_post_order(|v| post.push(*v));
        assert_eq!(pre, vec![2, 1, 3]);
        assert_eq!(post, vec![1, 3, 2]);
        assert_eq!(format!("{t:?}"), "{1, 2, 3}");
    }

    #[test]
    fn custom_comparator_reverses_order() {
        let mut t = RedBlackTree::with_comparator(|a: &i32, b: &i32| b.cmp(a));
        for v in [4, 9, 1, 7] {
            t.insert(v).unwrap();
        }
        t.assert_invariants();
        assert_eq!(in_order(&t), vec![9, 7, 4, 1]);
        assert_eq!(t.min(), Some(&9));
        assert_eq!(t.get(&7), Some(&7));
    }

    #[test]
    fn comparator_sees_only_key_field() {
        let by_key = |a: &(u8, char), b: &(u8, char)| a.0.cmp(&b.0);
        let mut t = RedBlackTree::with_comparator(by_key);
        t.insert((1, 'a')).unwrap();
        assert!(t.insert((1, 'b')).is_err());
        assert_eq!(t.get(&(1, '_')), Some(&(1, 'a')));
        assert_eq!(t.remove(&(1, '_')), Some((1, 'a')));
    }

    #[test]
    fn clear_and_drop_release_values() {
        #[derive(Debug)]
        struct Tracked(u32, Rc<Cell<usize>>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.1.set(self.1.get() + 1);
            }
        }
        let drops = Rc::new(Cell::new(0));
        let cmp = |a: &Tracked, b: &Tracked| a.0.cmp(&b.0);
        let mut t = RedBlackTree::with_comparator(cmp);
        for v in 0..10 {
            t.insert(Tracked(v, drops.clone())).unwrap();
        }
        drop(t.remove(&Tracked(3, drops.clone())));
        // The probe and the removed value.
        assert_eq!(drops.get(), 2);
        t.clear();
        assert_eq!(drops.get(), 11);
        t.insert(Tracked(1, drops.clone())).unwrap();
        drop(t);
        assert_eq!(drops.get(), 12);
    }
}
