//! Tree-based forward star generation.
//!
//! One balanced tree per distance class holds the ISA ranks of the
//! positions currently inside that class's window. As the parse
//! advances, the newest position enters the first tree and each tree
//! hands its expiring position down to the next. Predecessor and
//! successor queries walk the tree by rank.
//!
//! Nodes live in an arena indexed by 32-bit ids with a free list; the
//! trees store child ids, never pointers.

use super::length::MaximalLength;
use super::Generator;
use crate::suffix::inverse;
use crate::text::Text;
use std::rc::Rc;

const NIL: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct Node {
    key: i32,
    pos: u32,
    left: u32,
    right: u32,
    height: i32,
}

/// Arena of AVL nodes shared by all trees of one generator.
#[derive(Debug, Default)]
struct Arena {
    nodes: Vec<Node>,
    free: Vec<u32>,
}

impl Arena {
    fn alloc(&mut self, key: i32, pos: u32) -> u32 {
        let node = Node {
            key,
            pos,
            left: NIL,
            right: NIL,
            height: 1,
        };
        if let Some(id) = self.free.pop() {
            self.nodes[id as usize] = node;
            id
        } else {
            self.nodes.push(node);
            (self.nodes.len() - 1) as u32
        }
    }

    fn release(&mut self, id: u32) {
        self.free.push(id);
    }

    #[inline]
    fn height(&self, id: u32) -> i32 {
        if id == NIL {
            0
        } else {
            self.nodes[id as usize].height
        }
    }

    fn update_height(&mut self, id: u32) {
        let h = 1 + self
            .height(self.nodes[id as usize].left)
            .max(self.height(self.nodes[id as usize].right));
        self.nodes[id as usize].height = h;
    }

    fn balance(&self, id: u32) -> i32 {
        self.height(self.nodes[id as usize].left) - self.height(self.nodes[id as usize].right)
    }

    fn rotate_right(&mut self, id: u32) -> u32 {
        let left = self.nodes[id as usize].left;
        self.nodes[id as usize].left = self.nodes[left as usize].right;
        self.nodes[left as usize].right = id;
        self.update_height(id);
        self.update_height(left);
        left
    }

    fn rotate_left(&mut self, id: u32) -> u32 {
        let right = self.nodes[id as usize].right;
        self.nodes[id as usize].right = self.nodes[right as usize].left;
        self.nodes[right as usize].left = id;
        self.update_height(id);
        self.update_height(right);
        right
    }

    fn rebalance(&mut self, id: u32) -> u32 {
        self.update_height(id);
        let balance = self.balance(id);
        if balance > 1 {
            if self.balance(self.nodes[id as usize].left) < 0 {
                let new_left = self.rotate_left(self.nodes[id as usize].left);
                self.nodes[id as usize].left = new_left;
            }
            self.rotate_right(id)
        } else if balance < -1 {
            if self.balance(self.nodes[id as usize].right) > 0 {
                let new_right = self.rotate_right(self.nodes[id as usize].right);
                self.nodes[id as usize].right = new_right;
            }
            self.rotate_left(id)
        } else {
            id
        }
    }

    fn insert(&mut self, root: u32, key: i32, pos: u32) -> u32 {
        if root == NIL {
            return self.alloc(key, pos);
        }
        if key < self.nodes[root as usize].key {
            let new_left = self.insert(self.nodes[root as usize].left, key, pos);
            self.nodes[root as usize].left = new_left;
        } else {
            debug_assert!(key > self.nodes[root as usize].key);
            let new_right = self.insert(self.nodes[root as usize].right, key, pos);
            self.nodes[root as usize].right = new_right;
        }
        self.rebalance(root)
    }

    fn min_node(&self, mut id: u32) -> u32 {
        while self.nodes[id as usize].left != NIL {
            id = self.nodes[id as usize].left;
        }
        id
    }

    fn remove(&mut self, root: u32, key: i32) -> u32 {
        debug_assert_ne!(root, NIL, "removing a key that is not in the tree");
        let node = self.nodes[root as usize];
        if key < node.key {
            let new_left = self.remove(node.left, key);
            self.nodes[root as usize].left = new_left;
        } else if key > node.key {
            let new_right = self.remove(node.right, key);
            self.nodes[root as usize].right = new_right;
        } else {
            if node.left == NIL || node.right == NIL {
                let child = if node.left != NIL { node.left } else { node.right };
                self.release(root);
                return child;
            }
            // Two children: replace with the in-order successor.
            let succ = self.min_node(node.right);
            let (succ_key, succ_pos) = {
                let s = &self.nodes[succ as usize];
                (s.key, s.pos)
            };
            let new_right = self.remove(node.right, succ_key);
            {
                let n = &mut self.nodes[root as usize];
                n.key = succ_key;
                n.pos = succ_pos;
                n.right = new_right;
            }
        }
        self.rebalance(root)
    }
}

/// One window class: ranks of the positions currently in the window.
#[derive(Debug, Clone, Copy)]
struct Tree {
    root: u32,
}

impl Tree {
    fn new() -> Self {
        Tree { root: NIL }
    }

    fn insert(&mut self, arena: &mut Arena, key: i32, pos: u32) {
        self.root = arena.insert(self.root, key, pos);
    }

    fn remove(&mut self, arena: &mut Arena, key: i32) {
        self.root = arena.remove(self.root, key);
    }

    /// Positions of the strictly-nearest keys on either side of `key`.
    fn neighbors(&self, arena: &Arena, key: i32) -> (Option<u32>, Option<u32>) {
        let mut pred = None;
        let mut succ = None;
        let mut id = self.root;
        while id != NIL {
            let node = &arena.nodes[id as usize];
            if node.key < key {
                pred = Some(node.pos);
                id = node.right;
            } else {
                debug_assert!(node.key > key);
                succ = Some(node.pos);
                id = node.left;
            }
        }
        (pred, succ)
    }
}

/// The tree-based generator, serving any distance ladder.
#[derive(Debug)]
pub struct AvlGen {
    t_len: usize,
    isa: Vec<i32>,
    dst: Vec<u32>,
    lengths: Vec<MaximalLength>,
    trees: Vec<Tree>,
    arena: Arena,
    offset: u32,
}

impl AvlGen {
    /// Build over a normalized distance ladder.
    pub fn new(text: Text, sa: Rc<Vec<i32>>, dst: Vec<u32>) -> Self {
        let t_len = text.len();
        AvlGen {
            t_len,
            isa: inverse(&sa),
            lengths: dst.iter().map(|_| MaximalLength::new(text.clone())).collect(),
            trees: vec![Tree::new(); dst.len()],
            dst,
            arena: Arena::default(),
            offset: 0,
        }
    }

    fn update_trees(&mut self) {
        if self.offset == 0 {
            return;
        }
        let newest = self.offset - 1;
        let mut carry = Some((self.isa[newest as usize], newest));
        for i in 0..self.trees.len() {
            let Some((key, pos)) = carry else { break };
            self.trees[i].insert(&mut self.arena, key, pos);
            let leaving = self.offset as i64 - self.dst[i] as i64 - 1;
            carry = if leaving >= 0 {
                let leave_key = self.isa[leaving as usize];
                self.trees[i].remove(&mut self.arena, leave_key);
                Some((leave_key, leaving as u32))
            } else {
                None
            };
        }
    }
}

impl Generator for AvlGen {
    fn max_match(&mut self, level: usize) -> (u32, u32) {
        let rank = self.isa[self.offset as usize];
        let (pred, succ) = self.trees[level].neighbors(&self.arena, rank);
        if pred.is_none() && succ.is_none() {
            return (0, 0);
        }
        let no = super::scan::NO_MATCH;
        self.lengths[level].match_at(pred.unwrap_or(no), succ.unwrap_or(no), self.offset)
    }

    fn levels(&mut self) -> usize {
        if self.offset > *self.dst.last().expect("non-empty ladder") {
            return self.dst.len();
        }
        1 + self.dst.partition_point(|&d| d < self.offset)
    }

    fn pre_gen(&mut self) {
        self.update_trees();
    }

    fn post_gen(&mut self) {
        self.offset += 1;
    }

    fn text_pos(&self) -> u32 {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with(arena: &mut Arena, keys: &[i32]) -> Tree {
        let mut tree = Tree::new();
        for &k in keys {
            tree.insert(arena, k, k as u32 * 10);
        }
        tree
    }

    fn inorder(arena: &Arena, id: u32, out: &mut Vec<i32>) {
        if id == NIL {
            return;
        }
        let node = arena.nodes[id as usize];
        inorder(arena, node.left, out);
        out.push(node.key);
        inorder(arena, node.right, out);
    }

    fn check_avl(arena: &Arena, id: u32) -> i32 {
        if id == NIL {
            return 0;
        }
        let node = arena.nodes[id as usize];
        let lh = check_avl(arena, node.left);
        let rh = check_avl(arena, node.right);
        assert!((lh - rh).abs() <= 1, "unbalanced at key {}", node.key);
        assert_eq!(node.height, 1 + lh.max(rh));
        1 + lh.max(rh)
    }

    #[test]
    fn test_insert_keeps_order_and_balance() {
        let mut arena = Arena::default();
        let keys: Vec<i32> = (0..200).map(|i| (i * 37) % 199).collect();
        let tree = tree_with(&mut arena, &keys);
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        let mut got = Vec::new();
        inorder(&arena, tree.root, &mut got);
        assert_eq!(got, sorted);
        check_avl(&arena, tree.root);
    }

    #[test]
    fn test_remove_and_reuse() {
        let mut arena = Arena::default();
        let mut tree = tree_with(&mut arena, &[5, 3, 8, 1, 4, 7, 9, 2, 6]);
        for k in [5, 1, 9, 3] {
            tree.remove(&mut arena, k);
            check_avl(&arena, tree.root);
        }
        let mut got = Vec::new();
        inorder(&arena, tree.root, &mut got);
        assert_eq!(got, vec![2, 4, 6, 7, 8]);
        assert_eq!(arena.free.len(), 4);
        // New inserts reuse released slots.
        let before = arena.nodes.len();
        tree.insert(&mut arena, 10, 100);
        assert_eq!(arena.nodes.len(), before);
    }

    #[test]
    fn test_neighbors() {
        let mut arena = Arena::default();
        let tree = tree_with(&mut arena, &[10, 20, 30, 40]);
        assert_eq!(tree.neighbors(&arena, 25), (Some(200), Some(300)));
        assert_eq!(tree.neighbors(&arena, 5), (None, Some(100)));
        assert_eq!(tree.neighbors(&arena, 45), (Some(400), None));
    }

    #[test]
    fn test_window_cascade() {
        // Positions cascade through trees as the offset advances; the
        // total node count is bounded by the last window size.
        let data: Vec<u8> = (0..64u8).map(|i| i % 3).collect();
        let text = Text::new(data);
        let sa = Rc::new(crate::suffix::suffix_array(text.as_slice()));
        let dst = vec![4u32, 16, 64];
        let mut gen = AvlGen::new(text, sa, dst);
        for _ in 0..64 {
            gen.pre_gen();
            let levels = gen.levels();
            for l in 0..levels {
                let (d, ell) = gen.max_match(l);
                if ell > 0 {
                    assert!(d >= 1);
                    assert!(d <= gen.offset);
                }
            }
            gen.post_gen();
        }
        // 64 positions entered, those past the last window left.
        assert!(gen.arena.nodes.len() - gen.arena.free.len() <= 64);
    }
}
