use crate::error::PlannerError;
use crate::geometry::{distance, Point};

/// A node of the search tree. Parent and children are arena indices, never
/// references, so reparenting cannot leave a dangling link behind.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pos: Point,
    parent: Option<usize>,
    children: Vec<usize>,
    cost: f64,
}

impl TreeNode {
    pub fn pos(&self) -> Point {
        self.pos
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// Cached cost: the sum of edge lengths along the parent chain.
    pub fn cost(&self) -> f64 {
        self.cost
    }
}

/// Arena of tree nodes addressed by stable indices. The tree only grows,
/// except for `clear_to_root` which discards everything and recreates the
/// root.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn new() -> Tree {
        Tree { nodes: Vec::new() }
    }

    pub fn with_root(pos: Point) -> Tree {
        let mut tree = Tree::new();
        tree.insert_root(pos);
        tree
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, idx: usize) -> &TreeNode {
        &self.nodes[idx]
    }

    pub fn pos(&self, idx: usize) -> Point {
        self.nodes[idx].pos
    }

    pub fn cost(&self, idx: usize) -> f64 {
        self.nodes[idx].cost
    }

    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.nodes[idx].parent
    }

    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    pub fn insert_root(&mut self, pos: Point) -> usize {
        debug_assert!(self.nodes.is_empty(), "a tree has exactly one root");
        self.nodes.push(TreeNode {
            pos,
            parent: None,
            children: Vec::new(),
            cost: 0.0,
        });
        0
    }

    pub fn insert_child(&mut self, pos: Point, parent: usize) -> usize {
        let cost = self.nodes[parent].cost + distance(&self.nodes[parent].pos, &pos);
        let idx = self.nodes.len();
        self.nodes.push(TreeNode {
            pos,
            parent: Some(parent),
            children: Vec::new(),
            cost,
        });
        self.nodes[parent].children.push(idx);
        idx
    }

    /// Discard the whole structure and recreate a single root.
    pub fn clear_to_root(&mut self, pos: Point) {
        self.nodes.clear();
        self.insert_root(pos);
    }

    /// Linear scan for the nearest node; ties are broken by the first node
    /// found.
    pub fn nearest(&self, p: &Point) -> Option<usize> {
        let mut best = None;
        let mut best_dist = f64::INFINITY;
        for (i, node) in self.nodes.iter().enumerate() {
            let d = distance(&node.pos, p);
            if d < best_dist {
                best = Some(i);
                best_dist = d;
            }
        }
        best
    }

    pub fn latest(&self) -> Option<usize> {
        self.nodes.len().checked_sub(1)
    }

    pub fn near_within(&self, p: &Point, radius: f64) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| distance(&node.pos, p) < radius)
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether `ancestor` appears on the parent chain of `node`. The walk is
    /// bounded by the node count; exceeding it means a cycle already exists.
    pub fn is_ancestor(&self, ancestor: usize, node: usize) -> Result<bool, PlannerError> {
        let mut current = node;
        let mut hops = 0;
        while let Some(parent) = self.nodes[current].parent {
            if parent == ancestor {
                return Ok(true);
            }
            current = parent;
            hops += 1;
            if hops > self.nodes.len() {
                return Err(PlannerError::Inconsistency(
                    "ancestor walk exceeded the node count",
                ));
            }
        }
        Ok(false)
    }

    /// Re-assign `node`'s parent. Atomically detaches the node from its old
    /// parent's child set, attaches it to the new one, recomputes the cached
    /// cost and propagates the delta to every descendant. Refuses to create
    /// a cycle.
    pub fn reparent(&mut self, node: usize, new_parent: usize) -> Result<(), PlannerError> {
        if node == new_parent {
            return Err(PlannerError::Inconsistency("node cannot be its own parent"));
        }
        if self.nodes[node].parent.is_none() {
            return Err(PlannerError::Inconsistency("the root cannot be reparented"));
        }
        if self.is_ancestor(node, new_parent)? {
            return Err(PlannerError::Inconsistency(
                "reparenting onto a descendant would create a cycle",
            ));
        }

        let new_cost =
            self.nodes[new_parent].cost + distance(&self.nodes[new_parent].pos, &self.nodes[node].pos);
        let delta = self.nodes[node].cost - new_cost;

        if let Some(old_parent) = self.nodes[node].parent {
            let children = &mut self.nodes[old_parent].children;
            if let Some(at) = children.iter().position(|&c| c == node) {
                children.swap_remove(at);
            }
        }
        self.nodes[node].parent = Some(new_parent);
        self.nodes[node].cost = new_cost;
        self.nodes[new_parent].children.push(node);

        // Descendants keep their edges, so they all shift by the same delta.
        let mut stack = vec![node];
        while let Some(idx) = stack.pop() {
            for i in 0..self.nodes[idx].children.len() {
                let child = self.nodes[idx].children[i];
                self.nodes[child].cost -= delta;
                stack.push(child);
            }
        }
        Ok(())
    }

    /// Indices from `idx` up to the root, bounded by the node count.
    pub fn path_to_root(&self, idx: usize) -> Result<Vec<usize>, PlannerError> {
        let mut chain = vec![idx];
        let mut current = idx;
        while let Some(parent) = self.nodes[current].parent {
            chain.push(parent);
            current = parent;
            if chain.len() > self.nodes.len() {
                return Err(PlannerError::Inconsistency(
                    "path reconstruction exceeded the node count",
                ));
            }
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn insert_child_tracks_cost_and_links() {
        let mut tree = Tree::with_root(p(0.0, 0.0));
        let a = tree.insert_child(p(3.0, 4.0), 0);
        let b = tree.insert_child(p(3.0, 8.0), a);

        assert_eq!(tree.cost(a), 5.0);
        assert_eq!(tree.cost(b), 9.0);
        assert_eq!(tree.parent(b), Some(a));
        assert!(tree.get(a).children().contains(&b));
        assert!(tree.get(0).children().contains(&a));
    }

    #[test]
    fn nearest_breaks_ties_by_first_found() {
        let mut tree = Tree::with_root(p(0.0, 0.0));
        let a = tree.insert_child(p(10.0, 0.0), 0);
        let _b = tree.insert_child(p(0.0, 10.0), 0);
        // Both children are equidistant from (7, 7) and strictly closer
        // than the root.
        assert_eq!(tree.nearest(&p(7.0, 7.0)), Some(a));
    }

    #[test]
    fn reparent_moves_child_sets_and_propagates_cost() {
        //  root -- a -- b -- c
        //    \
        //     d                 (d close to b)
        let mut tree = Tree::with_root(p(0.0, 0.0));
        let a = tree.insert_child(p(10.0, 0.0), 0);
        let b = tree.insert_child(p(10.0, 10.0), a);
        let c = tree.insert_child(p(10.0, 20.0), b);
        let d = tree.insert_child(p(9.0, 10.0), 0);

        let before_b = tree.cost(b);
        let before_c = tree.cost(c);
        tree.reparent(b, d).unwrap();

        assert_eq!(tree.parent(b), Some(d));
        assert!(!tree.get(a).children().contains(&b));
        assert!(tree.get(d).children().contains(&b));

        let expected_b = tree.cost(d) + distance(&tree.pos(d), &tree.pos(b));
        assert!((tree.cost(b) - expected_b).abs() < 1e-12);
        assert!(tree.cost(b) < before_b);
        // The descendant shifted by the same delta.
        assert!((before_c - tree.cost(c) - (before_b - tree.cost(b))).abs() < 1e-12);
    }

    #[test]
    fn reparent_refuses_descendants_and_the_root() {
        let mut tree = Tree::with_root(p(0.0, 0.0));
        let a = tree.insert_child(p(1.0, 0.0), 0);
        let b = tree.insert_child(p(2.0, 0.0), a);

        assert!(matches!(
            tree.reparent(a, b),
            Err(PlannerError::Inconsistency(_))
        ));
        assert!(matches!(
            tree.reparent(0, b),
            Err(PlannerError::Inconsistency(_))
        ));
        assert!(matches!(
            tree.reparent(a, a),
            Err(PlannerError::Inconsistency(_))
        ));
    }

    #[test]
    fn path_to_root_terminates_within_node_count() {
        let mut tree = Tree::with_root(p(0.0, 0.0));
        let mut parent = 0;
        for i in 1..=50 {
            parent = tree.insert_child(p(i as f64, 0.0), parent);
        }
        let chain = tree.path_to_root(parent).unwrap();
        assert_eq!(chain.len(), 51);
        assert_eq!(*chain.last().unwrap(), 0);
    }

    #[test]
    fn cost_matches_parent_chain_after_rewiring() {
        let mut tree = Tree::with_root(p(0.0, 0.0));
        let a = tree.insert_child(p(5.0, 0.0), 0);
        let b = tree.insert_child(p(5.0, 5.0), a);
        let shortcut = tree.insert_child(p(4.0, 4.0), 0);
        tree.reparent(b, shortcut).unwrap();

        for idx in 0..tree.len() {
            let chain = tree.path_to_root(idx).unwrap();
            let summed: f64 = chain
                .windows(2)
                .map(|w| distance(&tree.pos(w[0]), &tree.pos(w[1])))
                .sum();
            assert!((tree.cost(idx) - summed).abs() < 1e-12);
        }
    }

    #[test]
    fn clear_to_root_resets_the_arena() {
        let mut tree = Tree::with_root(p(0.0, 0.0));
        tree.insert_child(p(1.0, 1.0), 0);
        tree.clear_to_root(p(2.0, 2.0));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.pos(0), p(2.0, 2.0));
        assert_eq!(tree.cost(0), 0.0);
    }
}
