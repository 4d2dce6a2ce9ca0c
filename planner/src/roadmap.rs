use crate::geometry::{distance, Point, EPS};

/// A roadmap node: a position plus a weighted adjacency list. Edges are
/// symmetric and weighted by Euclidean distance.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pos: Point,
    edges: Vec<(usize, f64)>,
}

impl GraphNode {
    pub fn pos(&self) -> Point {
        self.pos
    }

    pub fn edges(&self) -> &[(usize, f64)] {
        &self.edges
    }
}

/// Undirected weighted graph of collision-free configurations, queried (not
/// grown) at search time.
#[derive(Debug, Clone, Default)]
pub struct Roadmap {
    nodes: Vec<GraphNode>,
}

impl Roadmap {
    pub fn new() -> Roadmap {
        Roadmap { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn insert(&mut self, pos: Point) -> usize {
        self.nodes.push(GraphNode {
            pos,
            edges: Vec::new(),
        });
        self.nodes.len() - 1
    }

    pub fn get(&self, idx: usize) -> &GraphNode {
        &self.nodes[idx]
    }

    pub fn pos(&self, idx: usize) -> Point {
        self.nodes[idx].pos
    }

    pub fn iter(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }

    /// Add the symmetric edge between `a` and `b`, weighted by their
    /// distance. Self-edges and duplicates are refused. Returns whether the
    /// edge was added.
    pub fn connect(&mut self, a: usize, b: usize) -> bool {
        if a == b {
            return false;
        }
        if self.nodes[a].edges.iter().any(|&(n, _)| n == b) {
            return false;
        }
        let w = distance(&self.nodes[a].pos, &self.nodes[b].pos);
        debug_assert!(w >= -EPS);
        self.nodes[a].edges.push((b, w));
        self.nodes[b].edges.push((a, w));
        true
    }

    /// Linear scan for the nearest node; ties broken by first found.
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn edges_are_symmetric_and_weighted_by_distance() {
        let mut rm = Roadmap::new();
        let a = rm.insert(p(0.0, 0.0));
        let b = rm.insert(p(3.0, 4.0));
        assert!(rm.connect(a, b));

        assert_eq!(rm.get(a).edges(), &[(b, 5.0)]);
        assert_eq!(rm.get(b).edges(), &[(a, 5.0)]);
    }

    #[test]
    fn self_edges_and_duplicates_are_refused() {
        let mut rm = Roadmap::new();
        let a = rm.insert(p(0.0, 0.0));
        let b = rm.insert(p(1.0, 0.0));
        assert!(!rm.connect(a, a));
        assert!(rm.connect(a, b));
        assert!(!rm.connect(b, a));
        assert_eq!(rm.get(a).edges().len(), 1);
        assert_eq!(rm.get(b).edges().len(), 1);
    }

    #[test]
    fn nearest_scans_all_nodes() {
        let mut rm = Roadmap::new();
        rm.insert(p(0.0, 0.0));
        let b = rm.insert(p(10.0, 10.0));
        assert_eq!(rm.nearest(&p(9.0, 9.0)), Some(b));
        assert_eq!(Roadmap::new().nearest(&p(0.0, 0.0)), None);
    }
}
