use std::sync::Arc;

use tracing::debug;

use crate::benchmark::{BenchmarkManager, BenchmarkTimer};
use crate::error::PlannerError;
use crate::geometry::{distance, Point, EPS};
use crate::map::Map;
use crate::sample::Sampler;
use crate::tree::Tree;

/// State every tree-growth planner carries: the shared map, the node
/// arena rooted at the start, the steering step size and the completion
/// bookkeeping. Concrete planners compose this and add their own knobs.
pub(crate) struct TreeBase {
    pub map: Arc<Map>,
    pub tree: Tree,
    pub sampler: Sampler,
    pub step_size: f64,
    pub steps: usize,
    pub bench: BenchmarkTimer,
    pub path: Vec<Point>,
    pub goal_idx: Option<usize>,
    pub complete: bool,
}

impl TreeBase {
    pub fn new(
        map: Arc<Map>,
        step_size: f64,
        sampler: Sampler,
        manager: Option<BenchmarkManager>,
    ) -> Result<TreeBase, PlannerError> {
        let start = map.start().ok_or(PlannerError::MissingStart)?;
        if !step_size.is_finite() || step_size <= 0.0 {
            return Err(PlannerError::invalid("step_size", "must be positive"));
        }
        Ok(TreeBase {
            map,
            tree: Tree::with_root(start),
            sampler,
            step_size,
            steps: 0,
            bench: BenchmarkTimer::new(manager),
            path: Vec::new(),
            goal_idx: None,
            complete: false,
        })
    }

    /// Reset to a single root at the current start position.
    pub fn clear(&mut self) {
        // The start was validated at construction.
        if let Some(start) = self.map.start() {
            self.tree.clear_to_root(start);
        }
        self.steps = 0;
        self.path.clear();
        self.goal_idx = None;
        self.complete = false;
        self.bench.reset();
    }

    /// Move from a tree position toward `target` by at most `step_size`.
    /// Returns the source itself for a degenerate direction; callers treat
    /// that as a no-op.
    pub fn steer(&self, from: &Point, target: &Point) -> Point {
        let direction = (target - from).cap_magnitude(self.step_size);
        from + direction
    }

    /// Completion condition for tree methods: the nearest node lies within
    /// `step_size` of the goal and the direct edge to the goal is
    /// collision-free. The goal node is inserted exactly once, the first
    /// time the condition is met; then the path is reconstructed and the
    /// benchmark finalized.
    pub fn complete_if_goal_reached(&mut self, name: &'static str) -> Result<bool, PlannerError> {
        if self.complete {
            return Ok(true);
        }
        let goal = match self.map.goal() {
            Some(goal) => goal,
            None => return Ok(false),
        };
        let nearest = match self.tree.nearest(&goal) {
            Some(nearest) => nearest,
            None => return Ok(false),
        };
        let near_pos = self.tree.pos(nearest);
        if distance(&near_pos, &goal) >= self.step_size {
            return Ok(false);
        }
        if self.map.is_edge_collision(&near_pos, &goal) {
            return Ok(false);
        }

        let goal_idx = if distance(&near_pos, &goal) <= EPS {
            nearest
        } else {
            self.tree.insert_child(goal, nearest)
        };
        self.goal_idx = Some(goal_idx);
        self.reconstruct(goal_idx)?;
        self.complete = true;
        debug!(planner = name, steps = self.steps, "path found");
        self.finalize(name);
        Ok(true)
    }

    /// Walk parent references back to the root and materialize the ordered
    /// start-to-goal path.
    pub fn reconstruct(&mut self, from: usize) -> Result<(), PlannerError> {
        let chain = self.tree.path_to_root(from)?;
        self.path = chain.iter().rev().map(|&i| self.tree.pos(i)).collect();
        Ok(())
    }

    pub fn finalize(&mut self, name: &'static str) {
        self.bench.finalize(
            name,
            self.steps,
            self.map.start(),
            self.map.goal(),
            self.step_size,
            &self.path,
        );
    }
}
