use std::sync::Arc;

use tracing::debug;

use crate::benchmark::{BenchmarkManager, BenchmarkTimer};
use crate::error::PlannerError;
use crate::geometry::{distance, distance_opt, Point, EPS};
use crate::map::Map;
use crate::planners::Planner;
use crate::sample::Sampler;
use crate::tree::Tree;

/// Bidirectional RRT: one tree rooted at the start, one at the goal. Each
/// step extends the active tree toward a uniform sample; on success the
/// passive tree marches greedily at the new node until the trees join or an
/// obstacle stops the march. Roles swap only when an extension fails, so a
/// tree on a roll keeps the initiative.
pub struct RrtConnect {
    map: Arc<Map>,
    start_tree: Tree,
    goal_tree: Tree,
    sampler: Sampler,
    step_size: f64,
    steps: usize,
    bench: BenchmarkTimer,
    path: Vec<Point>,
    complete: bool,
    start_is_active: bool,
}

impl RrtConnect {
    pub fn new(
        map: Arc<Map>,
        step_size: f64,
        sampler: Sampler,
        manager: Option<BenchmarkManager>,
    ) -> Result<RrtConnect, PlannerError> {
        let start = map.start().ok_or(PlannerError::MissingStart)?;
        let goal = map.goal().ok_or(PlannerError::MissingGoal)?;
        if !step_size.is_finite() || step_size <= 0.0 {
            return Err(PlannerError::invalid("step_size", "must be positive"));
        }
        Ok(RrtConnect {
            map,
            start_tree: Tree::with_root(start),
            goal_tree: Tree::with_root(goal),
            sampler,
            step_size,
            steps: 0,
            bench: BenchmarkTimer::new(manager),
            path: Vec::new(),
            complete: false,
            start_is_active: true,
        })
    }

    pub fn start_tree(&self) -> &Tree {
        &self.start_tree
    }

    pub fn goal_tree(&self) -> &Tree {
        &self.goal_tree
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn benchmark(&self) -> Option<&BenchmarkManager> {
        self.bench.manager()
    }

    /// Join the trees at `start_idx`/`goal_idx`: the start chain reversed,
    /// then the goal chain root-ward as-is, deduplicating a coincident
    /// junction.
    fn join(&mut self, start_idx: usize, goal_idx: usize) -> Result<(), PlannerError> {
        let mut path: Vec<Point> = self
            .start_tree
            .path_to_root(start_idx)?
            .iter()
            .rev()
            .map(|&i| self.start_tree.pos(i))
            .collect();
        let goal_chain = self.goal_tree.path_to_root(goal_idx)?;
        let junction = goal_chain.first().map(|&i| self.goal_tree.pos(i));
        let skip = usize::from(distance_opt(path.last(), junction.as_ref()) <= EPS);
        path.extend(goal_chain.iter().skip(skip).map(|&i| self.goal_tree.pos(i)));
        self.path = path;
        self.complete = true;
        debug!(planner = "rrt-connect", steps = self.steps, "trees joined");
        self.bench.finalize(
            "rrt-connect",
            self.steps,
            self.map.start(),
            self.map.goal(),
            self.step_size,
            &self.path,
        );
        Ok(())
    }
}

impl Planner for RrtConnect {
    fn name(&self) -> &'static str {
        "rrt-connect"
    }

    fn step(&mut self) -> Result<(), PlannerError> {
        if self.complete {
            return Ok(());
        }
        self.bench.start();

        let sample = self.sampler.uniform(&self.map);
        let (active, passive) = if self.start_is_active {
            (&mut self.start_tree, &mut self.goal_tree)
        } else {
            (&mut self.goal_tree, &mut self.start_tree)
        };

        let new_idx = match extend(active, &self.map, self.step_size, &sample) {
            Some(new_idx) => new_idx,
            None => {
                self.start_is_active = !self.start_is_active;
                return Ok(());
            }
        };
        self.steps += 1;
        let target = active.pos(new_idx);

        // Greedy connect: extend the passive tree straight at the new node
        // until it either joins or an extension fails.
        let mut joint = None;
        loop {
            let nearest = match passive.nearest(&target) {
                Some(nearest) => nearest,
                None => break,
            };
            let near_pos = passive.pos(nearest);
            if distance(&near_pos, &target) < self.step_size
                && !self.map.is_edge_collision(&near_pos, &target)
            {
                joint = Some((new_idx, nearest));
                break;
            }
            match extend(passive, &self.map, self.step_size, &target) {
                Some(_) => self.steps += 1,
                None => break,
            }
        }

        if let Some((active_idx, passive_idx)) = joint {
            let (start_idx, goal_idx) = if self.start_is_active {
                (active_idx, passive_idx)
            } else {
                (passive_idx, active_idx)
            };
            self.join(start_idx, goal_idx)?;
        }
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn path(&self) -> &[Point] {
        &self.path
    }

    fn clear_nodes(&mut self) {
        if let Some(start) = self.map.start() {
            self.start_tree.clear_to_root(start);
        }
        if let Some(goal) = self.map.goal() {
            self.goal_tree.clear_to_root(goal);
        }
        self.steps = 0;
        self.path.clear();
        self.complete = false;
        self.start_is_active = true;
        self.bench.reset();
    }
}

/// Extend the tree one step toward `target`. Degenerate, colliding or
/// blocked candidates leave the tree untouched.
fn extend(tree: &mut Tree, map: &Map, step_size: f64, target: &Point) -> Option<usize> {
    let nearest = tree.nearest(target)?;
    let near_pos = tree.pos(nearest);
    let candidate = near_pos + (target - near_pos).cap_magnitude(step_size);
    if distance(&near_pos, &candidate) <= EPS {
        return None;
    }
    if map.is_collision(&candidate) || map.is_edge_collision(&near_pos, &candidate) {
        return None;
    }
    Some(tree.insert_child(candidate, nearest))
}
