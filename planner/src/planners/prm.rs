use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use itertools::Itertools;
use statrs::distribution::Normal;
use tracing::{debug, info};

use crate::benchmark::{BenchmarkManager, BenchmarkTimer};
use crate::error::PlannerError;
use crate::geometry::{distance, Point, ToOrd};
use crate::map::Map;
use crate::planners::Planner;
use crate::roadmap::Roadmap;
use crate::sample::Sampler;

#[derive(Debug, Clone)]
pub struct PrmOptions {
    /// Samples added on top of the grid.
    pub num_samples: usize,
    /// Neighbour radius, as a multiple of the step size.
    pub radius_mult: f64,
    /// Fraction of sampling attempts that use the Gaussian pair policy.
    pub gaussian_ratio: f64,
}

impl Default for PrmOptions {
    fn default() -> PrmOptions {
        PrmOptions {
            num_samples: 500,
            radius_mult: 5.0,
            gaussian_ratio: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Grid,
    Sampling,
    Connecting,
    Searching,
    Complete,
    Unreachable,
}

/// Probabilistic roadmap with a phased state machine: seed the workspace
/// with a regular grid, densify it with hybrid uniform/Gaussian samples,
/// connect everything within the neighbour radius, then run A* from start
/// to goal. Each `step` advances one phase. The roadmap survives start and
/// goal changes; `reanchor` reconnects the new endpoints and drops straight
/// back into the search phase.
pub struct Prm {
    map: Arc<Map>,
    roadmap: Roadmap,
    sampler: Sampler,
    opts: PrmOptions,
    step_size: f64,
    neighbour_radius: f64,
    normal: Normal,
    phase: Phase,
    start: Point,
    goal: Point,
    start_idx: Option<usize>,
    goal_idx: Option<usize>,
    grid_count: usize,
    steps: usize,
    bench: BenchmarkTimer,
    path: Vec<Point>,
}

impl Prm {
    pub fn new(
        map: Arc<Map>,
        step_size: f64,
        sampler: Sampler,
        manager: Option<BenchmarkManager>,
    ) -> Result<Prm, PlannerError> {
        Self::with_options(map, step_size, sampler, manager, PrmOptions::default())
    }

    pub fn with_options(
        map: Arc<Map>,
        step_size: f64,
        sampler: Sampler,
        manager: Option<BenchmarkManager>,
        opts: PrmOptions,
    ) -> Result<Prm, PlannerError> {
        let start = map.start().ok_or(PlannerError::MissingStart)?;
        let goal = map.goal().ok_or(PlannerError::MissingGoal)?;
        if !step_size.is_finite() || step_size <= 0.0 {
            return Err(PlannerError::invalid("step_size", "must be positive"));
        }
        if opts.radius_mult <= 0.0 {
            return Err(PlannerError::invalid("radius_mult", "must be positive"));
        }
        if !(0.0..=1.0).contains(&opts.gaussian_ratio) {
            return Err(PlannerError::invalid(
                "gaussian_ratio",
                format!("must be a fraction, got {}", opts.gaussian_ratio),
            ));
        }
        let std_dev = map.width().min(map.height()) / 10.0;
        let normal = Normal::new(0.0, std_dev)
            .map_err(|e| PlannerError::invalid("map", format!("bad sampling spread: {e}")))?;
        Ok(Prm {
            neighbour_radius: step_size * opts.radius_mult,
            map,
            roadmap: Roadmap::new(),
            sampler,
            opts,
            step_size,
            normal,
            phase: Phase::Grid,
            start,
            goal,
            start_idx: None,
            goal_idx: None,
            grid_count: 0,
            steps: 0,
            bench: BenchmarkTimer::new(manager),
            path: Vec::new(),
        })
    }

    pub fn roadmap(&self) -> &Roadmap {
        &self.roadmap
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn benchmark(&self) -> Option<&BenchmarkManager> {
        self.bench.manager()
    }

    pub fn is_unreachable(&self) -> bool {
        self.phase == Phase::Unreachable
    }

    /// Move the endpoints without rebuilding the roadmap: insert and
    /// connect the new start and goal, then drop back to the search phase.
    /// With no roadmap built yet this is a full reset.
    pub fn reanchor(&mut self, start: Point, goal: Point) {
        self.start = start;
        self.goal = goal;
        if self.grid_count == 0 && self.roadmap.is_empty() {
            self.clear_nodes();
            return;
        }
        info!(planner = "prm", "re-anchoring endpoints onto the existing roadmap");
        let start_idx = self.roadmap.insert(start);
        self.connect_node(start_idx);
        let goal_idx = self.roadmap.insert(goal);
        self.connect_node(goal_idx);
        self.start_idx = Some(start_idx);
        self.goal_idx = Some(goal_idx);
        self.path.clear();
        self.phase = Phase::Searching;
        self.bench.reset();
    }

    /// Regular grid with spacing at half the neighbour radius, keeping only
    /// collision-free points.
    fn grid_phase(&mut self) {
        let spacing = self.neighbour_radius * 0.5;
        let mut x = 0.0;
        while x <= self.map.width() {
            let mut y = 0.0;
            while y <= self.map.height() {
                let p = Point::new(x, y);
                if !self.map.is_collision(&p) {
                    self.roadmap.insert(p);
                }
                y += spacing;
            }
            x += spacing;
        }
        self.grid_count = self.roadmap.len();
        debug!(planner = "prm", nodes = self.grid_count, "grid generated");
    }

    /// Hybrid densification: the first share of attempts draws a uniform
    /// base point plus a Gaussian companion and keeps every collision-free
    /// candidate of the pair, the rest draw plain uniform samples. Attempts
    /// are bounded so a crowded map cannot loop forever.
    fn sampling_phase(&mut self) {
        let gaussian_attempts =
            (self.opts.num_samples as f64 * self.opts.gaussian_ratio) as usize;
        let mut added = 0;
        let mut attempts = 0;
        while added < self.opts.num_samples && attempts < self.opts.num_samples * 5 {
            if attempts < gaussian_attempts {
                let (base, companion) = self.sampler.gaussian_pair(&self.map, &self.normal);
                for p in [base, companion] {
                    if !self.map.is_collision(&p) {
                        self.roadmap.insert(p);
                        added += 1;
                    }
                }
            } else {
                let p = self.sampler.uniform(&self.map);
                if !self.map.is_collision(&p) {
                    self.roadmap.insert(p);
                    added += 1;
                }
            }
            attempts += 1;
        }
        debug!(planner = "prm", added, attempts, "sampling finished");
    }

    fn connecting_phase(&mut self) {
        let start_idx = self.roadmap.insert(self.start);
        let goal_idx = self.roadmap.insert(self.goal);
        self.start_idx = Some(start_idx);
        self.goal_idx = Some(goal_idx);

        for (a, b) in (0..self.roadmap.len()).tuple_combinations() {
            let (pa, pb) = (self.roadmap.pos(a), self.roadmap.pos(b));
            if distance(&pa, &pb) <= self.neighbour_radius
                && !self.map.is_edge_collision(&pa, &pb)
            {
                self.roadmap.connect(a, b);
            }
        }
    }

    /// Link one node to everything within the neighbour radius.
    fn connect_node(&mut self, idx: usize) {
        let pos = self.roadmap.pos(idx);
        for other in 0..self.roadmap.len() {
            if other == idx {
                continue;
            }
            let other_pos = self.roadmap.pos(other);
            if distance(&pos, &other_pos) <= self.neighbour_radius
                && !self.map.is_edge_collision(&pos, &other_pos)
            {
                self.roadmap.connect(idx, other);
            }
        }
    }

    fn searching_phase(&mut self) -> Result<(), PlannerError> {
        // Roadmap construction is excluded from the timing.
        self.bench.start();

        let (start_idx, goal_idx) = match (self.start_idx, self.goal_idx) {
            (Some(s), Some(g)) => (s, g),
            _ => {
                return Err(PlannerError::Inconsistency(
                    "search phase reached before endpoints were connected",
                ))
            }
        };

        match self.a_star(start_idx, goal_idx)? {
            Some(indices) => {
                self.path = indices.iter().map(|&i| self.roadmap.pos(i)).collect();
                self.phase = Phase::Complete;
                debug!(planner = "prm", nodes = self.roadmap.len(), "path found");
                self.bench.finalize(
                    "prm",
                    self.steps,
                    Some(self.start),
                    Some(self.goal),
                    self.step_size,
                    &self.path,
                );
            }
            None => {
                info!(planner = "prm", "start and goal are not connected");
                self.phase = Phase::Unreachable;
            }
        }
        Ok(())
    }

    /// A* over the roadmap with the Euclidean distance to the goal as the
    /// heuristic; heap ties break by insertion order.
    fn a_star(&self, start: usize, goal: usize) -> Result<Option<Vec<usize>>, PlannerError> {
        let n = self.roadmap.len();
        let goal_pos = self.roadmap.pos(goal);
        let mut g_cost = vec![f64::INFINITY; n];
        let mut came_from: Vec<Option<usize>> = vec![None; n];
        let mut visited = vec![false; n];
        let mut heap = BinaryHeap::new();
        let mut order = 0usize;

        g_cost[start] = 0.0;
        heap.push(Reverse((
            distance(&self.roadmap.pos(start), &goal_pos).to_ord(),
            order,
            start,
        )));

        while let Some(Reverse((_, _, current))) = heap.pop() {
            if visited[current] {
                continue;
            }
            visited[current] = true;
            if current == goal {
                return Ok(Some(reconstruct(&came_from, start, goal)?));
            }
            for &(neighbour, weight) in self.roadmap.get(current).edges() {
                let tentative = g_cost[current] + weight;
                if tentative < g_cost[neighbour] {
                    g_cost[neighbour] = tentative;
                    came_from[neighbour] = Some(current);
                    order += 1;
                    let f = tentative + distance(&self.roadmap.pos(neighbour), &goal_pos);
                    heap.push(Reverse((f.to_ord(), order, neighbour)));
                }
            }
        }
        Ok(None)
    }
}

/// Follow predecessor links from the goal back to the start. The walk is
/// bounded by the node count; exceeding it means the links are cyclic.
pub(crate) fn reconstruct(
    came_from: &[Option<usize>],
    start: usize,
    goal: usize,
) -> Result<Vec<usize>, PlannerError> {
    let mut indices = vec![goal];
    let mut current = goal;
    while current != start {
        current = match came_from[current] {
            Some(prev) => prev,
            None => {
                return Err(PlannerError::Inconsistency(
                    "predecessor chain broken during reconstruction",
                ))
            }
        };
        indices.push(current);
        if indices.len() > came_from.len() {
            return Err(PlannerError::Inconsistency(
                "predecessor walk exceeded the node count",
            ));
        }
    }
    indices.reverse();
    Ok(indices)
}

impl Planner for Prm {
    fn name(&self) -> &'static str {
        "prm"
    }

    fn step(&mut self) -> Result<(), PlannerError> {
        match self.phase {
            Phase::Grid => {
                self.grid_phase();
                self.phase = Phase::Sampling;
            }
            Phase::Sampling => {
                self.sampling_phase();
                self.phase = Phase::Connecting;
            }
            Phase::Connecting => {
                self.connecting_phase();
                self.phase = Phase::Searching;
            }
            Phase::Searching => self.searching_phase()?,
            Phase::Complete | Phase::Unreachable => return Ok(()),
        }
        self.steps += 1;
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    fn path(&self) -> &[Point] {
        &self.path
    }

    fn clear_nodes(&mut self) {
        self.roadmap.clear();
        self.grid_count = 0;
        self.start_idx = None;
        self.goal_idx = None;
        self.path.clear();
        self.steps = 0;
        self.phase = Phase::Grid;
        self.bench.reset();
    }
}
