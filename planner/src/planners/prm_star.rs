use std::collections::VecDeque;
use std::sync::Arc;

use statrs::distribution::Normal;
use tracing::{debug, info};

use crate::benchmark::{BenchmarkManager, BenchmarkTimer};
use crate::error::PlannerError;
use crate::geometry::{distance, Point};
use crate::map::Map;
use crate::planners::prm::reconstruct;
use crate::planners::Planner;
use crate::roadmap::Roadmap;
use crate::sample::Sampler;

const GAUSSIAN_RETRIES: usize = 10;

#[derive(Debug, Clone)]
pub struct PrmStarOptions {
    pub num_samples: usize,
    /// Fraction of samples drawn uniformly; the rest perturb an existing
    /// node with Gaussian noise.
    pub uniform_fraction: f64,
    pub gaussian_std: f64,
}

impl Default for PrmStarOptions {
    fn default() -> PrmStarOptions {
        PrmStarOptions {
            num_samples: 500,
            uniform_fraction: 0.5,
            gaussian_std: 5.0,
        }
    }
}

/// Non-incremental PRM*: one `step` samples the whole roadmap, connects
/// every pair within the cost-optimal radius and searches it with BFS.
/// Because the search is unweighted, the result is a connecting path with
/// the fewest edges, not the cheapest one; callers who need edge-weighted
/// shortest paths should use [`Prm`](crate::planners::Prm) instead.
pub struct PrmStar {
    map: Arc<Map>,
    roadmap: Roadmap,
    sampler: Sampler,
    opts: PrmStarOptions,
    step_size: f64,
    normal: Normal,
    start: Point,
    goal: Point,
    ran: bool,
    complete: bool,
    steps: usize,
    bench: BenchmarkTimer,
    path: Vec<Point>,
}

impl PrmStar {
    pub fn new(
        map: Arc<Map>,
        step_size: f64,
        sampler: Sampler,
        manager: Option<BenchmarkManager>,
    ) -> Result<PrmStar, PlannerError> {
        Self::with_options(map, step_size, sampler, manager, PrmStarOptions::default())
    }

    pub fn with_options(
        map: Arc<Map>,
        step_size: f64,
        sampler: Sampler,
        manager: Option<BenchmarkManager>,
        opts: PrmStarOptions,
    ) -> Result<PrmStar, PlannerError> {
        let start = map.start().ok_or(PlannerError::MissingStart)?;
        let goal = map.goal().ok_or(PlannerError::MissingGoal)?;
        if !step_size.is_finite() || step_size <= 0.0 {
            return Err(PlannerError::invalid("step_size", "must be positive"));
        }
        if !(0.0..=1.0).contains(&opts.uniform_fraction) {
            return Err(PlannerError::invalid(
                "uniform_fraction",
                format!("must be a fraction, got {}", opts.uniform_fraction),
            ));
        }
        let normal = Normal::new(0.0, opts.gaussian_std)
            .map_err(|e| PlannerError::invalid("gaussian_std", format!("{e}")))?;
        Ok(PrmStar {
            map,
            roadmap: Roadmap::new(),
            sampler,
            opts,
            step_size,
            normal,
            start,
            goal,
            ran: false,
            complete: false,
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

    /// Uniform with probability `uniform_fraction`, otherwise a Gaussian
    /// perturbation of a random existing node, clamped into the workspace.
    /// Perturbation retries are bounded; on exhaustion the sample falls
    /// back to uniform.
    fn hybrid_sample(&mut self) -> Point {
        if self.roadmap.is_empty() || self.sampler.chance(self.opts.uniform_fraction) {
            return self.sampler.uniform(&self.map);
        }
        for _ in 0..GAUSSIAN_RETRIES {
            let base = match self.sampler.pick_index(self.roadmap.len()) {
                Some(idx) => self.roadmap.pos(idx),
                None => break,
            };
            let p = self.map.clamp(self.sampler.gaussian_around(&base, &self.normal));
            if !self.map.is_collision(&p) {
                return p;
            }
        }
        self.sampler.uniform(&self.map)
    }

    /// Cost-optimal connection radius, uncapped.
    fn star_radius(&self) -> f64 {
        let n = self.roadmap.len();
        if n < 2 {
            return f64::INFINITY;
        }
        let d = 2.0_f64;
        let gamma =
            2.0 * (1.0 + 1.0 / d).powf(1.0 / d) * (self.map.area() / std::f64::consts::PI).powf(1.0 / d);
        let n = n as f64;
        gamma * ((n.ln()) / n).powf(1.0 / d)
    }

    /// Unweighted BFS between the roadmap nodes nearest to the start and
    /// goal, recording predecessors for reconstruction.
    fn search(&mut self) -> Result<(), PlannerError> {
        let (start_idx, goal_idx) = match (
            self.roadmap.nearest(&self.start),
            self.roadmap.nearest(&self.goal),
        ) {
            (Some(s), Some(g)) => (s, g),
            _ => return Ok(()),
        };

        let n = self.roadmap.len();
        let mut came_from: Vec<Option<usize>> = vec![None; n];
        let mut visited = vec![false; n];
        let mut queue = VecDeque::new();
        visited[start_idx] = true;
        queue.push_back(start_idx);

        while let Some(current) = queue.pop_front() {
            if current == goal_idx {
                let indices = reconstruct(&came_from, start_idx, goal_idx)?;
                self.path = indices.iter().map(|&i| self.roadmap.pos(i)).collect();
                self.complete = true;
                debug!(planner = "prm-star", nodes = n, "path found");
                self.bench.finalize(
                    "prm-star",
                    self.steps,
                    Some(self.start),
                    Some(self.goal),
                    self.step_size,
                    &self.path,
                );
                return Ok(());
            }
            for &(neighbour, _) in self.roadmap.get(current).edges() {
                if !visited[neighbour] {
                    visited[neighbour] = true;
                    came_from[neighbour] = Some(current);
                    queue.push_back(neighbour);
                }
            }
        }
        info!(planner = "prm-star", "start and goal are not connected");
        Ok(())
    }
}

impl Planner for PrmStar {
    fn name(&self) -> &'static str {
        "prm-star"
    }

    /// The whole pipeline runs synchronously in the first call; later
    /// calls are no-ops.
    fn step(&mut self) -> Result<(), PlannerError> {
        if self.ran {
            return Ok(());
        }
        self.ran = true;
        self.bench.start();

        for _ in 0..self.opts.num_samples {
            let p = self.hybrid_sample();
            if !self.map.is_collision(&p) {
                self.roadmap.insert(p);
                self.steps += 1;
            }
        }

        let radius = self.star_radius();
        for a in 0..self.roadmap.len() {
            for b in (a + 1)..self.roadmap.len() {
                let (pa, pb) = (self.roadmap.pos(a), self.roadmap.pos(b));
                if distance(&pa, &pb) < radius && !self.map.is_edge_collision(&pa, &pb) {
                    self.roadmap.connect(a, b);
                }
            }
        }

        self.search()
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn path(&self) -> &[Point] {
        &self.path
    }

    fn clear_nodes(&mut self) {
        self.roadmap.clear();
        self.path.clear();
        self.ran = false;
        self.complete = false;
        self.steps = 0;
        self.bench.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn open_map() -> Arc<Map> {
        let mut map = Map::new(100.0, 100.0);
        map.set_start(5.0, 5.0);
        map.set_goal(95.0, 95.0);
        Arc::new(map)
    }

    #[test]
    fn star_radius_is_infinite_then_shrinks() {
        let mut planner = PrmStar::new(open_map(), 5.0, Sampler::from_seed(6), None).unwrap();
        assert_eq!(planner.star_radius(), f64::INFINITY);
        planner.step().unwrap();
        let radius = planner.star_radius();
        assert!(radius.is_finite());
        assert!(radius > 0.0);
    }

    #[test]
    fn one_step_runs_the_whole_pipeline() {
        let mut planner = PrmStar::new(open_map(), 5.0, Sampler::from_seed(6), None).unwrap();
        planner.step().unwrap();
        assert!(planner.is_complete());
        assert!(planner.roadmap().len() > 0);
        assert!(planner.path().len() > 1);
    }

    #[test]
    fn path_endpoints_are_roadmap_nodes_near_start_and_goal() {
        let mut planner = PrmStar::new(open_map(), 5.0, Sampler::from_seed(6), None).unwrap();
        planner.step().unwrap();
        assert!(planner.is_complete());
        // BFS anchors at the nearest roadmap nodes, not the exact
        // endpoints.
        let first = planner.path()[0];
        let last = *planner.path().last().unwrap();
        let near_start = planner.roadmap.nearest(&Point::new(5.0, 5.0)).unwrap();
        let near_goal = planner.roadmap.nearest(&Point::new(95.0, 95.0)).unwrap();
        assert_eq!(first, planner.roadmap.pos(near_start));
        assert_eq!(last, planner.roadmap.pos(near_goal));
    }

    #[test]
    fn connecting_path_threads_a_gap() {
        let mut map = Map::new(100.0, 100.0);
        map.set_start(5.0, 50.0);
        map.set_goal(95.0, 50.0);
        map.add_obstacle(Rect::new(40.0, 0.0, 10.0, 40.0));
        map.add_obstacle(Rect::new(40.0, 60.0, 10.0, 40.0));
        let map = Arc::new(map);

        let opts = PrmStarOptions {
            num_samples: 1000,
            ..PrmStarOptions::default()
        };
        let mut planner =
            PrmStar::with_options(map.clone(), 5.0, Sampler::from_seed(13), None, opts).unwrap();
        planner.step().unwrap();
        assert!(planner.is_complete());
        for pair in planner.path().windows(2) {
            assert!(!map.is_edge_collision(&pair[0], &pair[1]));
        }
    }

    #[test]
    fn repeated_stepping_is_a_no_op() {
        let mut planner = PrmStar::new(open_map(), 5.0, Sampler::from_seed(6), None).unwrap();
        planner.step().unwrap();
        let nodes = planner.roadmap().len();
        let path = planner.path().to_vec();
        planner.step().unwrap();
        assert_eq!(planner.roadmap().len(), nodes);
        assert_eq!(planner.path(), path.as_slice());
    }

    #[test]
    fn clear_rearms_the_run() {
        let mut planner = PrmStar::new(open_map(), 5.0, Sampler::from_seed(6), None).unwrap();
        planner.step().unwrap();
        planner.clear_nodes();
        assert!(planner.roadmap().is_empty());
        assert!(!planner.is_complete());
        planner.step().unwrap();
        assert!(planner.is_complete());
    }
}
