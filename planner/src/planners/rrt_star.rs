use std::f64::consts::PI;
use std::sync::Arc;

use tracing::info;

use crate::benchmark::BenchmarkManager;
use crate::error::PlannerError;
use crate::geometry::{distance, Point, EPS};
use crate::map::Map;
use crate::planners::common::TreeBase;
use crate::planners::Planner;
use crate::sample::Sampler;
use crate::tree::Tree;

/// Restart when the best path cost has not improved by `threshold`
/// (relative) for `patience` consecutive post-completion steps, at most
/// `max_restarts` times.
#[derive(Debug, Clone)]
pub struct RestartPolicy {
    pub threshold: f64,
    pub patience: usize,
    pub max_restarts: usize,
}

impl Default for RestartPolicy {
    fn default() -> RestartPolicy {
        RestartPolicy {
            threshold: 0.01,
            patience: 100,
            max_restarts: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StarOptions {
    /// Probability of sampling the goal instead of a uniform point.
    pub goal_bias: f64,
    /// Re-parent near nodes through cheaper connections.
    pub rewiring: bool,
    /// After a path exists, splice direct connections between non-adjacent
    /// path nodes.
    pub shortcut: bool,
    pub restart: Option<RestartPolicy>,
    /// Near-radius cap, as a multiple of the step size.
    pub radius_cap: f64,
}

impl Default for StarOptions {
    fn default() -> StarOptions {
        StarOptions {
            goal_bias: 0.0,
            rewiring: true,
            shortcut: false,
            restart: None,
            radius_cap: 3.0,
        }
    }
}

/// Asymptotically optimal RRT: new nodes pick the cheapest collision-free
/// parent among their near set, and near nodes are rewired through the new
/// node whenever that strictly lowers their cost. Completion is not
/// terminal here; further steps keep refining the tree and the path cost
/// never increases.
pub struct RrtStar {
    base: TreeBase,
    opts: StarOptions,
    name: &'static str,
    refine: StarRefine,
}

impl RrtStar {
    pub fn new(
        map: Arc<Map>,
        step_size: f64,
        sampler: Sampler,
        manager: Option<BenchmarkManager>,
    ) -> Result<RrtStar, PlannerError> {
        Self::with_options(map, step_size, sampler, manager, StarOptions::default())
    }

    pub fn goal_biased(
        map: Arc<Map>,
        step_size: f64,
        sampler: Sampler,
        manager: Option<BenchmarkManager>,
    ) -> Result<RrtStar, PlannerError> {
        let opts = StarOptions {
            goal_bias: 0.2,
            ..StarOptions::default()
        };
        let mut planner = Self::with_options(map, step_size, sampler, manager, opts)?;
        planner.name = "rrt-star-biased";
        Ok(planner)
    }

    pub fn with_options(
        map: Arc<Map>,
        step_size: f64,
        sampler: Sampler,
        manager: Option<BenchmarkManager>,
        opts: StarOptions,
    ) -> Result<RrtStar, PlannerError> {
        validate_options(&opts)?;
        Ok(RrtStar {
            base: TreeBase::new(map, step_size, sampler, manager)?,
            opts,
            name: "rrt-star",
            refine: StarRefine::new(),
        })
    }

    pub fn tree(&self) -> &Tree {
        &self.base.tree
    }

    pub fn steps(&self) -> usize {
        self.base.steps
    }

    pub fn benchmark(&self) -> Option<&BenchmarkManager> {
        self.base.bench.manager()
    }

    /// Cost of the current path to the goal node, infinite before
    /// completion.
    pub fn path_cost(&self) -> f64 {
        match self.base.goal_idx {
            Some(goal_idx) => self.base.tree.cost(goal_idx),
            None => f64::INFINITY,
        }
    }
}

impl Planner for RrtStar {
    fn name(&self) -> &'static str {
        self.name
    }

    fn step(&mut self) -> Result<(), PlannerError> {
        self.base.bench.start();

        let sample = self
            .base
            .sampler
            .goal_biased(&self.base.map, self.opts.goal_bias);
        if grow_star(&mut self.base, &self.opts, &sample)? {
            self.base.steps += 1;
        }

        if !self.base.complete {
            self.base.complete_if_goal_reached(self.name)?;
            if self.base.complete {
                self.refine.best_cost = self.path_cost();
            }
            return Ok(());
        }

        // Refinement: rewiring already ran during growth; optionally splice
        // shortcuts, refresh the path, and restart on stagnation.
        if self.opts.shortcut {
            if let Some(goal_idx) = self.base.goal_idx {
                shortcut_once(&mut self.base.tree, &self.base.map, goal_idx)?;
            }
        }
        if let Some(goal_idx) = self.base.goal_idx {
            self.base.reconstruct(goal_idx)?;
        }

        let restarted = self
            .refine
            .observe(self.path_cost(), self.opts.restart.as_ref());
        if restarted {
            info!(planner = self.name, restarts = self.refine.restarts, "restarting tree growth");
            restart_tree(&mut self.base);
        }
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.base.complete
    }

    fn path(&self) -> &[Point] {
        &self.base.path
    }

    fn clear_nodes(&mut self) {
        self.base.clear();
        self.refine = StarRefine::new();
    }
}

pub(crate) fn validate_options(opts: &StarOptions) -> Result<(), PlannerError> {
    if !(0.0..=1.0).contains(&opts.goal_bias) {
        return Err(PlannerError::invalid(
            "goal_bias",
            format!("must be a probability, got {}", opts.goal_bias),
        ));
    }
    if opts.radius_cap < 1.0 {
        return Err(PlannerError::invalid(
            "radius_cap",
            "must be at least one step size",
        ));
    }
    Ok(())
}

/// Standard 2-D near-radius: `γ·(ln n / n)^½` with γ derived from the free
/// workspace area, capped at a small multiple of the step size to bound
/// query cost.
pub(crate) fn near_radius(map: &Map, n: usize, step_size: f64, radius_cap: f64) -> f64 {
    if n < 2 {
        return 0.0;
    }
    let d = 2.0_f64;
    let gamma = 2.0 * (1.0 + 1.0 / d).powf(1.0 / d) * (map.area() / PI).powf(1.0 / d);
    let n = n as f64;
    let radius = gamma * ((n.ln()) / n).powf(1.0 / d);
    radius.min(radius_cap * step_size)
}

/// One growth iteration of the RRT* family: steer toward the sample,
/// choose the cheapest collision-free parent among the near set, insert,
/// and rewire. Returns whether a node was added.
pub(crate) fn grow_star(
    base: &mut TreeBase,
    opts: &StarOptions,
    sample: &Point,
) -> Result<bool, PlannerError> {
    let nearest = match base.tree.nearest(sample) {
        Some(nearest) => nearest,
        None => return Ok(false),
    };
    let near_pos = base.tree.pos(nearest);
    let candidate = base.steer(&near_pos, sample);

    if distance(&near_pos, &candidate) <= EPS {
        return Ok(false);
    }
    if base.map.is_collision(&candidate) {
        return Ok(false);
    }

    let radius = near_radius(&base.map, base.tree.len(), base.step_size, opts.radius_cap);
    let near = base.tree.near_within(&candidate, radius);

    // The nearest node is the fallback parent; any near node offering a
    // cheaper collision-free connection wins.
    let mut parent = None;
    let mut best = f64::INFINITY;
    if !base.map.is_edge_collision(&near_pos, &candidate) {
        parent = Some(nearest);
        best = base.tree.cost(nearest) + distance(&near_pos, &candidate);
    }
    for &idx in &near {
        if idx == nearest {
            continue;
        }
        let pos = base.tree.pos(idx);
        if base.map.is_edge_collision(&pos, &candidate) {
            continue;
        }
        let cost = base.tree.cost(idx) + distance(&pos, &candidate);
        if cost < best {
            best = cost;
            parent = Some(idx);
        }
    }
    let parent = match parent {
        Some(parent) => parent,
        None => return Ok(false),
    };

    let new_idx = base.tree.insert_child(candidate, parent);
    if opts.rewiring {
        rewire(&mut base.tree, &base.map, new_idx, &near)?;
    }
    Ok(true)
}

/// Re-parent every near node whose cost strictly decreases by going
/// through `new_idx`. The strict-improvement check keeps ancestors of the
/// new node out (their cost can only grow through it), so the arena's
/// cycle guard only trips on genuinely broken cost accounting.
pub(crate) fn rewire(
    tree: &mut Tree,
    map: &Map,
    new_idx: usize,
    near: &[usize],
) -> Result<(), PlannerError> {
    let new_pos = tree.pos(new_idx);
    for &idx in near {
        if idx == new_idx || tree.parent(idx).is_none() {
            continue;
        }
        let pos = tree.pos(idx);
        if map.is_edge_collision(&new_pos, &pos) {
            continue;
        }
        let through = tree.cost(new_idx) + distance(&new_pos, &pos);
        if through + EPS < tree.cost(idx) {
            tree.reparent(idx, new_idx)?;
        }
    }
    Ok(())
}

/// Apply at most one shortcut: the first non-adjacent path pair with a
/// direct collision-free connection that lowers cost gets spliced. One
/// splice per call keeps the work per `step` bounded.
pub(crate) fn shortcut_once(
    tree: &mut Tree,
    map: &Map,
    goal_idx: usize,
) -> Result<bool, PlannerError> {
    let mut chain = tree.path_to_root(goal_idx)?;
    chain.reverse(); // root first
    for i in 0..chain.len().saturating_sub(2) {
        for j in ((i + 2)..chain.len()).rev() {
            let (pi, pj) = (tree.pos(chain[i]), tree.pos(chain[j]));
            if map.is_edge_collision(&pi, &pj) {
                continue;
            }
            let through = tree.cost(chain[i]) + distance(&pi, &pj);
            if through + EPS < tree.cost(chain[j]) {
                tree.reparent(chain[j], chain[i])?;
                return Ok(true);
            }
        }
    }
    Ok(false)
}

pub(crate) fn restart_tree(base: &mut TreeBase) {
    if let Some(start) = base.map.start() {
        base.tree.clear_to_root(start);
    }
    base.path.clear();
    base.goal_idx = None;
    base.complete = false;
    // Steps and benchmark state survive a restart; the run is the same.
}

/// Post-completion bookkeeping shared by the RRT* variants: best cost seen,
/// stagnation counter and restart budget.
pub(crate) struct StarRefine {
    pub best_cost: f64,
    pub since_improvement: usize,
    pub restarts: usize,
}

impl StarRefine {
    pub fn new() -> StarRefine {
        StarRefine {
            best_cost: f64::INFINITY,
            since_improvement: 0,
            restarts: 0,
        }
    }

    /// Record the current path cost; returns true when the restart policy
    /// says the tree should be discarded.
    pub fn observe(&mut self, current: f64, policy: Option<&RestartPolicy>) -> bool {
        let policy = match policy {
            Some(policy) => policy,
            None => {
                if current < self.best_cost {
                    self.best_cost = current;
                }
                return false;
            }
        };
        if current < self.best_cost * (1.0 - policy.threshold) {
            self.best_cost = current;
            self.since_improvement = 0;
            return false;
        }
        self.since_improvement += 1;
        if self.since_improvement > policy.patience && self.restarts < policy.max_restarts {
            self.since_improvement = 0;
            self.restarts += 1;
            return true;
        }
        false
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

    fn run_until_complete(planner: &mut RrtStar, max_steps: usize) -> bool {
        for _ in 0..max_steps {
            planner.step().unwrap();
            if planner.is_complete() {
                return true;
            }
        }
        false
    }

    #[test]
    fn rejects_invalid_options() {
        let opts = StarOptions {
            goal_bias: 1.5,
            ..StarOptions::default()
        };
        let err = RrtStar::with_options(open_map(), 5.0, Sampler::from_seed(0), None, opts);
        assert!(matches!(err, Err(PlannerError::InvalidParameter { .. })));
    }

    #[test]
    fn near_radius_shrinks_and_is_capped() {
        let map = Map::new(100.0, 100.0);
        let small = near_radius(&map, 10, 5.0, 3.0);
        let large = near_radius(&map, 10_000, 5.0, 3.0);
        assert!(small <= 15.0 + EPS);
        assert!(large < small);
        assert_eq!(near_radius(&map, 1, 5.0, 3.0), 0.0);
    }

    #[test]
    fn finds_a_path_and_costs_stay_consistent() {
        let mut star = RrtStar::goal_biased(open_map(), 5.0, Sampler::from_seed(9), None).unwrap();
        assert!(run_until_complete(&mut star, 5000));

        let tree = star.tree();
        for idx in 0..tree.len() {
            let chain = tree.path_to_root(idx).unwrap();
            let summed: f64 = chain
                .windows(2)
                .map(|w| distance(&tree.pos(w[0]), &tree.pos(w[1])))
                .sum();
            assert!((tree.cost(idx) - summed).abs() < 1e-9);
        }
    }

    #[test]
    fn continued_stepping_never_raises_path_cost() {
        let mut star = RrtStar::goal_biased(open_map(), 5.0, Sampler::from_seed(5), None).unwrap();
        assert!(run_until_complete(&mut star, 5000));

        let mut last = star.path_cost();
        for _ in 0..500 {
            star.step().unwrap();
            let cost = star.path_cost();
            assert!(cost <= last + EPS);
            last = cost;
        }
    }

    #[test]
    fn shortcut_straightens_a_detour() {
        // root -- a -- b, where the direct root-to-b edge is free.
        let mut tree = Tree::with_root(Point::new(0.0, 0.0));
        let a = tree.insert_child(Point::new(5.0, 5.0), 0);
        let b = tree.insert_child(Point::new(10.0, 0.0), a);
        let map = Map::new(20.0, 20.0);

        assert!(shortcut_once(&mut tree, &map, b).unwrap());
        assert_eq!(tree.parent(b), Some(0));
        assert!((tree.cost(b) - 10.0).abs() < 1e-12);
        // Nothing further to splice.
        assert!(!shortcut_once(&mut tree, &map, b).unwrap());
    }

    #[test]
    fn restart_policy_discards_a_stagnant_tree() {
        let opts = StarOptions {
            goal_bias: 0.2,
            restart: Some(RestartPolicy {
                threshold: 0.5, // near-impossible improvement bar
                patience: 5,
                max_restarts: 1,
            }),
            ..StarOptions::default()
        };
        let mut star =
            RrtStar::with_options(open_map(), 5.0, Sampler::from_seed(2), None, opts).unwrap();
        assert!(run_until_complete(&mut star, 5000));

        for _ in 0..50 {
            star.step().unwrap();
        }
        assert_eq!(star.refine.restarts, 1);
    }

    #[test]
    fn path_avoids_obstacles() {
        let mut map = Map::new(100.0, 100.0);
        map.set_start(5.0, 50.0);
        map.set_goal(95.0, 50.0);
        map.add_obstacle(Rect::new(40.0, 0.0, 10.0, 70.0));
        map.add_obstacle(Rect::new(60.0, 30.0, 10.0, 70.0));
        let map = Arc::new(map);

        let mut star = RrtStar::goal_biased(map.clone(), 5.0, Sampler::from_seed(8), None).unwrap();
        assert!(run_until_complete(&mut star, 20_000));
        for pair in star.path().windows(2) {
            assert!(!map.is_edge_collision(&pair[0], &pair[1]));
        }
    }
}
