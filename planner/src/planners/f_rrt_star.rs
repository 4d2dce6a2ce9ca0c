use std::sync::Arc;

use tracing::info;

use crate::benchmark::BenchmarkManager;
use crate::error::PlannerError;
use crate::geometry::{distance, Point, EPS};
use crate::map::Map;
use crate::planners::common::TreeBase;
use crate::planners::rrt_star::{
    near_radius, restart_tree, rewire, shortcut_once, validate_options, StarOptions, StarRefine,
};
use crate::planners::Planner;
use crate::sample::Sampler;
use crate::tree::Tree;

const DICHOTOMY_TOLERANCE: f64 = 0.01;

/// F-RRT*: instead of hanging new nodes off the nearest node, walk up its
/// ancestor chain to the furthest ancestor that can still see the sample
/// (the "reachest" ancestor), then create an intermediate node between the
/// two by bisection. The straightened connections give much cheaper paths
/// early; rewiring, shortcutting and restarting work as in RRT*.
pub struct FRrtStar {
    base: TreeBase,
    opts: StarOptions,
    dichotomy_tolerance: f64,
    refine: StarRefine,
}

impl FRrtStar {
    pub fn new(
        map: Arc<Map>,
        step_size: f64,
        sampler: Sampler,
        manager: Option<BenchmarkManager>,
    ) -> Result<FRrtStar, PlannerError> {
        let opts = StarOptions {
            shortcut: true,
            radius_cap: 10.0,
            ..StarOptions::default()
        };
        Self::with_options(map, step_size, sampler, manager, opts)
    }

    pub fn with_options(
        map: Arc<Map>,
        step_size: f64,
        sampler: Sampler,
        manager: Option<BenchmarkManager>,
        opts: StarOptions,
    ) -> Result<FRrtStar, PlannerError> {
        validate_options(&opts)?;
        Ok(FRrtStar {
            base: TreeBase::new(map, step_size, sampler, manager)?,
            opts,
            dichotomy_tolerance: DICHOTOMY_TOLERANCE,
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

    pub fn path_cost(&self) -> f64 {
        match self.base.goal_idx {
            Some(goal_idx) => self.base.tree.cost(goal_idx),
            None => f64::INFINITY,
        }
    }

    /// Furthest ancestor of `from` whose direct edge to the sample is
    /// collision-free. Bounded by the node count.
    fn find_reachest(&self, from: usize, sample: &Point) -> Result<usize, PlannerError> {
        let tree = &self.base.tree;
        let mut current = from;
        let mut hops = 0;
        while let Some(parent) = tree.parent(current) {
            if self
                .base
                .map
                .is_edge_collision(&tree.pos(parent), sample)
            {
                break;
            }
            current = parent;
            hops += 1;
            if hops > tree.len() {
                return Err(PlannerError::Inconsistency(
                    "ancestor walk exceeded the node count",
                ));
            }
        }
        Ok(current)
    }

    /// Bisect between the reachest ancestor and the sample: `allow` stays
    /// visible from the ancestor, `forbid` does not, and they converge
    /// until their separation drops below the tolerance. Returns the final
    /// allowed position, or `None` when no progress was possible.
    fn dichotomy(&self, reachest: usize, sample: &Point) -> Option<Point> {
        let anchor = self.base.tree.pos(reachest);
        if !self.base.map.is_collision(sample)
            && !self.base.map.is_edge_collision(&anchor, sample)
        {
            return Some(*sample);
        }

        let mut allow = anchor;
        let mut forbid = *sample;
        while distance(&allow, &forbid) > self.dichotomy_tolerance {
            let mid = nalgebra::center(&allow, &forbid);
            if self.base.map.is_collision(&mid)
                || self.base.map.is_edge_collision(&anchor, &mid)
            {
                forbid = mid;
            } else {
                allow = mid;
            }
        }

        if distance(&allow, &anchor) <= EPS {
            None
        } else {
            Some(allow)
        }
    }
}

impl Planner for FRrtStar {
    fn name(&self) -> &'static str {
        "f-rrt-star"
    }

    fn step(&mut self) -> Result<(), PlannerError> {
        self.base.bench.start();

        let sample = self
            .base
            .sampler
            .goal_biased(&self.base.map, self.opts.goal_bias);
        let nearest = match self.base.tree.nearest(&sample) {
            Some(nearest) => nearest,
            None => return Ok(()),
        };
        let near_pos = self.base.tree.pos(nearest);
        let candidate = self.base.steer(&near_pos, &sample);

        if distance(&near_pos, &candidate) > EPS && !self.base.map.is_collision(&candidate) {
            let reachest = self.find_reachest(nearest, &sample)?;
            if let Some(create_pos) = self.dichotomy(reachest, &sample) {
                let create_idx = self.base.tree.insert_child(create_pos, reachest);

                // Hang the steered candidate off the intermediate node when
                // it is visible from there.
                let anchor_for_rewire = if distance(&create_pos, &candidate) > EPS
                    && !self.base.map.is_collision(&candidate)
                    && !self.base.map.is_edge_collision(&create_pos, &candidate)
                {
                    self.base.tree.insert_child(candidate, create_idx)
                } else {
                    create_idx
                };
                self.base.steps += 1;

                if self.opts.rewiring {
                    let pos = self.base.tree.pos(anchor_for_rewire);
                    let radius = near_radius(
                        &self.base.map,
                        self.base.tree.len(),
                        self.base.step_size,
                        self.opts.radius_cap,
                    );
                    let near = self.base.tree.near_within(&pos, radius);
                    rewire(&mut self.base.tree, &self.base.map, anchor_for_rewire, &near)?;
                }
            }
        }

        if !self.base.complete {
            self.base.complete_if_goal_reached(self.name())?;
            if self.base.complete {
                self.refine.best_cost = self.path_cost();
            }
            return Ok(());
        }

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
            info!(restarts = self.refine.restarts, "restarting tree growth");
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
