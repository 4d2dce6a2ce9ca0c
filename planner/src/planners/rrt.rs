use std::sync::Arc;

use crate::benchmark::BenchmarkManager;
use crate::error::PlannerError;
use crate::geometry::{distance, Point, EPS};
use crate::map::Map;
use crate::planners::common::TreeBase;
use crate::planners::Planner;
use crate::sample::Sampler;
use crate::tree::Tree;

const GOAL_BIAS: f64 = 0.3;

/// Rapidly-exploring random tree: sample, find the nearest node, steer by
/// at most the step size, attach if the node and its edge are
/// collision-free. The goal-biased variant returns the goal as the sample
/// with fixed probability.
pub struct Rrt {
    base: TreeBase,
    bias: f64,
    name: &'static str,
}

impl Rrt {
    pub fn new(
        map: Arc<Map>,
        step_size: f64,
        sampler: Sampler,
        manager: Option<BenchmarkManager>,
    ) -> Result<Rrt, PlannerError> {
        Ok(Rrt {
            base: TreeBase::new(map, step_size, sampler, manager)?,
            bias: 0.0,
            name: "rrt",
        })
    }

    pub fn goal_biased(
        map: Arc<Map>,
        step_size: f64,
        sampler: Sampler,
        manager: Option<BenchmarkManager>,
    ) -> Result<Rrt, PlannerError> {
        Ok(Rrt {
            base: TreeBase::new(map, step_size, sampler, manager)?,
            bias: GOAL_BIAS,
            name: "rrt-goal-biased",
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
}

impl Planner for Rrt {
    fn name(&self) -> &'static str {
        self.name
    }

    fn step(&mut self) -> Result<(), PlannerError> {
        if self.base.complete {
            return Ok(());
        }
        self.base.bench.start();

        let sample = self.base.sampler.goal_biased(&self.base.map, self.bias);
        let nearest = match self.base.tree.nearest(&sample) {
            Some(nearest) => nearest,
            None => return Ok(()),
        };
        let near_pos = self.base.tree.pos(nearest);
        let candidate = self.base.steer(&near_pos, &sample);

        if distance(&near_pos, &candidate) <= EPS {
            return Ok(());
        }
        if self.base.map.is_collision(&candidate)
            || self.base.map.is_edge_collision(&near_pos, &candidate)
        {
            return Ok(());
        }

        self.base.tree.insert_child(candidate, nearest);
        self.base.steps += 1;
        self.base.complete_if_goal_reached(self.name)?;
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
    }
}
