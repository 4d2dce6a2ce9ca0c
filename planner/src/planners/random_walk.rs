use std::sync::Arc;

use crate::benchmark::BenchmarkManager;
use crate::error::PlannerError;
use crate::geometry::{distance, Point, EPS};
use crate::map::Map;
use crate::planners::common::TreeBase;
use crate::planners::Planner;
use crate::sample::Sampler;
use crate::tree::Tree;

const GOAL_BIAS: f64 = 0.5;

/// Baseline strategy: wander from the latest node by a bounded random
/// offset. The biased variant heads straight for the goal half the time.
/// Useful only as a benchmark floor for the real planners.
pub struct RandomWalk {
    base: TreeBase,
    bias: f64,
    name: &'static str,
}

impl RandomWalk {
    pub fn new(
        map: Arc<Map>,
        step_size: f64,
        sampler: Sampler,
        manager: Option<BenchmarkManager>,
    ) -> Result<RandomWalk, PlannerError> {
        Ok(RandomWalk {
            base: TreeBase::new(map, step_size, sampler, manager)?,
            bias: 0.0,
            name: "random-walk",
        })
    }

    pub fn goal_biased(
        map: Arc<Map>,
        step_size: f64,
        sampler: Sampler,
        manager: Option<BenchmarkManager>,
    ) -> Result<RandomWalk, PlannerError> {
        Ok(RandomWalk {
            base: TreeBase::new(map, step_size, sampler, manager)?,
            bias: GOAL_BIAS,
            name: "random-walk-biased",
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

impl Planner for RandomWalk {
    fn name(&self) -> &'static str {
        self.name
    }

    fn step(&mut self) -> Result<(), PlannerError> {
        if self.base.complete {
            return Ok(());
        }
        self.base.bench.start();

        let last = match self.base.tree.latest() {
            Some(last) => last,
            None => return Ok(()),
        };
        let last_pos = self.base.tree.pos(last);

        let candidate = match self.base.map.goal() {
            Some(goal) if self.base.sampler.chance(self.bias) => self.base.steer(&last_pos, &goal),
            _ => {
                let step = self.base.step_size;
                self.base.sampler.offset(&last_pos, step)
            }
        };
        let candidate = self.base.map.clamp(candidate);

        if distance(&last_pos, &candidate) <= EPS {
            return Ok(());
        }
        if self.base.map.is_collision(&candidate)
            || self.base.map.is_edge_collision(&last_pos, &candidate)
        {
            return Ok(());
        }

        self.base.tree.insert_child(candidate, last);
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

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_map() -> Arc<Map> {
        let mut map = Map::new(20.0, 20.0);
        map.set_start(2.0, 2.0);
        map.set_goal(18.0, 18.0);
        Arc::new(map)
    }

    #[test]
    fn requires_a_start() {
        let map = Arc::new(Map::new(10.0, 10.0));
        let err = RandomWalk::new(map, 2.0, Sampler::from_seed(0), None);
        assert!(matches!(err, Err(PlannerError::MissingStart)));
    }

    #[test]
    fn biased_walk_reaches_the_goal_on_an_empty_map() {
        let mut walk =
            RandomWalk::goal_biased(tiny_map(), 2.0, Sampler::from_seed(11), None).unwrap();
        for _ in 0..20_000 {
            walk.step().unwrap();
            if walk.is_complete() {
                break;
            }
        }
        assert!(walk.is_complete());
        assert_eq!(walk.path()[0], Point::new(2.0, 2.0));
        assert_eq!(*walk.path().last().unwrap(), Point::new(18.0, 18.0));
    }

    #[test]
    fn clear_nodes_resets_to_the_root() {
        let mut walk = RandomWalk::new(tiny_map(), 2.0, Sampler::from_seed(1), None).unwrap();
        for _ in 0..50 {
            walk.step().unwrap();
        }
        walk.clear_nodes();
        assert_eq!(walk.tree().len(), 1);
        assert_eq!(walk.tree().pos(0), Point::new(2.0, 2.0));
        assert!(walk.path().is_empty());
        assert_eq!(walk.steps(), 0);
    }
}
