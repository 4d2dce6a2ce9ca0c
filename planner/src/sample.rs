use std::f64::consts::TAU;

use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::Normal;

use crate::geometry::{Point, Vector};
use crate::map::Map;

/// The single source of randomness for a planner. Callers seed it
/// explicitly to make runs reproducible; every uniform, goal-biased and
/// Gaussian draw goes through this one generator.
#[derive(Debug, Clone)]
pub struct Sampler {
    rng: StdRng,
}

impl Sampler {
    pub fn from_seed(seed: u64) -> Sampler {
        Sampler {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Sampler {
        Sampler {
            rng: StdRng::from_entropy(),
        }
    }

    /// True with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        p > 0.0 && self.rng.gen::<f64>() < p
    }

    /// Uniform configuration over the workspace.
    pub fn uniform(&mut self, map: &Map) -> Point {
        Point::new(
            self.rng.gen_range(0.0..=map.width()),
            self.rng.gen_range(0.0..=map.height()),
        )
    }

    /// Uniform sample, except that with probability `bias` the goal
    /// position is returned instead (when one is set).
    pub fn goal_biased(&mut self, map: &Map, bias: f64) -> Point {
        match map.goal() {
            Some(goal) if self.chance(bias) => goal,
            _ => self.uniform(map),
        }
    }

    /// Random offset from `p`, each axis uniform in `[-step, step]`.
    pub fn offset(&mut self, p: &Point, step: f64) -> Point {
        Point::new(
            p.x + self.rng.gen_range(-step..=step),
            p.y + self.rng.gen_range(-step..=step),
        )
    }

    /// The Gaussian half of hybrid roadmap sampling: a uniform base point
    /// and a companion displaced by a normally-distributed distance in a
    /// random heading.
    pub fn gaussian_pair(&mut self, map: &Map, normal: &Normal) -> (Point, Point) {
        let base = self.uniform(map);
        let d = normal.sample(&mut self.rng).abs();
        let theta = self.rng.gen_range(0.0..TAU);
        let companion = base + Vector::new(d * theta.cos(), d * theta.sin());
        (base, companion)
    }

    /// Normally-distributed perturbation of `p` on both axes.
    pub fn gaussian_around(&mut self, p: &Point, normal: &Normal) -> Point {
        Point::new(
            p.x + normal.sample(&mut self.rng),
            p.y + normal.sample(&mut self.rng),
        )
    }

    pub fn pick_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some(self.rng.gen_range(0..len))
        }
    }
}
