//! Sampling-based motion planning over a 2-D workspace with rectangular
//! obstacles. Tree methods (RRT and friends) grow from the start toward
//! the goal; roadmap methods (PRM and friends) sample the whole workspace
//! and search the resulting graph. All of them implement the [`Planner`]
//! stepping contract: the caller drives progress one `step` at a time and
//! owns the stop condition.

pub mod benchmark;
pub mod error;
pub mod geometry;
pub mod map;
pub mod planners;
pub mod roadmap;
pub mod sample;
pub mod tree;

pub use benchmark::{BenchmarkManager, BenchmarkResult};
pub use error::PlannerError;
pub use geometry::{Point, Rect};
pub use map::Map;
pub use planners::{
    FRrtStar, Planner, Prm, PrmStar, RandomWalk, RestartPolicy, Rrt, RrtConnect, RrtStar,
    StarOptions,
};
pub use sample::Sampler;
