pub(crate) mod common;

pub mod f_rrt_star;
pub mod prm;
pub mod prm_star;
pub mod random_walk;
pub mod rrt;
pub mod rrt_connect;
pub mod rrt_star;

pub use f_rrt_star::FRrtStar;
pub use prm::{Prm, PrmOptions};
pub use prm_star::{PrmStar, PrmStarOptions};
pub use random_walk::RandomWalk;
pub use rrt::Rrt;
pub use rrt_connect::RrtConnect;
pub use rrt_star::{RestartPolicy, RrtStar, StarOptions};

use crate::error::PlannerError;
use crate::geometry::Point;

/// The stepping contract every planning strategy implements. A caller
/// drives progress by invoking `step` in a loop until `is_complete`; each
/// call does bounded work and never blocks. Non-completion on a blocked
/// goal is a caller concern (timeout), not a planner error.
pub trait Planner {
    /// Short identifier used in benchmark results and logs.
    fn name(&self) -> &'static str;

    /// Advance by one unit of work. A step that fails to produce a
    /// candidate performs no mutation; calling after completion is safe.
    fn step(&mut self) -> Result<(), PlannerError>;

    fn is_complete(&self) -> bool;

    /// The reconstructed start-to-goal path; empty until completion.
    fn path(&self) -> &[Point];

    /// Reset to a single root at the current start, discarding all
    /// tree/roadmap state.
    fn clear_nodes(&mut self);
}
