use std::fmt;
use std::time::{Duration, Instant};

use itertools::Itertools;
use tracing::warn;

use crate::geometry::{distance, Point};

/// Everything the reporting layer needs to know about one completed run.
/// Created once per run, immutable thereafter.
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub algorithm: &'static str,
    pub steps: usize,
    pub duration: Duration,
    pub start: Point,
    pub goal: Point,
    pub step_size: f64,
    pub path_cost: f64,
    pub path: Vec<Point>,
}

impl fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: length={:.2}, steps={}, time={:.4}s",
            self.algorithm,
            self.path_cost,
            self.steps,
            self.duration.as_secs_f64(),
        )
    }
}

/// Accumulates results across repeated runs.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkManager {
    results: Vec<BenchmarkResult>,
}

impl BenchmarkManager {
    pub fn new() -> BenchmarkManager {
        BenchmarkManager::default()
    }

    pub fn add_result(&mut self, result: BenchmarkResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[BenchmarkResult] {
        &self.results
    }

    pub fn last_result(&self) -> Option<&BenchmarkResult> {
        self.results.last()
    }

    pub fn clear_results(&mut self) {
        self.results.clear();
    }

    pub fn log_results(&self) {
        for result in &self.results {
            tracing::info!(%result, "benchmark result");
        }
    }
}

pub fn path_length(path: &[Point]) -> f64 {
    path.iter().tuple_windows().map(|(a, b)| distance(a, b)).sum()
}

/// Per-planner timing state around an optional manager. When no manager is
/// attached, timing is skipped entirely and completion merely logs a
/// warning; the run itself still succeeds.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkTimer {
    manager: Option<BenchmarkManager>,
    started: Option<Instant>,
    finalized: bool,
}

impl BenchmarkTimer {
    pub fn new(manager: Option<BenchmarkManager>) -> BenchmarkTimer {
        BenchmarkTimer {
            manager,
            started: None,
            finalized: false,
        }
    }

    /// Start the clock on the first call; later calls are no-ops.
    pub fn start(&mut self) {
        if self.manager.is_some() && self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    /// Emit at most one result per successful run.
    pub fn finalize(
        &mut self,
        algorithm: &'static str,
        steps: usize,
        start: Option<Point>,
        goal: Option<Point>,
        step_size: f64,
        path: &[Point],
    ) {
        if self.finalized {
            return;
        }
        let manager = match self.manager.as_mut() {
            Some(manager) => manager,
            None => {
                warn!(algorithm, "no benchmark manager attached; run not recorded");
                return;
            }
        };
        let started = match self.started {
            Some(started) => started,
            None => {
                warn!(algorithm, "benchmark clock never started; run not recorded");
                return;
            }
        };
        let (start, goal) = match (start, goal) {
            (Some(start), Some(goal)) => (start, goal),
            _ => return,
        };

        manager.add_result(BenchmarkResult {
            algorithm,
            steps,
            duration: started.elapsed(),
            start,
            goal,
            step_size,
            path_cost: path_length(path),
            path: path.to_vec(),
        });
        self.finalized = true;
    }

    /// Rearm for a fresh run (between benchmark repetitions or after
    /// re-anchoring); accumulated results are kept.
    pub fn reset(&mut self) {
        self.started = None;
        self.finalized = false;
    }

    pub fn manager(&self) -> Option<&BenchmarkManager> {
        self.manager.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_length_sums_consecutive_edges() {
        let path = [
            Point::new(0.0, 0.0),
            Point::new(3.0, 4.0),
            Point::new(3.0, 10.0),
        ];
        assert_eq!(path_length(&path), 11.0);
        assert_eq!(path_length(&path[..1]), 0.0);
        assert_eq!(path_length(&[]), 0.0);
    }

    #[test]
    fn finalize_records_exactly_once() {
        let mut timer = BenchmarkTimer::new(Some(BenchmarkManager::new()));
        timer.start();
        let path = [Point::new(0.0, 0.0), Point::new(3.0, 4.0)];
        let start = Some(Point::new(0.0, 0.0));
        let goal = Some(Point::new(3.0, 4.0));

        timer.finalize("test", 10, start, goal, 1.0, &path);
        timer.finalize("test", 20, start, goal, 1.0, &path);

        let manager = timer.manager().unwrap();
        assert_eq!(manager.results().len(), 1);
        let result = manager.last_result().unwrap();
        assert_eq!(result.steps, 10);
        assert_eq!(result.path_cost, 5.0);
    }

    #[test]
    fn absent_manager_is_not_an_error() {
        let mut timer = BenchmarkTimer::new(None);
        timer.start();
        timer.finalize("test", 1, None, None, 1.0, &[]);
        assert!(timer.manager().is_none());
    }

    #[test]
    fn reset_rearms_the_timer() {
        let mut timer = BenchmarkTimer::new(Some(BenchmarkManager::new()));
        timer.start();
        let start = Some(Point::new(0.0, 0.0));
        let goal = Some(Point::new(1.0, 0.0));
        timer.finalize("test", 1, start, goal, 1.0, &[]);
        timer.reset();
        timer.start();
        timer.finalize("test", 2, start, goal, 1.0, &[]);
        assert_eq!(timer.manager().unwrap().results().len(), 2);
    }
}
