use crate::geometry::{Point, Rect};

/// The 2-D workspace: rectangular bounds, optional start and goal
/// configurations, and an ordered list of rectangular obstacles. Planners
/// hold the map behind an `Arc` and only ever read it during a run.
#[derive(Debug, Clone)]
pub struct Map {
    width: f64,
    height: f64,
    start: Option<Point>,
    goal: Option<Point>,
    obstacles: Vec<Rect>,
}

impl Map {
    pub fn new(width: f64, height: f64) -> Map {
        debug_assert!(width > 0.0 && height > 0.0);
        Map {
            width,
            height,
            start: None,
            goal: None,
            obstacles: Vec::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn set_start(&mut self, x: f64, y: f64) {
        self.start = Some(Point::new(x, y));
    }

    pub fn set_goal(&mut self, x: f64, y: f64) {
        self.goal = Some(Point::new(x, y));
    }

    pub fn start(&self) -> Option<Point> {
        self.start
    }

    pub fn goal(&self) -> Option<Point> {
        self.goal
    }

    pub fn add_obstacle(&mut self, rect: Rect) {
        self.obstacles.push(rect);
    }

    pub fn obstacles(&self) -> &[Rect] {
        &self.obstacles
    }

    pub fn reset(&mut self) {
        self.start = None;
        self.goal = None;
        self.obstacles.clear();
    }

    /// Bounds are inclusive on all four sides.
    pub fn in_bounds(&self, p: &Point) -> bool {
        (0.0..=self.width).contains(&p.x) && (0.0..=self.height).contains(&p.y)
    }

    /// A point collides when it leaves the workspace or lands inside (or on
    /// the boundary of) any obstacle.
    pub fn is_collision(&self, p: &Point) -> bool {
        !self.in_bounds(p) || self.obstacles.iter().any(|o| o.contains(p))
    }

    /// True when the segment crosses any boundary edge of any obstacle.
    pub fn is_edge_collision(&self, from: &Point, to: &Point) -> bool {
        self.obstacles
            .iter()
            .any(|o| o.intersects_segment(from, to))
    }

    /// Clamp a point back into the workspace bounds.
    pub fn clamp(&self, p: Point) -> Point {
        Point::new(p.x.clamp(0.0, self.width), p.y.clamp(0.0, self.height))
    }
}
