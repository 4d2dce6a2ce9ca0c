use std::sync::Arc;

use plotters::prelude::*;

use planner::{Map, Planner, Rect, RrtStar, Sampler};

const SCALE: f64 = 10.0;

fn px(p: &planner::Point) -> (i32, i32) {
    ((p.x * SCALE) as i32, (p.y * SCALE) as i32)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let soft_red = RGBColor(200, 50, 50);

    let mut map = Map::new(130.0, 130.0);
    map.set_start(65.0, 65.0);
    map.set_goal(5.0, 5.0);
    map.add_obstacle(Rect::new(10.0, 10.0, 50.0, 50.0));
    map.add_obstacle(Rect::new(70.0, 10.0, 50.0, 50.0));
    map.add_obstacle(Rect::new(10.0, 70.0, 50.0, 50.0));
    map.add_obstacle(Rect::new(70.0, 70.0, 50.0, 50.0));
    let map = Arc::new(map);

    let mut planner = RrtStar::goal_biased(map.clone(), 2.0, Sampler::from_entropy(), None)?;
    for _ in 0..60_000 {
        planner.step()?;
    }

    eprintln!("Used {} steps", planner.steps());
    if planner.is_complete() {
        println!("Cost: {}", planner.path_cost());
    } else {
        eprintln!("No solution was found!");
    }

    let root = BitMapBackend::new("tree.png", (1300, 1300)).into_drawing_area();
    root.fill(&WHITE)?;

    for rect in map.obstacles() {
        root.draw(&Rectangle::new(
            [
                ((rect.x * SCALE) as i32, (rect.y * SCALE) as i32),
                (
                    ((rect.x + rect.w) * SCALE) as i32,
                    ((rect.y + rect.h) * SCALE) as i32,
                ),
            ],
            ShapeStyle::from(&soft_red).filled(),
        ))?;
    }

    if let Some(goal) = map.goal() {
        root.draw(&Circle::new(px(&goal), 10, ShapeStyle::from(&GREEN).filled()))?;
    }
    if let Some(start) = map.start() {
        root.draw(&Circle::new(px(&start), 10, ShapeStyle::from(&MAGENTA).filled()))?;
    }

    let grey = RGBColor(0, 0, 0).mix(0.5);
    let tree = planner.tree();
    for idx in 0..tree.len() {
        if let Some(parent) = tree.parent(idx) {
            let series = vec![px(&tree.pos(idx)), px(&tree.pos(parent))];
            root.draw(&PathElement::new(series, ShapeStyle::from(&grey)))?;
            root.draw(&Circle::new(
                px(&tree.pos(idx)),
                2,
                ShapeStyle::from(&grey).filled(),
            ))?;
        }
    }

    let series: Vec<_> = planner.path().iter().map(px).collect();
    root.draw(&PathElement::new(
        series,
        ShapeStyle::from(&BLUE).stroke_width(3),
    ))?;

    root.present()?;
    Ok(())
}
