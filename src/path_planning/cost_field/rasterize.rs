//! Obstacle rasterization into vehicle-frame XY grids
//!
//! Polygons are split into triangles and filled with an edge-function test
//! at every cell center inside the triangle's bounding box.

use rayon::prelude::*;

use crate::common::types::Point2D;
use crate::obstacles::{triangulate, DynamicObstacle, StaticObstacle};

use super::grid::Grid;

/// Occupancy value for lethal footprints
pub const LETHAL: f32 = 1.0;
/// Occupancy value for hazard footprints
pub const HAZARD: f32 = 0.5;

/// Margins grown around obstacle footprints [m]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub lethal_s: f64,
    pub lethal_l: f64,
    pub hazard_s: f64,
    pub hazard_l: f64,
}

fn edge(a: Point2D, b: Point2D, p: Point2D) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Raise every cell whose center lies inside the triangle to `value`
pub fn rasterize_triangle(grid: &mut Grid, tri: &[Point2D; 3], value: f32) {
    let min = Point2D::new(
        tri.iter().map(|p| p.x).fold(f64::INFINITY, f64::min),
        tri.iter().map(|p| p.y).fold(f64::INFINITY, f64::min),
    );
    let max = Point2D::new(
        tri.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max),
        tri.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max),
    );
    let Some(((c0, r0), (c1, r1))) = grid.cell_range(min, max) else {
        return;
    };

    let [a, b, c] = *tri;
    for row in r0..=r1 {
        for col in c0..=c1 {
            let p = grid.cell_center(col, row);
            let w0 = edge(b, c, p);
            let w1 = edge(c, a, p);
            let w2 = edge(a, b, p);
            let inside = (w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0)
                || (w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0);
            if inside {
                grid.raise(col, row, value);
            }
        }
    }
}

pub fn rasterize_polygon(grid: &mut Grid, vertices: &[Point2D], value: f32) {
    for tri in triangulate(vertices) {
        rasterize_triangle(grid, &tri, value);
    }
}

/// Static obstacles at their true size; margins are applied later by
/// dilation in road coordinates
pub fn rasterize_static(grid: &mut Grid, obstacles: &[StaticObstacle]) {
    for obstacle in obstacles {
        rasterize_polygon(grid, &obstacle.vertices(0.0, 0.0), LETHAL);
    }
}

/// Dynamic obstacles swept over each layer's time window. The hazard
/// footprint is drawn first so the lethal one overrides it.
pub fn rasterize_dynamic(
    layers: &mut [Grid],
    obstacles: &[DynamicObstacle],
    layer_duration: f64,
    margins: &Margins,
) {
    layers.par_iter_mut().enumerate().for_each(|(k, grid)| {
        let t0 = k as f64 * layer_duration;
        let t1 = t0 + layer_duration;
        for obstacle in obstacles {
            let hazard = obstacle.vertices_in_time_range(t0, t1, margins.hazard_s, margins.hazard_l);
            rasterize_polygon(grid, &hazard, HAZARD);
            let lethal = obstacle.vertices_in_time_range(t0, t1, margins.lethal_s, margins.lethal_l);
            rasterize_polygon(grid, &lethal, LETHAL);
        }
    });
}
