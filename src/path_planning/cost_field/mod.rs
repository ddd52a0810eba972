//! Obstacle cost field
//!
//! Turns obstacle polygons into a road-relative (station, latitude) cost
//! grid in four stages:
//!
//! 1. `rasterize`: obstacles into vehicle-frame XY grids, one static grid
//!    and one grid per dynamic time layer
//! 2. `reproject`: XY grids into SL grids along the centerline
//! 3. `dilate`: lethal and hazard margins on the static SL grid
//! 4. `combine`: lane-position cost plus occupancy, with `INFEASIBLE` cells
//!
//! Every stage writes a fresh grid into [`CycleGrids`]; nothing carries over
//! between planning cycles.

pub mod combine;
pub mod dilate;
pub mod grid;
pub mod rasterize;
pub mod reproject;

pub use combine::{LaneCost, INFEASIBLE};
pub use dilate::AxisRadii;
pub use grid::Grid;
pub use rasterize::{Margins, HAZARD, LETHAL};

use crate::common::types::Point2D;
use crate::config::PlannerConfig;
use crate::lane::Centerline;
use crate::obstacles::{DynamicObstacle, StaticObstacle};

/// Per-cycle grids produced by each stage
#[derive(Debug, Clone)]
pub struct CycleGrids {
    pub xy_static: Grid,
    pub xy_dynamic: Vec<Grid>,
    pub sl_static: Grid,
    pub sl_dilated: Grid,
    pub sl_dynamic: Vec<Grid>,
    pub sl_cost: Grid,
}

/// Read-only cost lookups for one planning cycle
#[derive(Debug, Clone)]
pub struct CostField {
    grids: CycleGrids,
    layer_duration: f64,
}

impl CostField {
    /// Run the whole pipeline. Obstacles must already be in the vehicle frame.
    pub fn build(
        config: &PlannerConfig,
        centerline: &Centerline,
        static_obstacles: &[StaticObstacle],
        dynamic_obstacles: &[DynamicObstacle],
    ) -> Self {
        let mut xy_static = xy_grid(config, centerline);
        let mut xy_dynamic = vec![Grid::like(&xy_static); config.num_dynamic_layers];
        rasterize::rasterize_static(&mut xy_static, static_obstacles);
        let margins = Margins {
            lethal_s: config.lethal_dilation_s,
            lethal_l: config.lethal_dilation_l,
            hazard_s: config.hazard_dilation_s,
            hazard_l: config.hazard_dilation_l,
        };
        rasterize::rasterize_dynamic(
            &mut xy_dynamic,
            dynamic_obstacles,
            config.dynamic_layer_duration,
            &margins,
        );

        let mut sl_static = sl_grid(config, centerline);
        reproject::reproject(&xy_static, &mut sl_static, centerline);
        let sl_dynamic = xy_dynamic
            .iter()
            .map(|xy| {
                let mut sl = Grid::like(&sl_static);
                reproject::reproject(xy, &mut sl, centerline);
                sl
            })
            .collect();

        let sl_dilated = dilate::dilate(
            &sl_static,
            AxisRadii::from_meters(
                config.lethal_dilation_s,
                config.hazard_dilation_s,
                config.sl_station_cell_size,
            ),
            AxisRadii::from_meters(
                config.lethal_dilation_l,
                config.hazard_dilation_l,
                config.sl_latitude_cell_size,
            ),
        );
        let sl_cost = combine::combine(&sl_dilated, &LaneCost::from_planner_config(config));

        Self {
            grids: CycleGrids {
                xy_static,
                xy_dynamic,
                sl_static,
                sl_dilated,
                sl_dynamic,
                sl_cost,
            },
            layer_duration: config.dynamic_layer_duration,
        }
    }

    pub fn grids(&self) -> &CycleGrids {
        &self.grids
    }

    pub fn num_layers(&self) -> usize {
        self.grids.sl_dynamic.len()
    }

    pub fn layer_duration(&self) -> f64 {
        self.layer_duration
    }

    /// Static cost at a road position; `None` off the grid
    pub fn static_cost(&self, station: f64, latitude: f64) -> Option<f32> {
        self.grids.sl_cost.value_at(Point2D::new(station, latitude))
    }

    /// Dynamic occupancy at a road position and time. Times past the last
    /// layer read as free; positions off the grid give `None`.
    pub fn dynamic_occupancy(&self, station: f64, latitude: f64, time: f64) -> Option<f32> {
        let p = Point2D::new(station, latitude);
        let layer = (time.max(0.0) / self.layer_duration).floor() as usize;
        match self.grids.sl_dynamic.get(layer) {
            Some(grid) => grid.value_at(p),
            None => self.grids.sl_cost.cell_of(p).map(|_| 0.0),
        }
    }
}

/// Vehicle-frame grid around the centerline, wide enough for every latitude
fn xy_grid(config: &PlannerConfig, centerline: &Centerline) -> Grid {
    let reach = config.lane_width.max(config.lane_shoulder_latitude) + config.grid_margin;
    let (mut min, mut max) = (
        Point2D::new(f64::INFINITY, f64::INFINITY),
        Point2D::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
    );
    for sample in centerline.samples() {
        min.x = min.x.min(sample.pose.x);
        min.y = min.y.min(sample.pose.y);
        max.x = max.x.max(sample.pose.x);
        max.y = max.y.max(sample.pose.y);
    }
    Grid::covering(
        Point2D::new(min.x - reach, min.y - reach),
        Point2D::new(max.x + reach, max.y + reach),
        (config.xy_grid_cell_size, config.xy_grid_cell_size),
    )
}

/// SL grid over the centerline's station range. Rows are symmetric about
/// latitude zero and extend one cell past the shoulder.
fn sl_grid(config: &PlannerConfig, centerline: &Centerline) -> Grid {
    let cs = config.sl_station_cell_size;
    let cl = config.sl_latitude_cell_size;
    let width =
        ((centerline.end_station() - centerline.start_station()) / cs).floor() as usize + 1;
    let half = (config.lane_shoulder_latitude / cl).ceil() as usize + 1;
    Grid::centered(
        Point2D::new(centerline.start_station(), -(half as f64) * cl),
        (cs, cl),
        width,
        2 * half + 1,
    )
}
