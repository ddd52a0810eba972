//! Lane-position cost combined with dilated obstacle occupancy

use rayon::prelude::*;

use crate::config::PlannerConfig;

use super::grid::Grid;
use super::rasterize::LETHAL;

/// Cost sentinel for cells that must not be entered
pub const INFEASIBLE: f32 = -1.0;

/// Lane-position cost knobs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneCost {
    pub center_band: f64,
    pub slope: f64,
    pub shoulder_latitude: f64,
    pub preference: f64,
    pub preference_discount: f64,
    pub obstacle_hazard_cost: f64,
}

impl LaneCost {
    pub fn from_planner_config(config: &PlannerConfig) -> Self {
        Self {
            center_band: config.lane_center_band,
            slope: config.lane_cost_slope,
            shoulder_latitude: config.lane_shoulder_latitude,
            preference: config.lane_preference,
            preference_discount: config.lane_preference_discount,
            obstacle_hazard_cost: config.obstacle_hazard_cost,
        }
    }

    /// Cost of driving at `latitude` on an empty road, `None` past the shoulder
    pub fn lane_cost(&self, latitude: f64) -> Option<f64> {
        let distance = latitude.abs();
        if distance > self.shoulder_latitude {
            return None;
        }
        let mut cost = self.slope * (distance - self.center_band).max(0.0);
        let preferred_side = self.preference != 0.0
            && latitude != 0.0
            && latitude.signum() == self.preference.signum();
        if preferred_side {
            cost *= 1.0 - self.preference_discount;
        }
        Some(cost)
    }

    pub fn cell_cost(&self, latitude: f64, occupancy: f32) -> f32 {
        if occupancy >= LETHAL {
            return INFEASIBLE;
        }
        match self.lane_cost(latitude) {
            Some(lane) => (lane + self.obstacle_hazard_cost * occupancy as f64) as f32,
            None => INFEASIBLE,
        }
    }
}

/// Static SL cost grid from dilated occupancy (rows = latitude)
pub fn combine(occupancy: &Grid, lane: &LaneCost) -> Grid {
    let width = occupancy.width();
    let mut cost = Grid::like(occupancy);
    cost.data_mut()
        .par_chunks_mut(width)
        .zip(occupancy.data().par_chunks(width))
        .enumerate()
        .for_each(|(row, (out, occ))| {
            let latitude = occupancy.row_center(row);
            for (c, &o) in out.iter_mut().zip(occ) {
                *c = lane.cell_cost(latitude, o);
            }
        });
    cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Point2D;
    use crate::path_planning::cost_field::rasterize::HAZARD;

    fn lane() -> LaneCost {
        LaneCost::from_planner_config(&PlannerConfig::default())
    }

    #[test]
    fn test_lane_cost_profile() {
        let lane = lane();
        assert_eq!(lane.lane_cost(0.0), Some(0.0));
        assert_eq!(lane.lane_cost(0.2), Some(0.0));
        let c = lane.lane_cost(1.3).unwrap();
        assert!((c - 2.0).abs() < 1e-12);
        assert_eq!(lane.lane_cost(-4.5), None);
    }

    #[test]
    fn test_preferred_side_discounted() {
        let lane = LaneCost {
            preference: -1.0,
            ..lane()
        };
        let right = lane.lane_cost(-1.3).unwrap();
        let left = lane.lane_cost(1.3).unwrap();
        assert!((right - 1.5).abs() < 1e-12);
        assert!((left - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_beyond_shoulder_infeasible_regardless_of_occupancy() {
        let mut occupancy = Grid::centered(Point2D::new(0.0, -5.0), (1.0, 0.5), 3, 21);
        for row in 0..occupancy.height() {
            occupancy.set(1, row, HAZARD);
        }
        let cost = combine(&occupancy, &lane());
        for row in 0..cost.height() {
            let latitude = cost.row_center(row);
            for col in 0..cost.width() {
                let v = cost.get(col, row);
                if latitude.abs() > 4.0 {
                    assert_eq!(v, INFEASIBLE);
                } else {
                    assert!(v >= 0.0);
                }
            }
        }
    }

    #[test]
    fn test_lethal_and_hazard_cells() {
        let lane = lane();
        assert_eq!(lane.cell_cost(0.0, LETHAL), INFEASIBLE);
        assert!((lane.cell_cost(0.0, HAZARD) - 5.0).abs() < 1e-6);
    }
}
