//! Reprojection of XY grids into road-relative SL grids

use rayon::prelude::*;

use crate::lane::{Centerline, CenterlineSample};

use super::grid::Grid;

/// Fill `sl` (columns = station, rows = latitude) by sampling `xy` at the
/// point each SL cell center maps to. Points off the XY grid read as free.
pub fn reproject(xy: &Grid, sl: &mut Grid, centerline: &Centerline) {
    let samples: Vec<CenterlineSample> = (0..sl.width())
        .map(|col| centerline.sample_at(sl.col_center(col)))
        .collect();
    let latitudes: Vec<f64> = (0..sl.height()).map(|row| sl.row_center(row)).collect();
    let width = sl.width();

    sl.data_mut()
        .par_chunks_mut(width)
        .zip(latitudes.par_iter())
        .for_each(|(cells, &latitude)| {
            for (cell, sample) in cells.iter_mut().zip(samples.iter()) {
                *cell = xy.value_at(sample.offset(latitude)).unwrap_or(0.0);
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{Frame, Point2D};
    use crate::lane::LanePath;
    use crate::obstacles::StaticObstacle;
    use crate::path_planning::cost_field::rasterize::{rasterize_static, LETHAL};

    #[test]
    fn test_reproject_straight_lane_is_shift() {
        let lane =
            LanePath::new(vec![Point2D::new(-20.0, 0.0), Point2D::new(100.0, 0.0)]).unwrap();
        let frame = Frame::new(Point2D::origin(), 0.0);
        // Lane stations start 20 m behind the vehicle
        let centerline = Centerline::resample(&lane, 10.0, 50.0, 0.5, &frame);

        let mut xy = Grid::new(Point2D::new(-15.0, -10.0), (0.25, 0.25), 240, 80);
        let obstacle = StaticObstacle::new(Point2D::new(20.0, 1.0), 0.0, 2.0, 1.0).unwrap();
        rasterize_static(&mut xy, &[obstacle]);

        let mut sl = Grid::centered(Point2D::new(10.0, -4.0), (0.25, 0.1), 161, 81);
        reproject(&xy, &mut sl, &centerline);

        // Obstacle at x = 20 sits at station 40
        assert_eq!(sl.value_at(Point2D::new(40.0, 1.0)), Some(LETHAL));
        assert_eq!(sl.value_at(Point2D::new(40.0, -1.0)), Some(0.0));
        assert_eq!(sl.value_at(Point2D::new(30.0, 1.0)), Some(0.0));
    }
}
