//! Lethal and hazard dilation of SL occupancy
//!
//! Two separable passes, first along station (columns) then along latitude
//! (rows). Each pass raises a cell to 1.0 when any lethal cell lies within
//! the lethal radius and to 0.5 when any occupied cell lies within the
//! hazard radius. Cells are never lowered.

use rayon::prelude::*;

use super::grid::Grid;
use super::rasterize::{HAZARD, LETHAL};

/// Dilation radii along one axis, in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRadii {
    pub lethal: usize,
    pub hazard: usize,
}

impl AxisRadii {
    pub fn from_meters(lethal: f64, hazard: f64, cell_size: f64) -> Self {
        Self {
            lethal: (lethal / cell_size).round().max(0.0) as usize,
            hazard: (hazard / cell_size).round().max(0.0) as usize,
        }
    }
}

fn dilate_value(window: impl Iterator<Item = (usize, f32)>, center: f32, radii: AxisRadii) -> f32 {
    let mut out = center;
    for (distance, v) in window {
        if v >= LETHAL && distance <= radii.lethal {
            return LETHAL.max(out);
        }
        if v > 0.0 && distance <= radii.hazard {
            out = out.max(HAZARD);
        }
    }
    out
}

/// Window of `(distance, value)` pairs within `radius` of `i` in `line`
fn line_window(
    line: impl Fn(usize) -> f32,
    len: usize,
    i: usize,
    radius: usize,
) -> impl Iterator<Item = (usize, f32)> {
    let lo = i.saturating_sub(radius);
    let hi = (i + radius).min(len - 1);
    (lo..=hi).map(move |k| (k.abs_diff(i), line(k)))
}

/// Dilate `input` with `station` radii along columns and `latitude` radii
/// along rows
pub fn dilate(input: &Grid, station: AxisRadii, latitude: AxisRadii) -> Grid {
    let width = input.width();
    let height = input.height();
    let window_s = station.lethal.max(station.hazard);
    let window_l = latitude.lethal.max(latitude.hazard);

    let mut along_station = Grid::like(input);
    along_station
        .data_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, out)| {
            for (col, cell) in out.iter_mut().enumerate() {
                let window = line_window(|k| input.get(k, row), width, col, window_s);
                *cell = dilate_value(window, input.get(col, row), station);
            }
        });

    let mut output = Grid::like(input);
    output
        .data_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, out)| {
            for (col, cell) in out.iter_mut().enumerate() {
                let window = line_window(|k| along_station.get(col, k), height, row, window_l);
                *cell = dilate_value(window, along_station.get(col, row), latitude);
            }
        });
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Point2D;

    fn single_cell_grid() -> Grid {
        let mut grid = Grid::new(Point2D::origin(), (1.0, 1.0), 21, 21);
        grid.set(10, 10, LETHAL);
        grid
    }

    fn count_at_least(grid: &Grid, value: f32) -> usize {
        grid.data().iter().filter(|&&v| v >= value).count()
    }

    #[test]
    fn test_dilation_box_shape() {
        let out = dilate(
            &single_cell_grid(),
            AxisRadii {
                lethal: 1,
                hazard: 3,
            },
            AxisRadii {
                lethal: 2,
                hazard: 4,
            },
        );
        assert_eq!(count_at_least(&out, LETHAL), 3 * 5);
        assert_eq!(count_at_least(&out, HAZARD), 7 * 9);
        assert_eq!(out.get(11, 12), LETHAL);
        assert_eq!(out.get(13, 14), HAZARD);
        assert_eq!(out.get(14, 10), 0.0);
    }

    #[test]
    fn test_dilation_monotone_in_every_radius() {
        let input = single_cell_grid();
        let base = AxisRadii {
            lethal: 1,
            hazard: 2,
        };
        let reference = dilate(&input, base, base);
        let grown = [
            (AxisRadii { lethal: 2, ..base }, base),
            (AxisRadii { hazard: 3, ..base }, base),
            (base, AxisRadii { lethal: 2, ..base }),
            (base, AxisRadii { hazard: 3, ..base }),
        ];
        for (s, l) in grown {
            let out = dilate(&input, s, l);
            assert!(out
                .data()
                .iter()
                .zip(reference.data())
                .all(|(a, b)| a >= b));
            assert!(count_at_least(&out, HAZARD) >= count_at_least(&reference, HAZARD));
        }
    }

    #[test]
    fn test_hazard_never_lowers_lethal() {
        let mut input = single_cell_grid();
        input.set(12, 10, HAZARD);
        let radii = AxisRadii {
            lethal: 0,
            hazard: 5,
        };
        let out = dilate(&input, radii, radii);
        assert_eq!(out.get(10, 10), LETHAL);
        assert_eq!(out.get(12, 10), HAZARD);
    }

    #[test]
    fn test_radii_from_meters() {
        let radii = AxisRadii::from_meters(2.5, 5.0, 0.25);
        assert_eq!(radii.lethal, 10);
        assert_eq!(radii.hazard, 20);
    }
}
