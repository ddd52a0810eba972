//! Regular 2D grid of `f32` cells
//!
//! Columns run along the first axis and rows along the second. The XY grids
//! use (x, y) in the vehicle frame; the SL grids use (station, latitude).

use crate::common::types::Point2D;

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    origin: Point2D,
    cell_size: (f64, f64),
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Grid {
    /// Grid of `width` x `height` cells whose lower corner sits at `origin`
    pub fn new(origin: Point2D, cell_size: (f64, f64), width: usize, height: usize) -> Self {
        Self {
            origin,
            cell_size,
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Grid covering `[min, max]` with cells of `cell_size`
    pub fn covering(min: Point2D, max: Point2D, cell_size: (f64, f64)) -> Self {
        let width = (((max.x - min.x) / cell_size.0).ceil() as usize).max(1);
        let height = (((max.y - min.y) / cell_size.1).ceil() as usize).max(1);
        Self::new(min, cell_size, width, height)
    }

    /// Grid whose first cell center sits exactly on `first_center`
    pub fn centered(
        first_center: Point2D,
        cell_size: (f64, f64),
        width: usize,
        height: usize,
    ) -> Self {
        let origin = Point2D::new(
            first_center.x - cell_size.0 / 2.0,
            first_center.y - cell_size.1 / 2.0,
        );
        Self::new(origin, cell_size, width, height)
    }

    /// Empty grid with the same geometry
    pub fn like(other: &Grid) -> Self {
        Self::new(other.origin, other.cell_size, other.width, other.height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn origin(&self) -> Point2D {
        self.origin
    }

    pub fn cell_size(&self) -> (f64, f64) {
        self.cell_size
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    fn index(&self, col: usize, row: usize) -> usize {
        debug_assert!(
            col < self.width && row < self.height,
            "grid cell ({}, {}) out of range {}x{}",
            col,
            row,
            self.width,
            self.height
        );
        row * self.width + col
    }

    pub fn get(&self, col: usize, row: usize) -> f32 {
        self.data[self.index(col, row)]
    }

    pub fn set(&mut self, col: usize, row: usize, value: f32) {
        let i = self.index(col, row);
        self.data[i] = value;
    }

    /// Raise a cell to at least `value`
    pub fn raise(&mut self, col: usize, row: usize, value: f32) {
        let i = self.index(col, row);
        if value > self.data[i] {
            self.data[i] = value;
        }
    }

    pub fn cell_center(&self, col: usize, row: usize) -> Point2D {
        Point2D::new(
            self.origin.x + (col as f64 + 0.5) * self.cell_size.0,
            self.origin.y + (row as f64 + 0.5) * self.cell_size.1,
        )
    }

    pub fn col_center(&self, col: usize) -> f64 {
        self.origin.x + (col as f64 + 0.5) * self.cell_size.0
    }

    pub fn row_center(&self, row: usize) -> f64 {
        self.origin.y + (row as f64 + 0.5) * self.cell_size.1
    }

    /// Cell containing `p`, if any
    pub fn cell_of(&self, p: Point2D) -> Option<(usize, usize)> {
        let fx = ((p.x - self.origin.x) / self.cell_size.0).floor();
        let fy = ((p.y - self.origin.y) / self.cell_size.1).floor();
        if !(fx >= 0.0 && fy >= 0.0) {
            return None;
        }
        let (col, row) = (fx as usize, fy as usize);
        (col < self.width && row < self.height).then_some((col, row))
    }

    pub fn value_at(&self, p: Point2D) -> Option<f32> {
        self.cell_of(p).map(|(col, row)| self.get(col, row))
    }

    /// Inclusive cell range overlapping the box `[min, max]`, clamped to
    /// the grid; `None` when the box misses the grid
    pub fn cell_range(
        &self,
        min: Point2D,
        max: Point2D,
    ) -> Option<((usize, usize), (usize, usize))> {
        let to_index = |v: f64, o: f64, size: f64| ((v - o) / size).floor();
        let c0 = to_index(min.x, self.origin.x, self.cell_size.0).max(0.0);
        let r0 = to_index(min.y, self.origin.y, self.cell_size.1).max(0.0);
        let c1 = to_index(max.x, self.origin.x, self.cell_size.0);
        let r1 = to_index(max.y, self.origin.y, self.cell_size.1);
        if c1 < 0.0 || r1 < 0.0 || c0 >= self.width as f64 || r0 >= self.height as f64 {
            return None;
        }
        let c1 = (c1 as usize).min(self.width - 1);
        let r1 = (r1 as usize).min(self.height - 1);
        Some(((c0 as usize, r0 as usize), (c1, r1)))
    }
}
