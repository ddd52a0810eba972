// Cubic spline through lane anchors
//
// Natural cubic spline per axis, parameterized by cumulative chord length.
// Ref:
//     - https://github.com/AtsushiSakai/PythonRobotics/tree/master/PathPlanning/CubicSpline

use nalgebra::{DMatrix, DVector};

use crate::common::error::{PlannerError, PlannerResult};
use crate::common::types::Point2D;

#[derive(Debug, Clone)]
struct Spline {
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
    x: Vec<f64>,
}

impl Spline {
    fn new(x: &[f64], y: &[f64]) -> PlannerResult<Spline> {
        let nx = x.len();
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let a = y.to_vec();

        let a_mat = Self::calc_a(&h);
        let b_vec = Self::calc_b(&h, &a);
        let c_na = a_mat.lu().solve(&b_vec).ok_or_else(|| {
            PlannerError::InvalidLaneReference("singular spline system".to_string())
        })?;
        let c: Vec<f64> = c_na.iter().copied().collect();

        let mut b = Vec::with_capacity(nx - 1);
        let mut d = Vec::with_capacity(nx - 1);
        for i in 0..nx - 1 {
            d.push((c[i + 1] - c[i]) / (3.0 * h[i]));
            b.push((a[i + 1] - a[i]) / h[i] - h[i] * (c[i + 1] + 2.0 * c[i]) / 3.0);
        }

        Ok(Spline {
            a,
            b,
            c,
            d,
            x: x.to_vec(),
        })
    }

    fn calc(&self, t: f64) -> f64 {
        let i = self.search_index(t);
        let dx = t - self.x[i];
        self.a[i] + self.b[i] * dx + self.c[i] * dx.powi(2) + self.d[i] * dx.powi(3)
    }

    fn calc_d(&self, t: f64) -> f64 {
        let i = self.search_index(t);
        let dx = t - self.x[i];
        self.b[i] + 2.0 * self.c[i] * dx + 3.0 * self.d[i] * dx.powi(2)
    }

    fn calc_dd(&self, t: f64) -> f64 {
        let i = self.search_index(t);
        let dx = t - self.x[i];
        2.0 * self.c[i] + 6.0 * self.d[i] * dx
    }

    /// Segment index containing `t`, clamped to the valid segments
    fn search_index(&self, t: f64) -> usize {
        let last_segment = self.x.len() - 2;
        let i = self.x.partition_point(|&xi| xi <= t);
        i.saturating_sub(1).min(last_segment)
    }

    fn calc_a(h: &[f64]) -> DMatrix<f64> {
        let nx = h.len() + 1;
        let mut a = DMatrix::zeros(nx, nx);
        a[(0, 0)] = 1.0;
        for i in 0..nx - 1 {
            if i != nx - 2 {
                a[(i + 1, i + 1)] = 2.0 * (h[i] + h[i + 1]);
            }
            a[(i + 1, i)] = h[i];
            a[(i, i + 1)] = h[i];
        }
        a[(0, 1)] = 0.0;
        a[(nx - 1, nx - 2)] = 0.0;
        a[(nx - 1, nx - 1)] = 1.0;
        a
    }

    fn calc_b(h: &[f64], a: &[f64]) -> DVector<f64> {
        let nx = h.len() + 1;
        let mut b = DVector::zeros(nx);
        for i in 0..nx.saturating_sub(2) {
            b[i + 1] = 3.0 * (a[i + 2] - a[i + 1]) / h[i + 1] - 3.0 * (a[i + 1] - a[i]) / h[i];
        }
        b
    }
}

/// 2D cubic spline through a sequence of anchors
#[derive(Debug, Clone)]
pub struct Spline2D {
    s: Vec<f64>,
    sx: Spline,
    sy: Spline,
}

impl Spline2D {
    /// Fit a spline through `anchors`. Requires at least two anchors and no
    /// two consecutive anchors at the same position.
    pub fn new(anchors: &[Point2D]) -> PlannerResult<Spline2D> {
        if anchors.len() < 2 {
            return Err(PlannerError::InvalidLaneReference(format!(
                "need at least 2 anchors, got {}",
                anchors.len()
            )));
        }

        let mut s = Vec::with_capacity(anchors.len());
        s.push(0.0);
        for w in anchors.windows(2) {
            let ds = w[0].distance(&w[1]);
            if ds < 1e-6 {
                return Err(PlannerError::InvalidLaneReference(
                    "consecutive anchors coincide".to_string(),
                ));
            }
            s.push(s[s.len() - 1] + ds);
        }

        let x: Vec<f64> = anchors.iter().map(|p| p.x).collect();
        let y: Vec<f64> = anchors.iter().map(|p| p.y).collect();
        let sx = Spline::new(&s, &x)?;
        let sy = Spline::new(&s, &y)?;

        Ok(Spline2D { s, sx, sy })
    }

    /// Parameter length (cumulative chord length of the anchors)
    pub fn parameter_length(&self) -> f64 {
        self.s[self.s.len() - 1]
    }

    pub fn calc_position(&self, t: f64) -> Point2D {
        Point2D::new(self.sx.calc(t), self.sy.calc(t))
    }

    pub fn calc_yaw(&self, t: f64) -> f64 {
        let dx = self.sx.calc_d(t);
        let dy = self.sy.calc_d(t);
        dy.atan2(dx)
    }

    pub fn calc_curvature(&self, t: f64) -> f64 {
        let dx = self.sx.calc_d(t);
        let ddx = self.sx.calc_dd(t);
        let dy = self.sy.calc_d(t);
        let ddy = self.sy.calc_dd(t);
        (ddy * dx - ddx * dy) / (dx.powi(2) + dy.powi(2)).powf(1.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_anchor_spline_is_straight() {
        let sp = Spline2D::new(&[Point2D::new(0.0, 0.0), Point2D::new(10.0, 0.0)]).unwrap();
        let p = sp.calc_position(5.0);
        assert!((p.x - 5.0).abs() < 1e-10);
        assert!(p.y.abs() < 1e-10);
        assert!(sp.calc_curvature(5.0).abs() < 1e-10);
        assert!(sp.calc_yaw(5.0).abs() < 1e-10);
    }

    #[test]
    fn test_spline_passes_through_anchors() {
        let anchors = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, -6.0),
            Point2D::new(20.5, 5.0),
            Point2D::new(35.0, 6.5),
        ];
        let sp = Spline2D::new(&anchors).unwrap();
        let mut t = 0.0;
        for i in 0..anchors.len() {
            if i > 0 {
                t += anchors[i - 1].distance(&anchors[i]);
            }
            assert!(sp.calc_position(t).distance(&anchors[i]) < 1e-8);
        }
    }

    #[test]
    fn test_left_turn_has_positive_curvature() {
        let anchors = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 1.0),
            Point2D::new(18.0, 6.0),
        ];
        let sp = Spline2D::new(&anchors).unwrap();
        assert!(sp.calc_curvature(sp.parameter_length() / 2.0) > 0.0);
    }

    #[test]
    fn test_degenerate_anchors_rejected() {
        assert!(Spline2D::new(&[Point2D::new(1.0, 1.0)]).is_err());
        assert!(Spline2D::new(&[Point2D::new(1.0, 1.0), Point2D::new(1.0, 1.0)]).is_err());
    }
}
