//! Simpson quadrature of the spiral end state and its Jacobian

use nalgebra::{Matrix3, Vector3};

use super::polynomial::{integral, CurvaturePolynomial};

/// Simpson intervals over the normalized arc length
pub const NUM_INTERVALS: usize = 8;

const WEIGHTS: [f64; NUM_INTERVALS + 1] = [1.0, 4.0, 2.0, 4.0, 2.0, 4.0, 2.0, 4.0, 1.0];

/// End pose of a spiral starting at the origin with zero heading, plus the
/// partials of `(x, y, rot)` with respect to `(p1, p2, sg)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndState {
    pub state: Vector3<f64>,
    pub jacobian: Matrix3<f64>,
}

pub fn integrate_end_state(poly: &CurvaturePolynomial, sg: f64) -> EndState {
    let step_weight = 1.0 / (3.0 * NUM_INTERVALS as f64);

    let mut int_cos = 0.0;
    let mut int_sin = 0.0;
    // ∫ sinθ ∂θ/∂q du and ∫ cosθ ∂θ/∂q du per free parameter
    let mut sin_dtheta = [0.0; 3];
    let mut cos_dtheta = [0.0; 3];

    for (i, &w) in WEIGHTS.iter().enumerate() {
        let u = i as f64 / NUM_INTERVALS as f64;
        let w = w * step_weight;
        let base = integral(&poly.c, u);
        let (sin, cos) = (sg * base).sin_cos();
        int_cos += w * cos;
        int_sin += w * sin;
        for j in 0..3 {
            let mut dtheta = sg * integral(&poly.partials[j], u);
            if j == 2 {
                dtheta += base;
            }
            sin_dtheta[j] += w * sin * dtheta;
            cos_dtheta[j] += w * cos * dtheta;
        }
    }

    let base_end = integral(&poly.c, 1.0);
    let mut jacobian = Matrix3::zeros();
    for j in 0..3 {
        let sg_term = if j == 2 { 1.0 } else { 0.0 };
        jacobian[(0, j)] = sg_term * int_cos - sg * sin_dtheta[j];
        jacobian[(1, j)] = sg_term * int_sin + sg * cos_dtheta[j];
        jacobian[(2, j)] = sg * integral(&poly.partials[j], 1.0) + sg_term * base_end;
    }

    EndState {
        state: Vector3::new(sg * int_cos, sg * int_sin, sg * base_end),
        jacobian,
    }
}
