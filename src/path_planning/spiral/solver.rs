//! Boundary-value spiral solver
//!
//! Newton-Raphson on the free parameters `(p1, p2, sg)` against the end-pose
//! residual, with an analytic Jacobian of the quadrature. Hard problems are
//! approached by continuation: the curvature terms, goal offset and goal
//! heading are ramped up from a straight-line problem whose solution is known.

use nalgebra::{Matrix3, Vector3};

use crate::common::types::{normalize_angle, Frame, Pose};
use crate::config::SpiralSolverConfig;

use super::path::SpiralPath;
use super::polynomial::{BoundaryConditions, CurvaturePolynomial, SpiralKind, SpiralParams};
use super::quadrature::integrate_end_state;

/// Step sizes tried along the Newton direction, largest first
const LINE_SEARCH_ALPHAS: [f64; 5] = [1.0, 0.75, 0.5, 0.25, 0.1];

/// Arc length guess from goal distance and heading change, with the
/// interior knots interpolated between the end curvatures
pub fn initial_guess(kind: SpiralKind, bc: &BoundaryConditions) -> SpiralParams {
    let d = bc.x.hypot(bc.y);
    let dtheta = bc.rot.abs();
    let sg = d * (dtheta * dtheta / 5.0 + 1.0) + 2.0 * dtheta / 5.0;
    SpiralParams {
        kind,
        knots: [
            bc.k0 + (bc.kg - bc.k0) / 3.0,
            bc.k0 + 2.0 * (bc.kg - bc.k0) / 3.0,
        ],
        sg,
    }
}

/// Spiral path solver
#[derive(Debug, Clone, Default)]
pub struct SpiralSolver {
    config: SpiralSolverConfig,
}

impl SpiralSolver {
    pub fn new(config: SpiralSolverConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(SpiralSolverConfig::default())
    }

    pub fn config(&self) -> &SpiralSolverConfig {
        &self.config
    }

    /// End-pose residual and its Jacobian
    fn calc_diff(bc: &BoundaryConditions, params: &SpiralParams) -> (Vector3<f64>, Matrix3<f64>) {
        let poly = CurvaturePolynomial::new(bc, params);
        let end = integrate_end_state(&poly, params.sg);
        (end.state - Vector3::new(bc.x, bc.y, bc.rot), end.jacobian)
    }

    fn calc_cost(diff: &Vector3<f64>) -> f64 {
        diff.iter().map(|d| d.abs()).sum()
    }

    /// First step size along `dp` that lowers the cost, or the least bad one
    fn line_search(
        bc: &BoundaryConditions,
        params: &SpiralParams,
        dp: &Vector3<f64>,
        cost: f64,
    ) -> Option<SpiralParams> {
        let mut best: Option<(f64, SpiralParams)> = None;
        for &alpha in &LINE_SEARCH_ALPHAS {
            let candidate =
                SpiralParams::from_vector(params.kind, &(params.to_vector() + alpha * dp));
            if !candidate.is_valid() {
                continue;
            }
            let (diff, _) = Self::calc_diff(bc, &candidate);
            let candidate_cost = Self::calc_cost(&diff);
            if !candidate_cost.is_finite() {
                continue;
            }
            if candidate_cost < cost {
                return Some(candidate);
            }
            if best.map_or(true, |(c, _)| candidate_cost < c) {
                best = Some((candidate_cost, candidate));
            }
        }
        best.map(|(_, p)| p)
    }

    /// Run at most `max_iter` Newton iterations. Returns the final parameters
    /// and whether they meet the tolerance, or `None` on numerical failure.
    fn iterate(
        &self,
        bc: &BoundaryConditions,
        mut params: SpiralParams,
        max_iter: usize,
    ) -> Option<(SpiralParams, bool)> {
        for _ in 0..max_iter {
            let (diff, jacobian) = Self::calc_diff(bc, &params);
            let cost = Self::calc_cost(&diff);
            if !cost.is_finite() {
                return None;
            }
            if cost < self.config.convergence_tolerance {
                return Some((params, true));
            }
            let dp = jacobian.lu().solve(&(-diff))?;
            params = Self::line_search(bc, &params, &dp, cost)?;
        }
        let (diff, _) = Self::calc_diff(bc, &params);
        let cost = Self::calc_cost(&diff);
        cost.is_finite().then_some((params, cost < self.config.convergence_tolerance))
    }

    /// Solve for the free parameters in the start pose's frame
    pub fn optimize(&self, kind: SpiralKind, bc: &BoundaryConditions) -> Option<SpiralParams> {
        let steps = self.config.relaxation_steps;
        let mut params = if steps == 0 {
            initial_guess(kind, bc)
        } else {
            if bc.x <= 0.0 {
                return None;
            }
            // Straight line along x solves the fully relaxed problem exactly
            let mut params = SpiralParams {
                kind,
                knots: [0.0, 0.0],
                sg: bc.x,
            };
            for k in 1..=steps {
                let relaxed = bc.scaled(k as f64 / steps as f64);
                params = self
                    .iterate(&relaxed, params, self.config.relaxation_iterations)?
                    .0;
            }
            params
        };

        let (solved, converged) = self.iterate(bc, params, self.config.max_iterations)?;
        params = solved;
        if converged && params.is_valid() {
            Some(params)
        } else {
            log::trace!(
                "spiral did not converge for goal ({:.2}, {:.2}, {:.3})",
                bc.x,
                bc.y,
                bc.rot
            );
            None
        }
    }

    /// Connect two world-frame poses with a spiral of the given kind.
    ///
    /// The start contributes its curvature (and for the quintic kind its
    /// curvature derivatives); the end contributes position, heading and
    /// curvature.
    pub fn solve_between(&self, kind: SpiralKind, start: &Pose, end: &Pose) -> Option<SpiralPath> {
        let frame = Frame::from_pose(start);
        let goal = frame.pose_to_local(end);
        let bc = BoundaryConditions {
            k0: start.curv,
            dk0: start.dcurv,
            ddk0: start.ddcurv,
            x: goal.x,
            y: goal.y,
            rot: normalize_angle(goal.rot),
            kg: end.curv,
        };
        let bc = match kind {
            SpiralKind::Cubic => BoundaryConditions {
                dk0: 0.0,
                ddk0: 0.0,
                ..bc
            },
            SpiralKind::Quintic => bc,
        };
        let params = self.optimize(kind, &bc)?;
        let poly = CurvaturePolynomial::new(&bc, &params);
        Some(SpiralPath::new(params, &poly, frame))
    }

    pub fn solve_cubic(&self, start: &Pose, end: &Pose) -> Option<SpiralPath> {
        self.solve_between(SpiralKind::Cubic, start, end)
    }

    pub fn solve_quintic(&self, start: &Pose, end: &Pose) -> Option<SpiralPath> {
        self.solve_between(SpiralKind::Quintic, start, end)
    }
}
