//! Solved spiral path and its dense resampling

use crate::common::types::{Frame, Point2D, Pose};

use super::polynomial::{
    arc_length_coefficients, eval, eval_derivative, eval_second_derivative, integral,
    Coefficients, CurvaturePolynomial, SpiralParams,
};

/// One resampled path pose with its arc length from the path start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSample {
    pub s: f64,
    pub pose: Pose,
}

/// Converged spiral anchored at its world-frame start pose
#[derive(Debug, Clone)]
pub struct SpiralPath {
    params: SpiralParams,
    coefficients: Coefficients,
    frame: Frame,
}

impl SpiralPath {
    pub fn new(params: SpiralParams, poly: &CurvaturePolynomial, frame: Frame) -> Self {
        Self {
            params,
            coefficients: poly.c,
            frame,
        }
    }

    pub fn params(&self) -> &SpiralParams {
        &self.params
    }

    pub fn length(&self) -> f64 {
        self.params.sg
    }

    /// Curvature polynomial coefficients in arc length
    pub fn coefficients(&self) -> Coefficients {
        arc_length_coefficients(&self.coefficients, self.params.sg)
    }

    /// Heading, curvature and curvature derivatives at `s` in the start frame
    fn local_pose(&self, s: f64, position: Point2D) -> Pose {
        let sg = self.params.sg;
        let u = s / sg;
        let c = &self.coefficients;
        Pose {
            x: position.x,
            y: position.y,
            rot: sg * integral(c, u),
            curv: eval(c, u),
            dcurv: eval_derivative(c, u) / sg,
            ddcurv: eval_second_derivative(c, u) / (sg * sg),
        }
    }

    fn local_heading(&self, s: f64) -> f64 {
        self.params.sg * integral(&self.coefficients, s / self.params.sg)
    }

    /// Resample the path every `step` meters in the world frame. The first
    /// sample is the start pose and the last lands exactly on the end.
    pub fn sample(&self, step: f64) -> Vec<PathSample> {
        let sg = self.params.sg;
        let n = ((sg / step).ceil() as usize).max(1);
        let mut samples = Vec::with_capacity(n + 1);

        let mut position = Point2D::origin();
        let mut prev_s = 0.0;
        samples.push(self.to_world(0.0, position));

        for i in 1..=n {
            let s = if i == n { sg } else { i as f64 * step };
            let ds = s - prev_s;
            let (sa, ca) = self.local_heading(prev_s).sin_cos();
            let (sm, cm) = self.local_heading((prev_s + s) / 2.0).sin_cos();
            let (sb, cb) = self.local_heading(s).sin_cos();
            position.x += ds * (ca + 4.0 * cm + cb) / 6.0;
            position.y += ds * (sa + 4.0 * sm + sb) / 6.0;
            samples.push(self.to_world(s, position));
            prev_s = s;
        }
        samples
    }

    fn to_world(&self, s: f64, position: Point2D) -> PathSample {
        PathSample {
            s,
            pose: self.frame.pose_to_world(&self.local_pose(s, position)),
        }
    }

    pub fn end_pose(&self) -> Pose {
        let samples = self.sample(self.params.sg / 8.0);
        samples[samples.len() - 1].pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_planning::spiral::polynomial::{BoundaryConditions, SpiralKind};

    fn arc_path(k: f64, sg: f64, frame: Frame) -> SpiralPath {
        let bc = BoundaryConditions {
            k0: k,
            dk0: 0.0,
            ddk0: 0.0,
            x: 0.0,
            y: 0.0,
            rot: 0.0,
            kg: k,
        };
        let params = SpiralParams {
            kind: SpiralKind::Cubic,
            knots: [k, k],
            sg,
        };
        SpiralPath::new(params, &CurvaturePolynomial::new(&bc, &params), frame)
    }

    #[test]
    fn test_sample_endpoints() {
        let path = arc_path(0.05, 12.3, Frame::new(Point2D::origin(), 0.0));
        let samples = path.sample(0.5);
        assert_eq!(samples[0].s, 0.0);
        assert_eq!(samples[samples.len() - 1].s, 12.3);
        assert!(samples.windows(2).all(|w| w[1].s > w[0].s));
        let last = samples[samples.len() - 1].pose;
        assert!((last.rot - 0.05 * 12.3).abs() < 1e-9);
        assert!((last.curv - 0.05).abs() < 1e-12);
        assert!(last.dcurv.abs() < 1e-12);
    }

    #[test]
    fn test_world_frame_placement() {
        let frame = Frame::new(Point2D::new(5.0, 2.0), std::f64::consts::FRAC_PI_2);
        let path = arc_path(0.0, 4.0, frame);
        let end = path.end_pose();
        assert!((end.x - 5.0).abs() < 1e-9);
        assert!((end.y - 6.0).abs() < 1e-9);
        assert!((end.rot - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_step_sizes_agree_on_end() {
        let path = arc_path(0.08, 15.0, Frame::new(Point2D::origin(), 0.0));
        let coarse = path.sample(1.0);
        let fine = path.sample(0.1);
        let a = coarse[coarse.len() - 1].pose;
        let b = fine[fine.len() - 1].pose;
        assert!(a.position().distance(&b.position()) < 1e-3);
        assert!((a.rot - b.rot).abs() < 1e-9);
    }
}
