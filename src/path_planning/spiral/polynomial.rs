//! Curvature polynomials parameterized by knot curvatures
//!
//! Both spiral kinds are expressed over the normalized arc length
//! `u = s / sg`, so `κ(u) = Σ c_k u^k` with at most six coefficients.

use nalgebra::Vector3;

/// Number of coefficients held for either spiral kind
pub const NUM_COEFFICIENTS: usize = 6;

pub type Coefficients = [f64; NUM_COEFFICIENTS];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiralKind {
    /// Curvature fixed at both ends
    Cubic,
    /// Curvature and its first two derivatives fixed at the start
    Quintic,
}

/// Start curvature state and goal pose, in the start pose's frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryConditions {
    pub k0: f64,
    pub dk0: f64,
    pub ddk0: f64,
    pub x: f64,
    pub y: f64,
    pub rot: f64,
    pub kg: f64,
}

impl BoundaryConditions {
    /// Problem with the curvature terms, goal lateral offset and goal
    /// heading scaled by `f`. The goal distance is left as is.
    pub fn scaled(&self, f: f64) -> Self {
        Self {
            k0: self.k0 * f,
            dk0: self.dk0 * f,
            ddk0: self.ddk0 * f,
            x: self.x,
            y: self.y * f,
            rot: self.rot * f,
            kg: self.kg * f,
        }
    }
}

/// Free parameters of one solve: the curvatures at one and two thirds of
/// the path and the arc length `sg`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpiralParams {
    pub kind: SpiralKind,
    pub knots: [f64; 2],
    pub sg: f64,
}

impl SpiralParams {
    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.knots[0], self.knots[1], self.sg)
    }

    pub fn from_vector(kind: SpiralKind, v: &Vector3<f64>) -> Self {
        Self {
            kind,
            knots: [v[0], v[1]],
            sg: v[2],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.knots.iter().all(|k| k.is_finite()) && self.sg.is_finite() && self.sg > 0.0
    }
}

/// Normalized coefficients together with their partials with respect to
/// the free parameters `(p1, p2, sg)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvaturePolynomial {
    pub c: Coefficients,
    pub partials: [Coefficients; 3],
}

impl CurvaturePolynomial {
    pub fn new(bc: &BoundaryConditions, params: &SpiralParams) -> Self {
        match params.kind {
            SpiralKind::Cubic => Self::cubic(bc.k0, params.knots[0], params.knots[1], bc.kg),
            SpiralKind::Quintic => Self::quintic(bc, params),
        }
    }

    fn cubic(p0: f64, p1: f64, p2: f64, p3: f64) -> Self {
        let c = [
            p0,
            -(11.0 * p0 - 18.0 * p1 + 9.0 * p2 - 2.0 * p3) / 2.0,
            9.0 * (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) / 2.0,
            -9.0 * (p0 - 3.0 * p1 + 3.0 * p2 - p3) / 2.0,
            0.0,
            0.0,
        ];
        let dp1 = [0.0, 9.0, -22.5, 13.5, 0.0, 0.0];
        let dp2 = [0.0, -4.5, 18.0, -13.5, 0.0, 0.0];
        // Normalized knot form does not depend on the arc length
        let dsg = [0.0; NUM_COEFFICIENTS];
        Self {
            c,
            partials: [dp1, dp2, dsg],
        }
    }

    fn quintic(bc: &BoundaryConditions, params: &SpiralParams) -> Self {
        let sg = params.sg;
        let (p3, p4, p5) = (params.knots[0], params.knots[1], bc.kg);
        let c0 = bc.k0;
        let c1 = bc.dk0 * sg;
        let c2 = bc.ddk0 * sg * sg / 2.0;

        // Remaining cubic, quartic and quintic terms from the three knot residuals
        let upper = |r1: f64, r2: f64, r3: f64| {
            (
                81.0 * r1 - 81.0 * r2 / 8.0 + r3,
                (-405.0 * r1 + 81.0 * r2 - 9.0 * r3) / 2.0,
                243.0 * r1 / 2.0 - 243.0 * r2 / 8.0 + 9.0 * r3 / 2.0,
            )
        };

        let r1 = p3 - c0 - c1 / 3.0 - c2 / 9.0;
        let r2 = p4 - c0 - 2.0 * c1 / 3.0 - 4.0 * c2 / 9.0;
        let r3 = p5 - c0 - c1 - c2;
        let (d, e, f) = upper(r1, r2, r3);

        let (dd1, de1, df1) = upper(1.0, 0.0, 0.0);
        let (dd2, de2, df2) = upper(0.0, 1.0, 0.0);

        let dc1 = bc.dk0;
        let dc2 = bc.ddk0 * sg;
        let (dds, des, dfs) = upper(
            -dc1 / 3.0 - dc2 / 9.0,
            -2.0 * dc1 / 3.0 - 4.0 * dc2 / 9.0,
            -dc1 - dc2,
        );

        Self {
            c: [c0, c1, c2, d, e, f],
            partials: [
                [0.0, 0.0, 0.0, dd1, de1, df1],
                [0.0, 0.0, 0.0, dd2, de2, df2],
                [0.0, dc1, dc2, dds, des, dfs],
            ],
        }
    }
}

/// `Σ c_k u^k`
pub fn eval(c: &Coefficients, u: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, &ck| acc * u + ck)
}

/// Derivative with respect to `u`
pub fn eval_derivative(c: &Coefficients, u: f64) -> f64 {
    (1..NUM_COEFFICIENTS)
        .rev()
        .fold(0.0, |acc, k| acc * u + k as f64 * c[k])
}

/// Second derivative with respect to `u`
pub fn eval_second_derivative(c: &Coefficients, u: f64) -> f64 {
    (2..NUM_COEFFICIENTS)
        .rev()
        .fold(0.0, |acc, k| acc * u + (k * (k - 1)) as f64 * c[k])
}

/// `∫_0^u Σ c_k t^k dt`
pub fn integral(c: &Coefficients, u: f64) -> f64 {
    c.iter()
        .enumerate()
        .rev()
        .fold(0.0, |acc, (k, &ck)| acc * u + ck / (k + 1) as f64)
        * u
}

/// Coefficients of the same curvature as a polynomial in arc length `s`
pub fn arc_length_coefficients(c: &Coefficients, sg: f64) -> Coefficients {
    let mut out = [0.0; NUM_COEFFICIENTS];
    let mut scale = 1.0;
    for (o, &ck) in out.iter_mut().zip(c.iter()) {
        *o = ck / scale;
        scale *= sg;
    }
    out
}
