//! Common types used throughout lattice_planner

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point2D {
    fn from(tuple: (f64, f64)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

impl From<[f64; 2]> for Point2D {
    fn from(arr: [f64; 2]) -> Self {
        Self { x: arr[0], y: arr[1] }
    }
}

impl From<Vector2<f64>> for Point2D {
    fn from(v: Vector2<f64>) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

/// Oriented, curvature-tagged pose.
///
/// `dcurv` and `ddcurv` are derivatives of curvature with respect to arc length.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub rot: f64,
    #[serde(default)]
    pub curv: f64,
    #[serde(default)]
    pub dcurv: f64,
    #[serde(default)]
    pub ddcurv: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, rot: f64) -> Self {
        Self {
            x,
            y,
            rot,
            ..Default::default()
        }
    }

    pub fn with_curvature(mut self, curv: f64) -> Self {
        self.curv = curv;
        self
    }

    pub fn origin() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    pub fn is_finite(&self) -> bool {
        [self.x, self.y, self.rot, self.curv, self.dcurv, self.ddcurv]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// One sample of a planned trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub pose: Pose,
    /// Arc length from the start of the trajectory [m]
    pub s: f64,
    /// Target velocity [m/s]
    pub velocity: f64,
    /// Target acceleration [m/s^2]
    pub acceleration: f64,
    /// Time from the start of the trajectory [s]
    pub time: f64,
}

/// Rigid 2D frame used to move geometry in and out of the vehicle's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub origin: Point2D,
    pub rot: f64,
    cos: f64,
    sin: f64,
}

impl Frame {
    pub fn new(origin: Point2D, rot: f64) -> Self {
        Self {
            origin,
            rot,
            cos: rot.cos(),
            sin: rot.sin(),
        }
    }

    pub fn from_pose(pose: &Pose) -> Self {
        Self::new(pose.position(), pose.rot)
    }

    /// World point expressed in this frame
    pub fn to_local(&self, p: Point2D) -> Point2D {
        let dx = p.x - self.origin.x;
        let dy = p.y - self.origin.y;
        Point2D::new(dx * self.cos + dy * self.sin, -dx * self.sin + dy * self.cos)
    }

    /// Point in this frame expressed in world coordinates
    pub fn to_world(&self, p: Point2D) -> Point2D {
        Point2D::new(
            self.origin.x + p.x * self.cos - p.y * self.sin,
            self.origin.y + p.x * self.sin + p.y * self.cos,
        )
    }

    pub fn pose_to_local(&self, pose: &Pose) -> Pose {
        let p = self.to_local(pose.position());
        Pose {
            x: p.x,
            y: p.y,
            rot: normalize_angle(pose.rot - self.rot),
            ..*pose
        }
    }

    pub fn pose_to_world(&self, pose: &Pose) -> Pose {
        let p = self.to_world(pose.position());
        Pose {
            x: p.x,
            y: p.y,
            rot: normalize_angle(pose.rot + self.rot),
            ..*pose
        }
    }
}

/// Normalize angle to [-PI, PI]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle;
    while a > PI {
        a -= 2.0 * PI;
    }
    while a < -PI {
        a += 2.0 * PI;
    }
    a
}
