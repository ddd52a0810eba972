//! Static and dynamic obstacles
//!
//! Obstacles are oriented rectangles. Dynamic obstacles move at constant
//! velocity either along their long axis (`parallel`) or across it, so the
//! footprint swept over a time window is itself a rectangle.

use serde::{Deserialize, Serialize};

use crate::common::error::{PlannerError, PlannerResult};
use crate::common::types::{Frame, Point2D};

/// Corners of an oriented rectangle, counter-clockwise
fn rectangle(center: Point2D, rot: f64, half_length: f64, half_width: f64) -> [Point2D; 4] {
    let (sin, cos) = rot.sin_cos();
    let corner = |l: f64, w: f64| {
        Point2D::new(
            center.x + l * cos - w * sin,
            center.y + l * sin + w * cos,
        )
    };
    [
        corner(half_length, half_width),
        corner(-half_length, half_width),
        corner(-half_length, -half_width),
        corner(half_length, -half_width),
    ]
}

/// Split a convex polygon into a triangle fan
pub fn triangulate(vertices: &[Point2D]) -> Vec<[Point2D; 3]> {
    if vertices.len() < 3 {
        return Vec::new();
    }
    (1..vertices.len() - 1)
        .map(|i| [vertices[0], vertices[i], vertices[i + 1]])
        .collect()
}

fn validate_dimensions(length: f64, width: f64) -> PlannerResult<()> {
    if !(length.is_finite() && width.is_finite() && length > 0.0 && width > 0.0) {
        return Err(PlannerError::InvalidObstacle(format!(
            "size must be positive and finite, got {} x {}",
            length, width
        )));
    }
    Ok(())
}

/// Obstacle fixed in place
#[derive(Debug, Clone, PartialEq)]
pub struct StaticObstacle {
    pub pos: Point2D,
    pub rot: f64,
    pub length: f64,
    pub width: f64,
}

impl StaticObstacle {
    pub fn new(pos: Point2D, rot: f64, length: f64, width: f64) -> PlannerResult<Self> {
        if !pos.is_finite() || !rot.is_finite() {
            return Err(PlannerError::InvalidObstacle(
                "static obstacle pose must be finite".to_string(),
            ));
        }
        validate_dimensions(length, width)?;
        Ok(Self {
            pos,
            rot,
            length,
            width,
        })
    }

    /// Footprint grown by `dilation_s` along the obstacle's long axis and
    /// `dilation_l` across it
    pub fn vertices(&self, dilation_s: f64, dilation_l: f64) -> [Point2D; 4] {
        rectangle(
            self.pos,
            self.rot,
            self.length / 2.0 + dilation_s,
            self.width / 2.0 + dilation_l,
        )
    }

    /// Same obstacle with its pose expressed in `frame`
    pub fn to_local(&self, frame: &Frame) -> Self {
        Self {
            pos: frame.to_local(self.pos),
            rot: self.rot - frame.rot,
            ..self.clone()
        }
    }

    pub fn from_data(data: &StaticObstacleData) -> PlannerResult<Self> {
        Self::new(Point2D::from(data.pos), data.rot, data.length, data.width)
    }

    pub fn to_data(&self) -> ObstacleData {
        ObstacleData::Static(StaticObstacleData {
            pos: [self.pos.x, self.pos.y],
            rot: self.rot,
            length: self.length,
            width: self.width,
        })
    }
}

/// Obstacle moving at constant velocity
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicObstacle {
    pub start_pos: Point2D,
    pub velocity: Point2D,
    pub length: f64,
    pub width: f64,
    /// Motion along the long axis when true, across it otherwise
    pub parallel: bool,
}

impl DynamicObstacle {
    pub fn new(
        start_pos: Point2D,
        velocity: Point2D,
        length: f64,
        width: f64,
        parallel: bool,
    ) -> PlannerResult<Self> {
        if !start_pos.is_finite() || !velocity.is_finite() {
            return Err(PlannerError::InvalidObstacle(
                "dynamic obstacle position and velocity must be finite".to_string(),
            ));
        }
        validate_dimensions(length, width)?;
        Ok(Self {
            start_pos,
            velocity,
            length,
            width,
            parallel,
        })
    }

    pub fn speed(&self) -> f64 {
        self.velocity.x.hypot(self.velocity.y)
    }

    /// Heading of the long axis
    pub fn rot(&self) -> f64 {
        let motion = if self.speed() > 0.0 {
            self.velocity.y.atan2(self.velocity.x)
        } else {
            0.0
        };
        if self.parallel {
            motion
        } else {
            motion + std::f64::consts::FRAC_PI_2
        }
    }

    pub fn position_at_time(&self, t: f64) -> Point2D {
        Point2D::new(
            self.start_pos.x + self.velocity.x * t,
            self.start_pos.y + self.velocity.y * t,
        )
    }

    /// Footprint swept between `t0` and `t1`, grown by the given margins
    pub fn vertices_in_time_range(
        &self,
        t0: f64,
        t1: f64,
        dilation_s: f64,
        dilation_l: f64,
    ) -> [Point2D; 4] {
        let center = self.position_at_time((t0 + t1) / 2.0);
        let sweep = self.speed() * (t1 - t0).abs() / 2.0;
        let mut half_length = self.length / 2.0 + dilation_s;
        let mut half_width = self.width / 2.0 + dilation_l;
        if self.parallel {
            half_length += sweep;
        } else {
            half_width += sweep;
        }
        rectangle(center, self.rot(), half_length, half_width)
    }

    /// Same obstacle with position and velocity expressed in `frame`
    pub fn to_local(&self, frame: &Frame) -> Self {
        let (sin, cos) = frame.rot.sin_cos();
        Self {
            start_pos: frame.to_local(self.start_pos),
            velocity: Point2D::new(
                self.velocity.x * cos + self.velocity.y * sin,
                -self.velocity.x * sin + self.velocity.y * cos,
            ),
            ..self.clone()
        }
    }

    pub fn from_data(data: &DynamicObstacleData) -> PlannerResult<Self> {
        Self::new(
            Point2D::from(data.start_pos),
            Point2D::from(data.velocity),
            data.length,
            data.width,
            data.parallel,
        )
    }

    pub fn to_data(&self) -> ObstacleData {
        ObstacleData::Dynamic(DynamicObstacleData {
            start_pos: [self.start_pos.x, self.start_pos.y],
            velocity: [self.velocity.x, self.velocity.y],
            length: self.length,
            width: self.width,
            parallel: self.parallel,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticObstacleData {
    pub pos: [f64; 2],
    pub rot: f64,
    pub length: f64,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicObstacleData {
    pub start_pos: [f64; 2],
    pub velocity: [f64; 2],
    pub length: f64,
    pub width: f64,
    pub parallel: bool,
}

/// Field-tagged obstacle data as carried across the planning boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ObstacleData {
    Static(StaticObstacleData),
    Dynamic(DynamicObstacleData),
}

/// Revive a list that must contain only static obstacles
pub fn revive_static(data: &[ObstacleData]) -> PlannerResult<Vec<StaticObstacle>> {
    data.iter()
        .enumerate()
        .map(|(i, d)| match d {
            ObstacleData::Static(s) => StaticObstacle::from_data(s),
            ObstacleData::Dynamic(_) => Err(PlannerError::InvalidObstacle(format!(
                "entry {} of the static obstacle list is dynamic",
                i
            ))),
        })
        .collect()
}

/// Revive a list that must contain only dynamic obstacles
pub fn revive_dynamic(data: &[ObstacleData]) -> PlannerResult<Vec<DynamicObstacle>> {
    data.iter()
        .enumerate()
        .map(|(i, d)| match d {
            ObstacleData::Dynamic(s) => DynamicObstacle::from_data(s),
            ObstacleData::Static(_) => Err(PlannerError::InvalidObstacle(format!(
                "entry {} of the dynamic obstacle list is static",
                i
            ))),
        })
        .collect()
}
