//! Lane reference built from serialized anchor points

use serde::{Deserialize, Serialize};

use crate::common::error::{PlannerError, PlannerResult};
use crate::common::traits::LaneReference;
use crate::common::types::{normalize_angle, Point2D, Pose};

use super::centerline::CenterlineSample;
use super::cubic_spline::Spline2D;

/// Spline parameter step used when tabulating the centerline [m]
const TABULATION_STEP: f64 = 0.25;

/// Plain-data lane reference as carried across the planning boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneReferenceData {
    pub anchors: Vec<[f64; 2]>,
}

/// Lane centerline with true arc-length stations.
///
/// The anchors are fitted with a cubic spline and tabulated densely; station
/// lookups interpolate between tabulated samples.
#[derive(Debug, Clone)]
pub struct LanePath {
    anchors: Vec<Point2D>,
    samples: Vec<CenterlineSample>,
}

impl LanePath {
    pub fn new(anchors: Vec<Point2D>) -> PlannerResult<Self> {
        if let Some(bad) = anchors.iter().find(|p| !p.is_finite()) {
            return Err(PlannerError::InvalidLaneReference(format!(
                "non-finite anchor ({}, {})",
                bad.x, bad.y
            )));
        }
        let spline = Spline2D::new(&anchors)?;

        let param_length = spline.parameter_length();
        let n = ((param_length / TABULATION_STEP).ceil() as usize).max(1);
        let mut samples = Vec::with_capacity(n + 1);
        let mut station = 0.0;
        let mut prev = spline.calc_position(0.0);
        for i in 0..=n {
            let t = param_length * i as f64 / n as f64;
            let pos = spline.calc_position(t);
            station += prev.distance(&pos);
            prev = pos;
            samples.push(CenterlineSample {
                station,
                pose: Pose::new(pos.x, pos.y, spline.calc_yaw(t))
                    .with_curvature(spline.calc_curvature(t)),
            });
        }

        Ok(Self { anchors, samples })
    }

    /// Revive a lane reference from plain data
    pub fn from_data(data: &LaneReferenceData) -> PlannerResult<Self> {
        Self::new(data.anchors.iter().map(|&a| Point2D::from(a)).collect())
    }

    pub fn to_data(&self) -> LaneReferenceData {
        LaneReferenceData {
            anchors: self.anchors.iter().map(|p| [p.x, p.y]).collect(),
        }
    }

    pub fn anchors(&self) -> &[Point2D] {
        &self.anchors
    }

    fn extrapolate(from: &CenterlineSample, station: f64) -> CenterlineSample {
        let ds = station - from.station;
        CenterlineSample {
            station,
            pose: Pose::new(
                from.pose.x + ds * from.pose.rot.cos(),
                from.pose.y + ds * from.pose.rot.sin(),
                from.pose.rot,
            ),
        }
    }
}

impl LaneReference for LanePath {
    fn length(&self) -> f64 {
        self.samples[self.samples.len() - 1].station
    }

    fn sample_station(&self, station: f64) -> CenterlineSample {
        let first = &self.samples[0];
        let last = &self.samples[self.samples.len() - 1];
        if station <= first.station {
            return Self::extrapolate(first, station);
        }
        if station >= last.station {
            return Self::extrapolate(last, station);
        }

        let i = self.samples.partition_point(|s| s.station <= station) - 1;
        let a = &self.samples[i];
        let b = &self.samples[i + 1];
        let span = b.station - a.station;
        let t = if span > 0.0 {
            (station - a.station) / span
        } else {
            0.0
        };
        let lerp = |u: f64, v: f64| u + (v - u) * t;
        CenterlineSample {
            station,
            pose: Pose::new(
                lerp(a.pose.x, b.pose.x),
                lerp(a.pose.y, b.pose.y),
                normalize_angle(a.pose.rot + normalize_angle(b.pose.rot - a.pose.rot) * t),
            )
            .with_curvature(lerp(a.pose.curv, b.pose.curv)),
        }
    }

    fn station_latitude(&self, point: Point2D) -> (f64, f64) {
        let mut best = (f64::MAX, 0.0, 0.0);
        for w in self.samples.windows(2) {
            let (a, b) = (&w[0], &w[1]);
            let dx = b.pose.x - a.pose.x;
            let dy = b.pose.y - a.pose.y;
            let len2 = dx * dx + dy * dy;
            if len2 <= 0.0 {
                continue;
            }
            let px = point.x - a.pose.x;
            let py = point.y - a.pose.y;
            let t = ((px * dx + py * dy) / len2).clamp(0.0, 1.0);
            let cx = px - t * dx;
            let cy = py - t * dy;
            let dist2 = cx * cx + cy * cy;
            if dist2 < best.0 {
                let len = len2.sqrt();
                let station = a.station + t * (b.station - a.station);
                let latitude = (dx * py - dy * px) / len;
                best = (dist2, station, latitude);
            }
        }
        (best.1, best.2)
    }
}
