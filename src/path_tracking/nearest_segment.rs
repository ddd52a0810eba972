//! Nearest trajectory segment search shared by the tracking controllers

use crate::common::trajectory::PlannedTrajectory;
use crate::common::types::{normalize_angle, Point2D, Pose, TrajectoryPoint};

/// Closest point on a trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentMatch {
    /// Index of the segment start point
    pub index: usize,
    /// Position along the segment in [0, 1]
    pub t: f64,
    /// Trajectory state interpolated at the closest point
    pub point: TrajectoryPoint,
    pub distance: f64,
}

/// Windowed nearest-segment search that remembers the last match.
///
/// The window is centered on the previous segment index. A new trajectory
/// id, or no previous match, falls back to a full scan.
#[derive(Debug, Clone)]
pub struct NearestSegment {
    search_window: usize,
    last: Option<(u64, usize)>,
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Trajectory state a fraction `t` of the way from `a` to `b`
pub fn interpolate(a: &TrajectoryPoint, b: &TrajectoryPoint, t: f64) -> TrajectoryPoint {
    TrajectoryPoint {
        pose: Pose {
            x: lerp(a.pose.x, b.pose.x, t),
            y: lerp(a.pose.y, b.pose.y, t),
            rot: normalize_angle(a.pose.rot + normalize_angle(b.pose.rot - a.pose.rot) * t),
            curv: lerp(a.pose.curv, b.pose.curv, t),
            dcurv: lerp(a.pose.dcurv, b.pose.dcurv, t),
            ddcurv: lerp(a.pose.ddcurv, b.pose.ddcurv, t),
        },
        s: lerp(a.s, b.s, t),
        velocity: lerp(a.velocity, b.velocity, t),
        acceleration: lerp(a.acceleration, b.acceleration, t),
        time: lerp(a.time, b.time, t),
    }
}

/// Project `p` onto segment `a`-`b`, returning the clamped parameter
fn project_on_segment(a: Point2D, b: Point2D, p: Point2D) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 <= f64::EPSILON {
        return 0.0;
    }
    (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
}

impl NearestSegment {
    pub fn new(search_window: usize) -> Self {
        Self {
            search_window,
            last: None,
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn last_index(&self) -> Option<usize> {
        self.last.map(|(_, i)| i)
    }

    pub fn find(&mut self, trajectory: &PlannedTrajectory, p: Point2D) -> SegmentMatch {
        let points = trajectory.points();
        let num_segments = points.len().saturating_sub(1);
        if num_segments == 0 {
            let point = points[0];
            self.last = Some((trajectory.id(), 0));
            return SegmentMatch {
                index: 0,
                t: 0.0,
                point,
                distance: point.pose.position().distance(&p),
            };
        }

        let range = match self.last {
            Some((id, index)) if id == trajectory.id() => {
                let index = index.min(num_segments - 1);
                index.saturating_sub(self.search_window)
                    ..(index + self.search_window + 1).min(num_segments)
            }
            _ => 0..num_segments,
        };

        let mut best: Option<SegmentMatch> = None;
        for i in range {
            let (a, b) = (&points[i], &points[i + 1]);
            let t = project_on_segment(a.pose.position(), b.pose.position(), p);
            let point = interpolate(a, b, t);
            let distance = point.pose.position().distance(&p);
            if best.map_or(true, |m| distance < m.distance) {
                best = Some(SegmentMatch {
                    index: i,
                    t,
                    point,
                    distance,
                });
            }
        }

        // The range is never empty here
        let found = best.unwrap_or(SegmentMatch {
            index: 0,
            t: 0.0,
            point: points[0],
            distance: points[0].pose.position().distance(&p),
        });
        self.last = Some((trajectory.id(), found.index));
        found
    }
}
