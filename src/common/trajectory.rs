//! Planned trajectory shared between the planner and the tracking controllers

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::common::error::{PlannerError, PlannerResult};
use crate::common::types::{Point2D, Pose, TrajectoryPoint};

static NEXT_TRAJECTORY_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique trajectory id
pub fn next_trajectory_id() -> u64 {
    NEXT_TRAJECTORY_ID.fetch_add(1, Ordering::Relaxed)
}

/// Ordered pose sequence with monotonically non-decreasing arc length.
///
/// Controllers treat it as read-only; the `id` lets them notice when the
/// planner has swapped in a brand-new trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedTrajectory {
    id: u64,
    points: Vec<TrajectoryPoint>,
}

impl PlannedTrajectory {
    /// Build a trajectory, rejecting empty input and decreasing arc length.
    pub fn new(points: Vec<TrajectoryPoint>) -> PlannerResult<Self> {
        Self::with_id(next_trajectory_id(), points)
    }

    /// Build a trajectory under a caller-chosen id
    pub fn with_id(id: u64, points: Vec<TrajectoryPoint>) -> PlannerResult<Self> {
        if points.is_empty() {
            return Err(PlannerError::InvalidTrajectory(
                "trajectory must contain at least one point".to_string(),
            ));
        }
        if points.windows(2).any(|w| w[1].s < w[0].s) {
            return Err(PlannerError::InvalidTrajectory(
                "trajectory arc length must be non-decreasing".to_string(),
            ));
        }
        Ok(Self { id, points })
    }

    /// Build a trajectory from bare poses, assigning arc length by chord
    /// distance and a constant velocity.
    pub fn from_poses(poses: &[Pose], velocity: f64) -> PlannerResult<Self> {
        let mut s = 0.0;
        let mut points = Vec::with_capacity(poses.len());
        for (i, pose) in poses.iter().enumerate() {
            if i > 0 {
                s += poses[i - 1].position().distance(&pose.position());
            }
            points.push(TrajectoryPoint {
                pose: *pose,
                s,
                velocity,
                acceleration: 0.0,
                time: if velocity > 0.0 { s / velocity } else { 0.0 },
            });
        }
        Self::new(points)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> &TrajectoryPoint {
        &self.points[0]
    }

    pub fn last(&self) -> &TrajectoryPoint {
        &self.points[self.points.len() - 1]
    }

    pub fn total_length(&self) -> f64 {
        self.last().s - self.first().s
    }

    pub fn positions(&self) -> Vec<Point2D> {
        self.points.iter().map(|p| p.pose.position()).collect()
    }
}
