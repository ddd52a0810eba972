//! Planning request and response wire format
//!
//! Requests and responses are plain data (camelCase JSON). Domain objects
//! are revived from them on the worker, which validates everything before a
//! lattice is built.

use serde::{Deserialize, Serialize};

use crate::common::error::PlannerResult;
use crate::common::trajectory::PlannedTrajectory;
use crate::common::types::{Pose, TrajectoryPoint};
use crate::config::PlannerConfig;
use crate::lane::{LanePath, LaneReferenceData};
use crate::obstacles::{
    revive_dynamic, revive_static, DynamicObstacle, ObstacleData, StaticObstacle,
};
use crate::path_planning::PlanOutput;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningRequest {
    /// Stamped by the supervisor
    #[serde(default)]
    pub epoch: u64,
    #[serde(default)]
    pub config: PlannerConfig,
    pub vehicle_pose: Pose,
    pub vehicle_station: f64,
    #[serde(default)]
    pub vehicle_velocity: f64,
    pub lane_reference: LaneReferenceData,
    #[serde(default)]
    pub static_obstacles: Vec<ObstacleData>,
    #[serde(default)]
    pub dynamic_obstacles: Vec<ObstacleData>,
    /// Clear hysteresis state before planning
    #[serde(default)]
    pub reset: bool,
}

/// Domain objects revived from a request
#[derive(Debug, Clone)]
pub struct RevivedRequest {
    pub lane: LanePath,
    pub static_obstacles: Vec<StaticObstacle>,
    pub dynamic_obstacles: Vec<DynamicObstacle>,
}

impl PlanningRequest {
    pub fn from_json(json: &str) -> PlannerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> PlannerResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Validate the config and revive the lane and obstacles
    pub fn revive(&self) -> PlannerResult<RevivedRequest> {
        self.config.validate()?;
        Ok(RevivedRequest {
            lane: LanePath::from_data(&self.lane_reference)?,
            static_obstacles: revive_static(&self.static_obstacles)?,
            dynamic_obstacles: revive_dynamic(&self.dynamic_obstacles)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningResponse {
    pub epoch: u64,
    /// `None` when no trajectory was feasible
    pub path: Option<Vec<TrajectoryPoint>>,
    pub from_vehicle_segment: Option<Vec<TrajectoryPoint>>,
    pub vehicle_pose: Pose,
    pub vehicle_station: f64,
    pub lattice_start_station: f64,
}

impl PlanningResponse {
    pub fn from_output(request: &PlanningRequest, output: PlanOutput) -> Self {
        Self {
            epoch: request.epoch,
            path: output.path,
            from_vehicle_segment: output.from_vehicle_segment,
            vehicle_pose: request.vehicle_pose,
            vehicle_station: request.vehicle_station,
            lattice_start_station: output.lattice_start_station,
        }
    }

    pub fn from_json(json: &str) -> PlannerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> PlannerResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Vehicle segment followed by the lattice path, as one trajectory
    pub fn full_trajectory(&self, id: u64) -> Option<PlannedTrajectory> {
        let path = self.path.as_ref()?;
        let mut points = self.from_vehicle_segment.clone().unwrap_or_default();
        let joined = points.last().map(|p| p.s);
        points.extend(
            path.iter()
                .skip_while(|p| joined.map_or(false, |s| p.s <= s))
                .copied(),
        );
        match PlannedTrajectory::with_id(id, points) {
            Ok(trajectory) => Some(trajectory),
            Err(e) => {
                log::warn!("discarding malformed trajectory: {}", e);
                None
            }
        }
    }
}
