//! Lattice planner
//!
//! Runs one planning cycle: resample the lane in the vehicle frame, place
//! the lattice, build the cost field, price every edge and search for the
//! cheapest chain. The only state kept between cycles is the first-ring
//! node chosen last time, used for hysteresis.

use crate::common::error::{PlannerError, PlannerResult};
use crate::common::traits::LaneReference;
use crate::common::types::{Frame, Pose, TrajectoryPoint};
use crate::config::PlannerConfig;
use crate::lane::Centerline;
use crate::obstacles::{DynamicObstacle, StaticObstacle};

use super::cost_field::CostField;
use super::graph_search::{GraphSearch, SearchConfig, SearchResult};
use super::state_lattice::{Lattice, LatticeConfig};
use super::trajectory_cost::{AccelerationProfile, FirstRingChoice, TrajectoryEvaluator};

/// World-frame inputs of one planning cycle
pub struct PlanningInput<'a> {
    pub vehicle_pose: Pose,
    /// Vehicle station along the lane [m]
    pub vehicle_station: f64,
    pub vehicle_velocity: f64,
    pub lane: &'a dyn LaneReference,
    pub static_obstacles: &'a [StaticObstacle],
    pub dynamic_obstacles: &'a [DynamicObstacle],
}

/// Result of one planning cycle, in the world frame
#[derive(Debug, Clone)]
pub struct PlanOutput {
    /// Lattice part of the winning chain; `None` when nothing is feasible
    pub path: Option<Vec<TrajectoryPoint>>,
    /// Edge from the vehicle to the first lattice node
    pub from_vehicle_segment: Option<Vec<TrajectoryPoint>>,
    pub lattice_start_station: f64,
    pub cost: Option<f64>,
    /// Every lattice node this cycle, for display
    pub lattice_nodes: Vec<Pose>,
}

pub struct LatticePlanner {
    config: PlannerConfig,
    previous_choice: Option<FirstRingChoice>,
}

impl LatticePlanner {
    pub fn new(config: PlannerConfig) -> PlannerResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            previous_choice: None,
        })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: PlannerConfig::default(),
            previous_choice: None,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn previous_choice(&self) -> Option<FirstRingChoice> {
        self.previous_choice
    }

    /// Forget the hysteresis choice
    pub fn reset(&mut self) {
        self.previous_choice = None;
    }

    pub fn plan(&mut self, input: &PlanningInput) -> PlannerResult<PlanOutput> {
        let config = &self.config;
        if !input.vehicle_pose.is_finite()
            || !input.vehicle_station.is_finite()
            || !input.vehicle_velocity.is_finite()
        {
            return Err(PlannerError::InvalidConfig(
                "vehicle state must be finite".to_string(),
            ));
        }
        if input.vehicle_velocity < 0.0 {
            return Err(PlannerError::InvalidConfig(format!(
                "vehicle velocity must not be negative, got {}",
                input.vehicle_velocity
            )));
        }

        let frame = Frame::from_pose(&input.vehicle_pose);
        let vehicle_pose = frame.pose_to_local(&input.vehicle_pose);

        let lattice_config = LatticeConfig::from_planner_config(config);
        let lattice_start = lattice_config.lattice_start_station(input.vehicle_station);
        let lattice_end =
            lattice_start + (config.num_stations - 1) as f64 * lattice_config.station_interval;
        let centerline = Centerline::resample(
            input.lane,
            input.vehicle_station - config.grid_margin,
            lattice_end + config.grid_margin,
            config.centerline_station_interval,
            &frame,
        );
        let lattice = Lattice::build(lattice_config, &centerline, lattice_start)?;

        let static_obstacles: Vec<StaticObstacle> = input
            .static_obstacles
            .iter()
            .map(|o| o.to_local(&frame))
            .collect();
        let dynamic_obstacles: Vec<DynamicObstacle> = input
            .dynamic_obstacles
            .iter()
            .map(|o| o.to_local(&frame))
            .collect();
        let cost_field = CostField::build(config, &centerline, &static_obstacles, &dynamic_obstacles);

        let evaluator = TrajectoryEvaluator::new(
            config,
            &lattice,
            &centerline,
            &cost_field,
            &vehicle_pose,
            input.vehicle_velocity,
            self.previous_choice,
        );
        let search = GraphSearch::new(SearchConfig::from_planner_config(config));

        let lattice_nodes = lattice
            .nodes()
            .iter()
            .map(|n| frame.pose_to_world(&n.pose))
            .collect();

        let Some(result) = search.search(&evaluator) else {
            log::warn!(
                "no feasible trajectory from station {:.1}",
                input.vehicle_station
            );
            return Ok(PlanOutput {
                path: None,
                from_vehicle_segment: None,
                lattice_start_station: lattice_start,
                cost: None,
                lattice_nodes,
            });
        };

        let (from_vehicle_segment, path) = assemble(&evaluator, &result, input.vehicle_velocity);
        let to_world = |points: Vec<TrajectoryPoint>| -> Vec<TrajectoryPoint> {
            points
                .into_iter()
                .map(|p| TrajectoryPoint {
                    pose: frame.pose_to_world(&p.pose),
                    ..p
                })
                .collect()
        };

        self.previous_choice = result.first_ring_node().map(|(i, j)| {
            let node = lattice.node(i, j);
            FirstRingChoice {
                station: node.station,
                latitude_index: node.latitude_index,
            }
        });
        log::debug!(
            "planned {} edges to station index {}, cost {:.2}",
            result.links.len(),
            result.links.last().map_or(0, |l| l.to.0),
            result.cost
        );

        Ok(PlanOutput {
            path: Some(to_world(path)),
            from_vehicle_segment: Some(to_world(from_vehicle_segment)),
            lattice_start_station: lattice_start,
            cost: Some(result.cost),
            lattice_nodes,
        })
    }
}

/// Dense local-frame points of the winning chain, split into the vehicle
/// edge and the rest. Arc length and time run on across edges.
fn assemble(
    evaluator: &TrajectoryEvaluator,
    result: &SearchResult,
    vehicle_velocity: f64,
) -> (Vec<TrajectoryPoint>, Vec<TrajectoryPoint>) {
    let mut from_vehicle = Vec::new();
    let mut path: Vec<TrajectoryPoint> = Vec::new();
    let mut s0 = 0.0;
    for link in &result.links {
        let Some(profile) = AccelerationProfile::from_index(link.profile) else {
            continue;
        };
        let edge = match link.from {
            None => evaluator.vehicle_edge_path(link.to),
            Some(from) => evaluator.lattice_edge_path(from, link.to),
        };
        let Some(edge) = edge else {
            continue;
        };
        match link.from {
            None => {
                from_vehicle =
                    evaluator.trajectory_points(edge, profile, vehicle_velocity, 0.0, s0);
            }
            Some(_) => {
                let points = evaluator.trajectory_points(
                    edge,
                    profile,
                    link.start_velocity,
                    link.start_time,
                    s0,
                );
                // Shared node between consecutive edges
                let skip = usize::from(!path.is_empty());
                path.extend(points.into_iter().skip(skip));
            }
        }
        s0 += edge.length();
    }
    (from_vehicle, path)
}
