//! Trajectory cost evaluation for lattice edges
//!
//! Edge geometry and static cost do not depend on speed, so every feasible
//! edge is solved and sampled once per cycle. The graph search then prices
//! each edge under an acceleration profile and an entry velocity and time,
//! which only adds the dynamic-obstacle lookups and the penalties.

use rayon::prelude::*;

use crate::common::types::{Pose, TrajectoryPoint};
use crate::config::PlannerConfig;
use crate::lane::Centerline;

use super::cost_field::{CostField, LETHAL};
use super::graph_search::{EdgeCostModel, EdgeOutcome};
use super::spiral::{SpiralKind, SpiralPath, SpiralSolver};
use super::state_lattice::Lattice;

/// Velocity slack before the speed-limit penalty applies [m/s]
const SPEED_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccelerationProfile {
    HardAccel,
    HardDecel,
    SoftAccel,
    SoftDecel,
    Zero,
    /// Whatever reaches the speed limit at the end of the edge, within the
    /// hard limits
    MatchSpeedLimit,
}

impl AccelerationProfile {
    pub const ALL: [AccelerationProfile; 6] = [
        AccelerationProfile::HardAccel,
        AccelerationProfile::HardDecel,
        AccelerationProfile::SoftAccel,
        AccelerationProfile::SoftDecel,
        AccelerationProfile::Zero,
        AccelerationProfile::MatchSpeedLimit,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn acceleration(self, config: &PlannerConfig, v0: f64, length: f64) -> f64 {
        match self {
            Self::HardAccel => config.hard_acceleration,
            Self::HardDecel => -config.hard_deceleration,
            Self::SoftAccel => config.soft_acceleration,
            Self::SoftDecel => -config.soft_deceleration,
            Self::Zero => 0.0,
            Self::MatchSpeedLimit => ((config.speed_limit.powi(2) - v0 * v0) / (2.0 * length))
                .clamp(-config.hard_deceleration, config.hard_acceleration),
        }
    }

    fn penalty(self, config: &PlannerConfig, acceleration: f64) -> f64 {
        let hard_accel = match self {
            Self::HardAccel => true,
            Self::MatchSpeedLimit => acceleration > config.soft_acceleration,
            _ => false,
        };
        let hard_decel = match self {
            Self::HardDecel => true,
            Self::MatchSpeedLimit => acceleration < -config.soft_deceleration,
            _ => false,
        };
        let mut penalty = 0.0;
        if hard_accel {
            penalty += config.hard_acceleration_penalty;
        }
        if hard_decel {
            penalty += config.hard_deceleration_penalty;
        }
        penalty
    }
}

/// Path sample with its road position and static cost
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSample {
    /// Arc length from the edge start [m]
    pub s: f64,
    pub pose: Pose,
    pub station: f64,
    pub latitude: f64,
    pub static_cost: f64,
}

/// Statically feasible edge geometry
#[derive(Debug, Clone)]
pub struct EdgePath {
    pub spiral: SpiralPath,
    pub samples: Vec<EdgeSample>,
}

impl EdgePath {
    pub fn length(&self) -> f64 {
        self.spiral.length()
    }
}

/// First-ring node chosen by the previous cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstRingChoice {
    /// Absolute station [m]
    pub station: f64,
    pub latitude_index: usize,
}

/// Time to cover `s` starting at `v0` and reaching `v` under constant `a`
fn elapsed(v0: f64, v: f64, a: f64, s: f64) -> f64 {
    if a.abs() > 1e-9 {
        (v - v0) / a
    } else {
        s / v0
    }
}

/// Solve, sample and statically price one edge
fn precompute_edge(
    solver: &SpiralSolver,
    kind: SpiralKind,
    start: &Pose,
    end: &Pose,
    centerline: &Centerline,
    cost_field: &CostField,
    config: &PlannerConfig,
) -> Option<EdgePath> {
    let spiral = solver.solve_between(kind, start, end)?;
    let mut hint = None;
    let mut samples = Vec::new();
    for sample in spiral.sample(config.path_sampling_step) {
        let pose = sample.pose;
        if pose.curv.abs() > config.curvature_max || pose.dcurv.abs() > config.dcurvature_max {
            return None;
        }
        let projection = centerline.project(pose.position(), hint);
        hint = Some(projection.index);
        let static_cost = cost_field.static_cost(projection.station, projection.latitude)?;
        if static_cost < 0.0 {
            return None;
        }
        samples.push(EdgeSample {
            s: sample.s,
            pose,
            station: projection.station,
            latitude: projection.latitude,
            static_cost: static_cost as f64,
        });
    }
    Some(EdgePath { spiral, samples })
}

/// Edge cost model for one planning cycle
pub struct TrajectoryEvaluator<'a> {
    config: &'a PlannerConfig,
    lattice: &'a Lattice,
    cost_field: &'a CostField,
    vehicle_velocity: f64,
    vehicle_edges: Vec<Option<EdgePath>>,
    lattice_edges: Vec<Option<EdgePath>>,
    previous_choice: Option<FirstRingChoice>,
}

impl<'a> TrajectoryEvaluator<'a> {
    /// Solve every vehicle edge (quintic) and lattice edge (cubic) in parallel
    pub fn new(
        config: &'a PlannerConfig,
        lattice: &'a Lattice,
        centerline: &Centerline,
        cost_field: &'a CostField,
        vehicle_pose: &Pose,
        vehicle_velocity: f64,
        previous_choice: Option<FirstRingChoice>,
    ) -> Self {
        let solver = SpiralSolver::new(config.solver.clone());

        let vehicle_edges: Vec<Option<EdgePath>> = lattice
            .first_ring()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|node| {
                precompute_edge(
                    &solver,
                    SpiralKind::Quintic,
                    vehicle_pose,
                    &node.pose,
                    centerline,
                    cost_field,
                    config,
                )
            })
            .collect();

        let connectivity = lattice.connectivity();
        let lattice_edges: Vec<Option<EdgePath>> = (0..connectivity.num_slots())
            .into_par_iter()
            .map(|slot| {
                let (from, to) = connectivity.slot_edge(slot)?;
                precompute_edge(
                    &solver,
                    SpiralKind::Cubic,
                    &lattice.node(from.0, from.1).pose,
                    &lattice.node(to.0, to.1).pose,
                    centerline,
                    cost_field,
                    config,
                )
            })
            .collect();

        log::debug!(
            "edges: {}/{} vehicle, {}/{} lattice feasible",
            vehicle_edges.iter().flatten().count(),
            vehicle_edges.len(),
            lattice_edges.iter().flatten().count(),
            connectivity.num_slots(),
        );
        Self {
            config,
            lattice,
            cost_field,
            vehicle_velocity,
            vehicle_edges,
            lattice_edges,
            previous_choice,
        }
    }

    pub fn vehicle_velocity(&self) -> f64 {
        self.vehicle_velocity
    }

    pub fn vehicle_edge_path(&self, to: (usize, usize)) -> Option<&EdgePath> {
        if !self.lattice.in_first_ring(to.0) {
            return None;
        }
        self.vehicle_edges
            .get(to.0 * self.lattice.num_latitudes() + to.1)?
            .as_ref()
    }

    pub fn lattice_edge_path(&self, from: (usize, usize), to: (usize, usize)) -> Option<&EdgePath> {
        let slot = self.lattice.connectivity().edge_slot(from, to)?;
        self.lattice_edges.get(slot)?.as_ref()
    }

    /// Price `path` under `profile` entered at `v0` and `t0`
    pub fn evaluate(
        &self,
        path: &EdgePath,
        profile: AccelerationProfile,
        v0: f64,
        t0: f64,
    ) -> Option<EdgeOutcome> {
        let config = self.config;
        let length = path.length();
        let a = profile.acceleration(config, v0, length);
        let v_end_sq = v0 * v0 + 2.0 * a * length;
        // Stops short of the end, or never gets going
        if v_end_sq < 0.0 || (v0 <= 0.0 && a <= 0.0) {
            return None;
        }

        let mut total = 0.0;
        let mut speeding = false;
        let mut lateral = false;
        for sample in &path.samples {
            let v = (v0 * v0 + 2.0 * a * sample.s).max(0.0).sqrt();
            let t = t0 + elapsed(v0, v, a, sample.s);
            let occupancy = self
                .cost_field
                .dynamic_occupancy(sample.station, sample.latitude, t)
                .unwrap_or(0.0);
            if occupancy >= LETHAL {
                return None;
            }
            total += sample.static_cost + config.obstacle_hazard_cost * occupancy as f64;
            speeding |= v > config.speed_limit + SPEED_TOLERANCE;
            lateral |= v * v * sample.pose.curv.abs() > config.lateral_acceleration_limit;
        }

        let mut penalties = profile.penalty(config, a);
        if speeding {
            penalties += config.speed_limit_penalty;
        }
        if lateral {
            penalties += config.soft_lateral_acceleration_penalty;
        }

        let mean = total / path.samples.len().max(1) as f64;
        let final_velocity = v_end_sq.sqrt();
        let duration = elapsed(v0, final_velocity, a, length);
        Some(EdgeOutcome {
            cost: (mean + penalties) * length + config.time_penalty * duration,
            final_velocity,
            final_time: t0 + duration,
        })
    }

    /// Dense trajectory points for `path` under `profile`, with arc length
    /// and time continuing from `s0` and `t0`
    pub fn trajectory_points(
        &self,
        path: &EdgePath,
        profile: AccelerationProfile,
        v0: f64,
        t0: f64,
        s0: f64,
    ) -> Vec<TrajectoryPoint> {
        let a = profile.acceleration(self.config, v0, path.length());
        path.samples
            .iter()
            .map(|sample| {
                let v = (v0 * v0 + 2.0 * a * sample.s).max(0.0).sqrt();
                TrajectoryPoint {
                    pose: sample.pose,
                    s: s0 + sample.s,
                    velocity: v,
                    acceleration: a,
                    time: t0 + elapsed(v0, v, a, sample.s),
                }
            })
            .collect()
    }

    fn matches_previous(&self, to: (usize, usize)) -> bool {
        let Some(previous) = self.previous_choice else {
            return false;
        };
        let node = self.lattice.node(to.0, to.1);
        let tolerance = self.lattice.config().station_interval * 1e-3;
        node.latitude_index == previous.latitude_index
            && (node.station - previous.station).abs() < tolerance
    }
}

impl EdgeCostModel for TrajectoryEvaluator<'_> {
    fn num_profiles(&self) -> usize {
        AccelerationProfile::ALL.len()
    }

    fn vehicle_edge(&self, to: (usize, usize), profile: usize) -> Option<EdgeOutcome> {
        let path = self.vehicle_edge_path(to)?;
        let profile = AccelerationProfile::from_index(profile)?;
        let mut outcome = self.evaluate(path, profile, self.vehicle_velocity, 0.0)?;
        if self.matches_previous(to) {
            outcome.cost *= 1.0 - self.config.hysteresis_discount;
        }
        Some(outcome)
    }

    fn lattice_edge(
        &self,
        from: (usize, usize),
        to: (usize, usize),
        profile: usize,
        velocity: f64,
        time: f64,
    ) -> Option<EdgeOutcome> {
        let path = self.lattice_edge_path(from, to)?;
        let profile = AccelerationProfile::from_index(profile)?;
        self.evaluate(path, profile, velocity, time)
    }
}
