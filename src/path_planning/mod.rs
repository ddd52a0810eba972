//! Lattice path planning
//!
//! - `spiral`: curvature-polynomial boundary value solver
//! - `state_lattice`: road-anchored grid of candidate poses
//! - `cost_field`: obstacle rasterization into a road-relative cost grid
//! - `trajectory_cost`: edge pricing under acceleration profiles
//! - `graph_search`: dynamic programming over the lattice
//! - `planner`: one full planning cycle

pub mod cost_field;
pub mod graph_search;
pub mod planner;
pub mod spiral;
pub mod state_lattice;
pub mod trajectory_cost;

pub use cost_field::CostField;
pub use graph_search::{EdgeCostModel, EdgeOutcome, GraphSearch, SearchConfig, SearchResult};
pub use planner::{LatticePlanner, PlanOutput, PlanningInput};
pub use spiral::{SpiralPath, SpiralSolver};
pub use state_lattice::{Connectivity, Lattice, LatticeConfig, LatticeNode};
pub use trajectory_cost::{AccelerationProfile, FirstRingChoice, TrajectoryEvaluator};
