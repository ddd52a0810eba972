//! lattice_planner - state lattice motion planning for on-road driving
//!
//! This crate plans locally optimal trajectories along a reference lane
//! around static and moving obstacles, and tracks them with steering and
//! speed controllers.

// Core modules
pub mod common;
pub mod config;
pub mod lane;
pub mod obstacles;
pub mod utils;

// Planning and tracking
pub mod path_planning;
pub mod path_tracking;
pub mod worker;

// Re-export common types for convenience
pub use common::{Frame, PlannedTrajectory, Point2D, Pose, TrajectoryPoint};
pub use common::{LaneReference, PathTracker};
pub use common::{PlannerError, PlannerResult};
pub use config::PlannerConfig;
