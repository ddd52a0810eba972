//! Utility modules for lattice_planner

pub mod visualization;

pub use visualization::{colors, PathStyle, PointStyle, Visualizer};
