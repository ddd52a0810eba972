//! Lane reference
//!
//! - `cubic_spline`: spline fitted through the lane anchors
//! - `lane_path`: world-frame lane with true arc-length stations
//! - `centerline`: per-cycle resampled centerline in the vehicle frame

pub mod cubic_spline;
pub mod lane_path;
pub mod centerline;

pub use centerline::{Centerline, CenterlineSample, Projection};
pub use cubic_spline::Spline2D;
pub use lane_path::{LanePath, LaneReferenceData};
