//! Trajectory tracking controllers
//!
//! Both followers run once per simulation tick against the latest planned
//! trajectory and never block on planning.

pub mod nearest_segment;
pub mod stanley_follower;
pub mod vehicle;
pub mod velocity_follower;

pub use nearest_segment::{NearestSegment, SegmentMatch};
pub use stanley_follower::{StanleyConfig, StanleyFollower};
pub use vehicle::{ControlCommand, KinematicBicycle, VehicleParams, VehicleState};
pub use velocity_follower::{VelocityFollower, VelocityFollowerConfig};
