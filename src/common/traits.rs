//! Common traits defining the seams between planner components

use crate::common::trajectory::PlannedTrajectory;
use crate::common::types::Point2D;
use crate::lane::CenterlineSample;
use crate::path_tracking::{ControlCommand, VehicleState};

/// Station-indexed sampling of a lane centerline
pub trait LaneReference {
    /// Total centerline length [m]
    fn length(&self) -> f64;

    /// Sample the centerline at a single station. Stations beyond either end
    /// are extrapolated along the end tangent.
    fn sample_station(&self, station: f64) -> CenterlineSample;

    /// Sample `num` stations spaced `interval` apart, starting at `start`
    fn sample_stations(&self, start: f64, num: usize, interval: f64) -> Vec<CenterlineSample> {
        (0..num)
            .map(|i| self.sample_station(start + i as f64 * interval))
            .collect()
    }

    /// Road-relative (station, latitude) of a world point
    fn station_latitude(&self, point: Point2D) -> (f64, f64);
}

/// Trait for trajectory tracking controllers run on every simulation tick
pub trait PathTracker {
    /// Compute the actuation command for this tick. Must not block.
    fn control(
        &mut self,
        vehicle: &VehicleState,
        trajectory: &PlannedTrajectory,
        dt: f64,
    ) -> ControlCommand;

    /// Forget any continuity state (e.g. the last nearest segment)
    fn reset(&mut self);
}
