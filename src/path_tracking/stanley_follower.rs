//! Stanley steering with proportional speed control
//!
//! Ref:
//!     - [Stanley: The robot that won the DARPA grand challenge](http://isl.ecst.csuchico.edu/DOCS/darpa2005/DARPA%202005%20Stanley.pdf)
//!     - [Autonomous Automobile Path Tracking](https://www.ri.cmu.edu/pub_files/2009/2/Automatic_Steering_Methods_for_Autonomous_Automobile_Path_Tracking.pdf)

use crate::common::traits::PathTracker;
use crate::common::trajectory::PlannedTrajectory;
use crate::common::types::{normalize_angle, Point2D, Pose};

use super::nearest_segment::NearestSegment;
use super::vehicle::{ControlCommand, VehicleParams, VehicleState};

#[derive(Debug, Clone)]
pub struct StanleyConfig {
    /// Overall gain on the cross-track term
    pub gain: f64,
    /// Cross-track error gain k
    pub k: f64,
    /// Proportional speed gain
    pub speed_gain: f64,
    /// Segments searched either side of the previous match
    pub search_window: usize,
    pub vehicle: VehicleParams,
}

impl Default for StanleyConfig {
    fn default() -> Self {
        Self {
            gain: 1.0,
            k: 0.5,
            speed_gain: 1.0,
            search_window: 20,
            vehicle: VehicleParams::default(),
        }
    }
}

/// Signed distance from `point` to the path at `pose`, positive when the
/// path lies to the left of `point` along the path heading
pub fn cross_track_error(point: Point2D, pose: &Pose) -> f64 {
    let (dx, dy) = (point.x - pose.x, point.y - pose.y);
    -(-pose.rot.sin() * dx + pose.rot.cos() * dy)
}

/// Steering command that moves the wheel toward `target` at the rate limit
pub fn steer_toward(target: f64, vehicle: &VehicleState, params: &VehicleParams, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }
    let target = target.clamp(-params.max_wheel_angle, params.max_wheel_angle);
    ((target - vehicle.wheel_angle) / (dt * params.max_steer_rate)).clamp(-1.0, 1.0)
}

pub struct StanleyFollower {
    config: StanleyConfig,
    nearest: NearestSegment,
}

impl StanleyFollower {
    pub fn new(config: StanleyConfig) -> Self {
        let nearest = NearestSegment::new(config.search_window);
        Self { config, nearest }
    }

    pub fn with_defaults() -> Self {
        Self::new(StanleyConfig::default())
    }

    pub fn config(&self) -> &StanleyConfig {
        &self.config
    }

    /// Target front wheel angle from cross-track error `e` and heading
    /// error `psi`
    pub fn wheel_angle(&self, e: f64, psi: f64, velocity: f64) -> f64 {
        (-psi + self.config.gain * (self.config.k * e).atan2(velocity))
            .clamp(-self.config.vehicle.max_wheel_angle, self.config.vehicle.max_wheel_angle)
    }
}

impl PathTracker for StanleyFollower {
    fn control(
        &mut self,
        vehicle: &VehicleState,
        trajectory: &PlannedTrajectory,
        dt: f64,
    ) -> ControlCommand {
        let params = &self.config.vehicle;
        let front = vehicle.front_axle(params.wheel_base);
        let m = self.nearest.find(trajectory, front);

        let e = cross_track_error(front, &m.point.pose);
        let psi = normalize_angle(vehicle.pose.rot - m.point.pose.rot);
        let delta = self.wheel_angle(e, psi, vehicle.velocity);
        let steer = steer_toward(delta, vehicle, params, dt);

        let acceleration = self.config.speed_gain * (m.point.velocity - vehicle.velocity);
        ControlCommand::from_acceleration(acceleration, steer, params)
    }

    fn reset(&mut self) {
        self.nearest.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_tracking::vehicle::KinematicBicycle;

    fn straight() -> PlannedTrajectory {
        let poses: Vec<Pose> = (0..200).map(|i| Pose::new(i as f64 * 0.5, 0.0, 0.0)).collect();
        PlannedTrajectory::from_poses(&poses, 5.0).unwrap()
    }

    #[test]
    fn test_zero_steer_on_path() {
        let mut follower = StanleyFollower::with_defaults();
        let vehicle = VehicleState::new(Pose::new(5.0, 0.0, 0.0), 5.0);
        let cmd = follower.control(&vehicle, &straight(), 0.05);
        assert_eq!(cmd.steer, 0.0);
        assert_eq!(cmd.gas, 0.0);
        assert_eq!(cmd.brake, 0.0);
    }

    #[test]
    fn test_cross_track_sign() {
        let pose = Pose::new(0.0, 0.0, 0.0);
        // Vehicle to the right of the path: path lies to its left
        assert!((cross_track_error(Point2D::new(0.0, -1.0), &pose) - 1.0).abs() < 1e-12);
        assert!((cross_track_error(Point2D::new(0.0, 2.0), &pose) + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_steers_toward_path() {
        let mut follower = StanleyFollower::with_defaults();
        let right_of_path = VehicleState::new(Pose::new(5.0, -1.0, 0.0), 5.0);
        let cmd = follower.control(&right_of_path, &straight(), 0.05);
        assert!(cmd.steer > 0.0);

        follower.reset();
        let heading_left = VehicleState::new(Pose::new(5.0, 0.0, 0.3), 5.0);
        let cmd = follower.control(&heading_left, &straight(), 0.05);
        assert!(cmd.steer < 0.0);
    }

    #[test]
    fn test_closed_loop_converges() {
        let traj = straight();
        let mut follower = StanleyFollower::with_defaults();
        let mut car = KinematicBicycle::new(
            follower.config().vehicle.clone(),
            VehicleState::new(Pose::new(0.0, 1.5, 0.2), 3.0),
        );
        let dt = 0.05;
        for _ in 0..300 {
            let cmd = follower.control(car.state(), &traj, dt);
            car.step(&cmd, dt);
        }
        let s = car.state();
        assert!(s.pose.y.abs() < 0.2);
        assert!(s.pose.rot.abs() < 0.1);
        assert!((s.velocity - 5.0).abs() < 0.5);
    }
}
