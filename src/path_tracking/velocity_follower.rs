//! Velocity-profile follower
//!
//! Tracks the planned velocity and acceleration with a PD loop plus
//! acceleration feed-forward, and steers with curvature feed-forward
//! corrected by the Stanley law.

use crate::common::traits::PathTracker;
use crate::common::trajectory::PlannedTrajectory;
use crate::common::types::normalize_angle;

use super::nearest_segment::NearestSegment;
use super::stanley_follower::{cross_track_error, steer_toward};
use super::vehicle::{ControlCommand, VehicleParams, VehicleState};

#[derive(Debug, Clone)]
pub struct VelocityFollowerConfig {
    pub kp: f64,
    pub kd: f64,
    /// Cross-track gain of the steering correction
    pub k: f64,
    pub search_window: usize,
    pub vehicle: VehicleParams,
}

impl Default for VelocityFollowerConfig {
    fn default() -> Self {
        Self {
            kp: 1.0,
            kd: 0.1,
            k: 0.5,
            search_window: 20,
            vehicle: VehicleParams::default(),
        }
    }
}

pub struct VelocityFollower {
    config: VelocityFollowerConfig,
    nearest: NearestSegment,
    /// Velocity error and trajectory id of the previous tick
    previous: Option<(u64, f64)>,
}

impl VelocityFollower {
    pub fn new(config: VelocityFollowerConfig) -> Self {
        let nearest = NearestSegment::new(config.search_window);
        Self {
            config,
            nearest,
            previous: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(VelocityFollowerConfig::default())
    }

    pub fn config(&self) -> &VelocityFollowerConfig {
        &self.config
    }

    /// Target acceleration clamped to the pedal limits
    pub fn target_acceleration(&self, error: f64, error_rate: f64, feed_forward: f64) -> f64 {
        let p = &self.config.vehicle;
        (self.config.kp * error + self.config.kd * error_rate + feed_forward)
            .clamp(-p.max_brake_decel, p.max_gas_accel)
    }
}

impl PathTracker for VelocityFollower {
    fn control(
        &mut self,
        vehicle: &VehicleState,
        trajectory: &PlannedTrajectory,
        dt: f64,
    ) -> ControlCommand {
        let params = &self.config.vehicle;
        let front = vehicle.front_axle(params.wheel_base);
        let m = self.nearest.find(trajectory, front);
        let target = m.point;

        let error = target.velocity - vehicle.velocity;
        let error_rate = match self.previous {
            Some((id, previous)) if id == trajectory.id() && dt > 0.0 => (error - previous) / dt,
            _ => 0.0,
        };
        self.previous = Some((trajectory.id(), error));
        let acceleration = self.target_acceleration(error, error_rate, target.acceleration);

        let feed_forward = (params.wheel_base * target.pose.curv).atan();
        let e = cross_track_error(front, &target.pose);
        let psi = normalize_angle(vehicle.pose.rot - target.pose.rot);
        let correction = -psi + (self.config.k * e).atan2(vehicle.velocity);
        let steer = steer_toward(feed_forward + correction, vehicle, params, dt);

        ControlCommand::from_acceleration(acceleration, steer, params)
    }

    fn reset(&mut self) {
        self.nearest.reset();
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{Pose, TrajectoryPoint};
    use crate::path_tracking::vehicle::KinematicBicycle;

    fn ramp() -> PlannedTrajectory {
        // Accelerate from 5 to about 8.6 m/s at 1 m/s^2
        let points = (0..=100)
            .map(|i| {
                let s = i as f64 * 0.5;
                let v = (25.0 + 2.0 * s).sqrt();
                TrajectoryPoint {
                    pose: Pose::new(s, 0.0, 0.0),
                    s,
                    velocity: v,
                    acceleration: 1.0,
                    time: v - 5.0,
                }
            })
            .collect();
        PlannedTrajectory::new(points).unwrap()
    }

    #[test]
    fn test_feed_forward_on_profile() {
        let mut follower = VelocityFollower::with_defaults();
        let front_on_start = VehicleState::new(Pose::new(-2.8, 0.0, 0.0), 5.0);
        let cmd = follower.control(&front_on_start, &ramp(), 0.05);
        assert!((cmd.gas - 1.0 / 3.5).abs() < 1e-9);
        assert_eq!(cmd.brake, 0.0);
    }

    #[test]
    fn test_acceleration_clamped() {
        let follower = VelocityFollower::with_defaults();
        assert_eq!(follower.target_acceleration(100.0, 0.0, 0.0), 3.5);
        assert_eq!(follower.target_acceleration(-100.0, 0.0, 0.0), -6.5);
    }

    #[test]
    fn test_curvature_feed_forward() {
        let radius = 20.0;
        let poses: Vec<Pose> = (0..100)
            .map(|i| {
                let a = i as f64 * 0.02;
                Pose::new(radius * a.sin(), radius * (1.0 - a.cos()), a)
                    .with_curvature(1.0 / radius)
            })
            .collect();
        let traj = PlannedTrajectory::from_poses(&poses, 5.0).unwrap();
        let mut follower = VelocityFollower::with_defaults();
        // Front axle on the vertex at 0.4 rad, heading along the circle
        let a = 0.4f64;
        let wheel_base = follower.config().vehicle.wheel_base;
        let front = (radius * a.sin(), radius * (1.0 - a.cos()));
        let rear = Pose::new(
            front.0 - wheel_base * a.cos(),
            front.1 - wheel_base * a.sin(),
            a,
        );
        let mut vehicle = VehicleState::new(rear, 5.0);
        vehicle.wheel_angle = (wheel_base / radius).atan();
        let cmd = follower.control(&vehicle, &traj, 0.05);
        assert!(cmd.steer.abs() < 0.05);
    }

    #[test]
    fn test_closed_loop_tracks_speed() {
        let traj = ramp();
        let mut follower = VelocityFollower::with_defaults();
        let mut car = KinematicBicycle::new(
            follower.config().vehicle.clone(),
            VehicleState::new(Pose::new(-2.8, 0.3, 0.0), 5.0),
        );
        let dt = 0.05;
        for _ in 0..60 {
            let cmd = follower.control(car.state(), &traj, dt);
            car.step(&cmd, dt);
        }
        let s = car.state();
        let expected = (25.0f64 + 2.0 * (s.pose.x + 2.8)).sqrt();
        assert!((s.velocity - expected).abs() < 0.3);
        assert!(s.pose.y.abs() < 0.3);
    }
}
