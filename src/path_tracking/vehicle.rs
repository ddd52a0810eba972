//! Kinematic bicycle vehicle model
//!
//! Reference model used to close the loop around the tracking controllers in
//! tests and in the demo binary. The pose is the rear axle center.

use serde::{Deserialize, Serialize};

use crate::common::types::{normalize_angle, Point2D, Pose};

/// Vehicle limits shared by the model and the controllers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleParams {
    /// Distance between the axles [m]
    pub wheel_base: f64,
    /// Maximum front wheel angle [rad]
    pub max_wheel_angle: f64,
    /// Maximum front wheel angle rate [rad/s]
    pub max_steer_rate: f64,
    /// Acceleration at full gas [m/s^2]
    pub max_gas_accel: f64,
    /// Deceleration at full brake [m/s^2]
    pub max_brake_decel: f64,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            wheel_base: 2.8,
            max_wheel_angle: 0.6,
            max_steer_rate: 1.0,
            max_gas_accel: 3.5,
            max_brake_decel: 6.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleState {
    /// Rear axle pose
    pub pose: Pose,
    pub velocity: f64,
    /// Current front wheel angle [rad]
    pub wheel_angle: f64,
}

impl VehicleState {
    pub fn new(pose: Pose, velocity: f64) -> Self {
        Self {
            pose,
            velocity,
            wheel_angle: 0.0,
        }
    }

    pub fn front_axle(&self, wheel_base: f64) -> Point2D {
        Point2D::new(
            self.pose.x + wheel_base * self.pose.rot.cos(),
            self.pose.y + wheel_base * self.pose.rot.sin(),
        )
    }
}

/// Actuation for one tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlCommand {
    /// Gas pedal fraction in [0, 1]
    pub gas: f64,
    /// Brake pedal fraction in [0, 1]
    pub brake: f64,
    /// Steering rate as a fraction of the maximum, in [-1, 1]
    pub steer: f64,
}

impl ControlCommand {
    /// Split a signed acceleration request into pedal fractions
    pub fn from_acceleration(acceleration: f64, steer: f64, params: &VehicleParams) -> Self {
        Self {
            gas: (acceleration / params.max_gas_accel).clamp(0.0, 1.0),
            brake: (-acceleration / params.max_brake_decel).clamp(0.0, 1.0),
            steer: steer.clamp(-1.0, 1.0),
        }
    }
}

pub struct KinematicBicycle {
    params: VehicleParams,
    state: VehicleState,
}

impl KinematicBicycle {
    pub fn new(params: VehicleParams, state: VehicleState) -> Self {
        Self { params, state }
    }

    pub fn with_defaults(state: VehicleState) -> Self {
        Self::new(VehicleParams::default(), state)
    }

    pub fn params(&self) -> &VehicleParams {
        &self.params
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Apply `command` for `dt` seconds
    pub fn step(&mut self, command: &ControlCommand, dt: f64) -> VehicleState {
        let p = &self.params;
        let gas = command.gas.clamp(0.0, 1.0);
        let brake = command.brake.clamp(0.0, 1.0);
        let steer = command.steer.clamp(-1.0, 1.0);

        let s = &mut self.state;
        s.wheel_angle = (s.wheel_angle + steer * p.max_steer_rate * dt)
            .clamp(-p.max_wheel_angle, p.max_wheel_angle);
        let acceleration = gas * p.max_gas_accel - brake * p.max_brake_decel;
        s.velocity = (s.velocity + acceleration * dt).max(0.0);

        let curv = s.wheel_angle.tan() / p.wheel_base;
        s.pose.x += s.velocity * s.pose.rot.cos() * dt;
        s.pose.y += s.velocity * s.pose.rot.sin() * dt;
        s.pose.rot = normalize_angle(s.pose.rot + s.velocity * curv * dt);
        s.pose.curv = curv;
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_straight_coast() {
        let mut car = KinematicBicycle::with_defaults(VehicleState::new(Pose::origin(), 10.0));
        for _ in 0..10 {
            car.step(&ControlCommand::default(), 0.1);
        }
        let s = car.state();
        assert!((s.pose.x - 10.0).abs() < 1e-9);
        assert!(s.pose.y.abs() < 1e-12);
    }

    #[test]
    fn test_brake_never_reverses() {
        let mut car = KinematicBicycle::with_defaults(VehicleState::new(Pose::origin(), 1.0));
        let brake = ControlCommand {
            brake: 1.0,
            ..Default::default()
        };
        for _ in 0..20 {
            car.step(&brake, 0.1);
        }
        assert_eq!(car.state().velocity, 0.0);
    }

    #[test]
    fn test_steering_rate_and_angle_limited() {
        let mut car = KinematicBicycle::with_defaults(VehicleState::new(Pose::origin(), 5.0));
        let full_left = ControlCommand {
            steer: 5.0,
            ..Default::default()
        };
        car.step(&full_left, 0.1);
        assert!((car.state().wheel_angle - 0.1).abs() < 1e-12);
        for _ in 0..50 {
            car.step(&full_left, 0.1);
        }
        assert!((car.state().wheel_angle - car.params().max_wheel_angle).abs() < 1e-12);
        assert!(car.state().pose.rot.abs() <= PI);
    }

    #[test]
    fn test_pedal_split() {
        let params = VehicleParams::default();
        let accel = ControlCommand::from_acceleration(1.75, 0.0, &params);
        assert!((accel.gas - 0.5).abs() < 1e-12);
        assert_eq!(accel.brake, 0.0);
        let decel = ControlCommand::from_acceleration(-100.0, 2.0, &params);
        assert_eq!(decel.gas, 0.0);
        assert_eq!(decel.brake, 1.0);
        assert_eq!(decel.steer, 1.0);
    }
}
