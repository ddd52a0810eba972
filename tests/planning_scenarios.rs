//! End-to-end planning scenarios

use std::f64::consts::PI;
use std::time::Duration;

use lattice_planner::common::types::normalize_angle;
use lattice_planner::lane::LanePath;
use lattice_planner::obstacles::StaticObstacle;
use lattice_planner::path_planning::{LatticePlanner, PlanningInput};
use lattice_planner::path_tracking::{KinematicBicycle, StanleyFollower, VehicleState};
use lattice_planner::worker::{PlanningRequest, PlanningSupervisor, PollOutcome};
use lattice_planner::{
    LaneReference, PathTracker, PlannedTrajectory, PlannerConfig, PlannerError, Point2D, Pose,
};

const HEADING: f64 = PI / 6.0;

fn rotated_lane() -> LanePath {
    let dir = Point2D::new(HEADING.cos(), HEADING.sin());
    LanePath::new(vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(100.0 * dir.x, 100.0 * dir.y),
    ])
    .unwrap()
}

fn vehicle_on(lane: &LanePath, station: f64) -> Pose {
    let sample = lane.sample_station(station);
    Pose::new(sample.pose.x, sample.pose.y, sample.pose.rot)
}

#[test]
fn test_empty_straight_lane() {
    let lane = rotated_lane();
    let mut planner = LatticePlanner::with_defaults();
    let out = planner
        .plan(&PlanningInput {
            vehicle_pose: vehicle_on(&lane, 5.0),
            vehicle_station: 5.0,
            vehicle_velocity: 10.0,
            lane: &lane,
            static_obstacles: &[],
            dynamic_obstacles: &[],
        })
        .unwrap();

    let path = out.path.expect("empty road must be feasible");
    let last = path.last().unwrap();
    assert!(normalize_angle(last.pose.rot - HEADING).abs() < 0.05);
    let lane_width = planner.config().lane_width;
    for p in &path {
        let (_, latitude) = lane.station_latitude(p.pose.position());
        assert!(latitude.abs() < lane_width);
    }
    // The whole horizon is covered
    let (end_station, _) = lane.station_latitude(last.pose.position());
    let expected = out.lattice_start_station
        + (planner.config().num_stations - 1) as f64 * planner.config().lattice_station_interval();
    assert!((end_station - expected).abs() < 0.5);
}

#[test]
fn test_static_obstacle_dead_center() {
    let lane = rotated_lane();
    let obstacle_station = 25.0;
    let obstacle = StaticObstacle::new(
        lane.sample_station(obstacle_station).offset(0.0),
        HEADING,
        4.0,
        2.0,
    )
    .unwrap();
    let statics = [obstacle];
    let mut planner = LatticePlanner::with_defaults();
    let out = planner
        .plan(&PlanningInput {
            vehicle_pose: vehicle_on(&lane, 5.0),
            vehicle_station: 5.0,
            vehicle_velocity: 10.0,
            lane: &lane,
            static_obstacles: &statics,
            dynamic_obstacles: &[],
        })
        .unwrap();

    let path = out.path.expect("a lane change around the obstacle is feasible");
    let stations: Vec<(f64, f64)> = path
        .iter()
        .map(|p| lane.station_latitude(p.pose.position()))
        .collect();

    // The plan runs past the obstacle's far end
    let (last_station, _) = stations[stations.len() - 1];
    assert!(last_station > obstacle_station + 2.0 + 10.0);

    // Half the obstacle width plus clearance
    let beside: Vec<f64> = stations
        .iter()
        .filter(|(s, _)| (s - obstacle_station).abs() < 2.0)
        .map(|&(_, l)| l)
        .collect();
    assert!(!beside.is_empty());
    assert!(beside.iter().all(|l| l.abs() > 1.0 + 0.5));
}

#[test]
fn test_json_request_through_supervisor() {
    let json = r#"{
        "vehiclePose": {"x": 5.0, "y": 0.0, "rot": 0.0},
        "vehicleStation": 5.0,
        "vehicleVelocity": 8.0,
        "laneReference": {"anchors": [[0.0, 0.0], [60.0, 0.0], [120.0, 10.0]]},
        "staticObstacles": [
            {"type": "static", "pos": [40.0, 0.0], "rot": 0.0, "length": 4.0, "width": 2.0}
        ],
        "dynamicObstacles": [
            {"type": "dynamic", "startPos": [90.0, 3.7], "velocity": [-8.0, 0.0],
             "length": 4.0, "width": 2.0, "parallel": true}
        ]
    }"#;
    let request = PlanningRequest::from_json(json).unwrap();
    let mut supervisor = PlanningSupervisor::spawn(PlannerConfig::default()).unwrap();
    assert!(supervisor.request(request).unwrap());
    let outcome = supervisor.wait(Duration::from_secs(120)).unwrap();
    assert!(matches!(
        outcome,
        Some(PollOutcome::Published) | Some(PollOutcome::KeptPrevious)
    ));
    if outcome == Some(PollOutcome::Published) {
        let trajectory = supervisor.trajectory().latest().unwrap();
        assert!(trajectory
            .points()
            .windows(2)
            .all(|w| w[1].s >= w[0].s));
        assert!((trajectory.first().pose.x - 5.0).abs() < 1e-6);
    }
}

#[test]
fn test_stale_response_after_reset() {
    let lane = rotated_lane();
    let request = PlanningRequest {
        epoch: 0,
        config: PlannerConfig::default(),
        vehicle_pose: vehicle_on(&lane, 5.0),
        vehicle_station: 5.0,
        vehicle_velocity: 10.0,
        lane_reference: lane.to_data(),
        static_obstacles: Vec::new(),
        dynamic_obstacles: Vec::new(),
        reset: false,
    };
    let mut supervisor = PlanningSupervisor::spawn(PlannerConfig::default()).unwrap();
    assert!(supervisor.request(request.clone()).unwrap());
    supervisor.reset();
    // The answer to the first request is still outstanding
    assert!(!supervisor.request(request.clone()).unwrap());
    assert_eq!(
        supervisor.wait(Duration::from_secs(120)).unwrap(),
        Some(PollOutcome::Stale)
    );
    assert!(supervisor.trajectory().latest().is_none());

    assert!(supervisor.request(request).unwrap());
    assert_eq!(
        supervisor.wait(Duration::from_secs(120)).unwrap(),
        Some(PollOutcome::Published)
    );
}

#[test]
fn test_invalid_request_config_fails() {
    let lane = rotated_lane();
    let request = PlanningRequest {
        epoch: 0,
        config: PlannerConfig {
            sl_latitude_cell_size: 0.0,
            ..Default::default()
        },
        vehicle_pose: vehicle_on(&lane, 5.0),
        vehicle_station: 5.0,
        vehicle_velocity: 10.0,
        lane_reference: lane.to_data(),
        static_obstacles: Vec::new(),
        dynamic_obstacles: Vec::new(),
        reset: false,
    };
    assert!(matches!(
        request.revive(),
        Err(PlannerError::InvalidConfig(_))
    ));
    let mut supervisor = PlanningSupervisor::spawn(PlannerConfig::default()).unwrap();
    supervisor.request(request).unwrap();
    assert_eq!(
        supervisor.wait(Duration::from_secs(60)).unwrap(),
        Some(PollOutcome::RequestFailed)
    );
    assert!(!supervisor.in_flight());
}

#[test]
fn test_stanley_tracks_planned_trajectory() {
    let lane = rotated_lane();
    let start = vehicle_on(&lane, 5.0);
    let mut planner = LatticePlanner::with_defaults();
    let out = planner
        .plan(&PlanningInput {
            vehicle_pose: start,
            vehicle_station: 5.0,
            vehicle_velocity: 8.0,
            lane: &lane,
            static_obstacles: &[],
            dynamic_obstacles: &[],
        })
        .unwrap();
    let mut points = out.from_vehicle_segment.unwrap();
    points.extend(out.path.unwrap().into_iter().skip(1));
    let trajectory = PlannedTrajectory::new(points).unwrap();

    let mut follower = StanleyFollower::with_defaults();
    let mut car = KinematicBicycle::with_defaults(VehicleState::new(start, 8.0));
    let dt = 0.05;
    for _ in 0..80 {
        let command = follower.control(car.state(), &trajectory, dt);
        assert!((-1.0..=1.0).contains(&command.steer));
        car.step(&command, dt);
    }
    let (_, latitude) = lane.station_latitude(car.state().pose.position());
    assert!(latitude.abs() < 0.5);
}
