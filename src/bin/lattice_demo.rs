//
// Lattice planning demo: a curved two-lane road with a parked car and an
// oncoming vehicle. The planner runs on its worker thread while a Stanley
// follower drives a kinematic bicycle along the latest trajectory.
//
// usage: lattice_demo [config.toml]
//

use std::path::Path;
use std::time::Duration;

use lattice_planner::lane::LanePath;
use lattice_planner::obstacles::{DynamicObstacle, StaticObstacle};
use lattice_planner::path_tracking::{KinematicBicycle, StanleyFollower, VehicleState};
use lattice_planner::utils::{colors, PathStyle, Visualizer};
use lattice_planner::worker::{PlanningRequest, PlanningSupervisor};
use lattice_planner::{LaneReference, PathTracker, PlannerConfig, PlannerResult, Point2D, Pose};

const DT: f64 = 0.05;
const SIM_TIME: f64 = 20.0;
/// Simulation ticks between planning requests
const REPLAN_TICKS: usize = 10;

fn main() -> PlannerResult<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => PlannerConfig::load(Path::new(&path))?,
        None => PlannerConfig::default(),
    };

    let anchors: Vec<Point2D> = (0..=12)
        .map(|i| {
            let x = i as f64 * 20.0;
            Point2D::new(x, 8.0 * (x / 60.0).sin())
        })
        .collect();
    let lane = LanePath::new(anchors)?;
    let parked_at = lane.sample_station(60.0);
    let parked = StaticObstacle::new(parked_at.offset(0.0), parked_at.pose.rot, 4.5, 2.0)?;
    let oncoming_start = lane.sample_station(150.0);
    let oncoming = DynamicObstacle::new(
        oncoming_start.offset(config.lane_width),
        Point2D::new(-6.0 * oncoming_start.pose.rot.cos(), -6.0 * oncoming_start.pose.rot.sin()),
        4.5,
        2.0,
        true,
    )?;

    let start = lane.sample_station(5.0);
    let mut car = KinematicBicycle::with_defaults(VehicleState::new(
        Pose::new(start.pose.x, start.pose.y, start.pose.rot),
        8.0,
    ));
    let mut follower = StanleyFollower::with_defaults();
    let mut supervisor = PlanningSupervisor::spawn(config.clone())?;

    let mut driven = Vec::new();
    let mut first_plan = None;
    let steps = (SIM_TIME / DT) as usize;
    for tick in 0..steps {
        let time = tick as f64 * DT;
        let state = *car.state();
        let (vehicle_station, _) = lane.station_latitude(state.pose.position());

        if tick % REPLAN_TICKS == 0 {
            // Obstacles are sent at their current positions
            let moved = DynamicObstacle::new(
                oncoming.position_at_time(time),
                oncoming.velocity,
                oncoming.length,
                oncoming.width,
                oncoming.parallel,
            )?;
            let request = PlanningRequest {
                epoch: 0,
                config: config.clone(),
                vehicle_pose: state.pose,
                vehicle_station,
                vehicle_velocity: state.velocity,
                lane_reference: lane.to_data(),
                static_obstacles: vec![parked.to_data()],
                dynamic_obstacles: vec![moved.to_data()],
                reset: false,
            };
            supervisor.request(request)?;
        }
        if tick == 0 {
            // Let the very first plan land before driving
            supervisor.wait(Duration::from_secs(30))?;
        }
        supervisor.poll();

        let Some(trajectory) = supervisor.trajectory().latest() else {
            continue;
        };
        if first_plan.is_none() {
            first_plan = Some(trajectory.clone());
        }
        let command = follower.control(&state, &trajectory, DT);
        car.step(&command, DT);
        driven.push(car.state().pose.position());
    }

    let final_state = car.state();
    println!(
        "drove to ({:.1}, {:.1}) at {:.1} m/s",
        final_state.pose.x, final_state.pose.y, final_state.velocity
    );

    std::fs::create_dir_all("img/path_planning")?;
    let mut vis = Visualizer::new();
    // The road is far longer than it is wide
    vis.set_title("State lattice planning")
        .set_aspect_ratio(None)
        .plot_lane(&lane, 0.0, lane.length(), config.lane_shoulder_latitude)
        .plot_static_obstacle(&parked)
        .plot_dynamic_obstacle(&oncoming, 0.0, SIM_TIME);
    if let Some(plan) = &first_plan {
        vis.plot_trajectory(plan);
    }
    if let Some(response) = supervisor.last_response() {
        if let Some(path) = &response.path {
            vis.plot_trajectory_points(path, &PathStyle::new(colors::ORANGE, "Last plan"));
        }
    }
    vis.plot_line(&driven, &PathStyle::new(colors::DRIVEN, "Driven"))
        .plot_vehicle(&final_state.pose, 3.0);
    let output_path = "img/path_planning/lattice_demo.png";
    match vis.save_png(output_path, 1200, 600) {
        Ok(()) => println!("plot saved to: {}", output_path),
        Err(e) => log::warn!("could not save plot: {}", e),
    }
    Ok(())
}
