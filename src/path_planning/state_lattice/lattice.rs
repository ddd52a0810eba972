//! Road-anchored station/latitude lattice of candidate goal poses

use std::ops::RangeInclusive;

use itertools::iproduct;

use crate::common::error::{PlannerError, PlannerResult};
use crate::common::types::Pose;
use crate::config::PlannerConfig;
use crate::lane::Centerline;

/// One candidate goal pose
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeNode {
    pub station_index: usize,
    pub latitude_index: usize,
    /// Absolute station along the lane [m]
    pub station: f64,
    /// Signed offset from the centerline, positive to the left [m]
    pub latitude: f64,
    /// Pose in the vehicle frame
    pub pose: Pose,
}

/// Lattice shape parameters
#[derive(Debug, Clone, PartialEq)]
pub struct LatticeConfig {
    pub num_stations: usize,
    pub num_latitudes: usize,
    pub station_connectivity: usize,
    pub latitude_connectivity: usize,
    pub station_interval: f64,
    pub lane_width: f64,
    pub min_first_station_distance: f64,
}

impl LatticeConfig {
    pub fn from_planner_config(config: &PlannerConfig) -> Self {
        Self {
            num_stations: config.num_stations,
            num_latitudes: config.num_latitudes,
            station_connectivity: config.station_connectivity,
            latitude_connectivity: config.latitude_connectivity,
            station_interval: config.lattice_station_interval(),
            lane_width: config.lane_width,
            min_first_station_distance: config.min_first_station_distance,
        }
    }

    pub fn validate(&self) -> PlannerResult<()> {
        if self.num_stations == 0 {
            return Err(PlannerError::InvalidConfig(
                "lattice needs at least one station".to_string(),
            ));
        }
        if self.num_latitudes % 2 == 0 {
            return Err(PlannerError::InvalidConfig(format!(
                "number of latitudes must be odd, got {}",
                self.num_latitudes
            )));
        }
        if self.station_connectivity == 0 || self.latitude_connectivity == 0 {
            return Err(PlannerError::InvalidConfig(
                "lattice connectivity must be at least 1".to_string(),
            ));
        }
        if !(self.station_interval > 0.0) {
            return Err(PlannerError::InvalidConfig(format!(
                "lattice station interval must be positive, got {}",
                self.station_interval
            )));
        }
        Ok(())
    }

    pub fn connectivity(&self) -> Connectivity {
        Connectivity {
            num_stations: self.num_stations,
            num_latitudes: self.num_latitudes,
            station_connectivity: self.station_connectivity,
            latitude_connectivity: self.latitude_connectivity,
        }
    }

    pub fn center_index(&self) -> usize {
        self.num_latitudes / 2
    }

    /// Signed latitude of index `j`, spanning one lane width either side
    pub fn latitude(&self, j: usize) -> f64 {
        let c = self.center_index();
        if c == 0 {
            return 0.0;
        }
        (j as f64 - c as f64) / c as f64 * self.lane_width
    }

    /// First multiple of the station interval at least
    /// `min_first_station_distance` ahead of the vehicle
    pub fn lattice_start_station(&self, vehicle_station: f64) -> f64 {
        let target = vehicle_station + self.min_first_station_distance;
        (target / self.station_interval).ceil() * self.station_interval
    }
}

/// Curvature of a path running parallel to the centerline at `latitude`
pub fn offset_curvature(curv: f64, latitude: f64) -> f64 {
    if curv == 0.0 {
        0.0
    } else {
        1.0 / (1.0 / curv - latitude)
    }
}

/// Edge window of the lattice graph.
///
/// An edge runs from `(i, j)` to `(i + d, j')` with
/// `1 <= d <= station_connectivity` and
/// `|j' - j| <= latitude_connectivity / 2`. Edges are also laid out in a
/// dense table: each origin node owns `slots_per_node` slots, one per
/// station step and latitude offset, some of which fall off the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connectivity {
    pub num_stations: usize,
    pub num_latitudes: usize,
    pub station_connectivity: usize,
    pub latitude_connectivity: usize,
}

impl Connectivity {
    fn half_span(&self) -> usize {
        self.latitude_connectivity / 2
    }

    fn latitude_span(&self) -> usize {
        2 * self.half_span() + 1
    }

    fn latitude_window(&self, latitude: usize) -> RangeInclusive<usize> {
        let half = self.half_span();
        latitude.saturating_sub(half)..=(latitude + half).min(self.num_latitudes - 1)
    }

    /// Origins with an edge into `(station, latitude)`, nearest station
    /// first, then increasing latitude
    pub fn edges_into(self, station: usize, latitude: usize) -> impl Iterator<Item = (usize, usize)> {
        let stations = (1..=self.station_connectivity)
            .filter(move |&d| d <= station)
            .map(move |d| station - d);
        iproduct!(stations, self.latitude_window(latitude))
    }

    pub fn in_first_ring(&self, station: usize) -> bool {
        station < self.station_connectivity
    }

    pub fn slots_per_node(&self) -> usize {
        self.station_connectivity * self.latitude_span()
    }

    pub fn num_slots(&self) -> usize {
        self.num_stations * self.num_latitudes * self.slots_per_node()
    }

    /// Table slot of the edge `from -> to`, `None` outside the window
    pub fn edge_slot(&self, from: (usize, usize), to: (usize, usize)) -> Option<usize> {
        let d = to.0.checked_sub(from.0)?;
        if d == 0 || d > self.station_connectivity || to.0 >= self.num_stations {
            return None;
        }
        let offset = (to.1 + self.half_span()).checked_sub(from.1)?;
        if offset >= self.latitude_span() || to.1 >= self.num_latitudes {
            return None;
        }
        let from_index = from.0 * self.num_latitudes + from.1;
        Some(from_index * self.slots_per_node() + (d - 1) * self.latitude_span() + offset)
    }

    /// Edge stored at `slot`, `None` when it falls off the lattice
    pub fn slot_edge(&self, slot: usize) -> Option<((usize, usize), (usize, usize))> {
        let nl = self.num_latitudes;
        let from_index = slot / self.slots_per_node();
        let rest = slot % self.slots_per_node();
        let d = rest / self.latitude_span() + 1;
        let offset = rest % self.latitude_span();
        let from = (from_index / nl, from_index % nl);
        let to = (from.0 + d, (from.1 + offset).checked_sub(self.half_span())?);
        (from.0 < self.num_stations && to.0 < self.num_stations && to.1 < nl)
            .then_some((from, to))
    }
}

/// Dense grid of lattice nodes for one planning cycle
#[derive(Debug, Clone)]
pub struct Lattice {
    config: LatticeConfig,
    start_station: f64,
    nodes: Vec<LatticeNode>,
}

impl Lattice {
    /// Place nodes along `centerline` starting at `start_station`
    pub fn build(
        config: LatticeConfig,
        centerline: &Centerline,
        start_station: f64,
    ) -> PlannerResult<Self> {
        config.validate()?;

        let nodes = iproduct!(0..config.num_stations, 0..config.num_latitudes)
            .map(|(i, j)| {
                let station = start_station + i as f64 * config.station_interval;
                let latitude = config.latitude(j);
                let sample = centerline.sample_at(station);
                let position = sample.offset(latitude);
                LatticeNode {
                    station_index: i,
                    latitude_index: j,
                    station,
                    latitude,
                    pose: Pose::new(position.x, position.y, sample.pose.rot)
                        .with_curvature(offset_curvature(sample.pose.curv, latitude)),
                }
            })
            .collect();

        Ok(Self {
            config,
            start_station,
            nodes,
        })
    }

    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    pub fn start_station(&self) -> f64 {
        self.start_station
    }

    pub fn end_station(&self) -> f64 {
        self.start_station + (self.config.num_stations - 1) as f64 * self.config.station_interval
    }

    pub fn num_stations(&self) -> usize {
        self.config.num_stations
    }

    pub fn num_latitudes(&self) -> usize {
        self.config.num_latitudes
    }

    pub fn nodes(&self) -> &[LatticeNode] {
        &self.nodes
    }

    pub fn node(&self, station: usize, latitude: usize) -> &LatticeNode {
        debug_assert!(
            station < self.config.num_stations && latitude < self.config.num_latitudes,
            "lattice index ({}, {}) out of range",
            station,
            latitude
        );
        &self.nodes[station * self.config.num_latitudes + latitude]
    }

    pub fn get(&self, station: usize, latitude: usize) -> Option<&LatticeNode> {
        (station < self.config.num_stations && latitude < self.config.num_latitudes)
            .then(|| self.node(station, latitude))
    }

    pub fn connectivity(&self) -> Connectivity {
        self.config.connectivity()
    }

    /// Whether the vehicle connects directly to nodes at this station
    pub fn in_first_ring(&self, station: usize) -> bool {
        self.connectivity().in_first_ring(station)
    }

    /// Nodes the vehicle connects to directly
    pub fn first_ring(&self) -> impl Iterator<Item = &LatticeNode> + '_ {
        let end = self.config.station_connectivity.min(self.config.num_stations);
        self.nodes[..end * self.config.num_latitudes].iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{Frame, Point2D};
    use crate::lane::LanePath;

    fn config() -> LatticeConfig {
        LatticeConfig::from_planner_config(&PlannerConfig::default())
    }

    fn straight_centerline() -> Centerline {
        let lane =
            LanePath::new(vec![Point2D::new(0.0, 0.0), Point2D::new(100.0, 0.0)]).unwrap();
        Centerline::resample(&lane, 0.0, 80.0, 0.5, &Frame::new(Point2D::origin(), 0.0))
    }

    #[test]
    fn test_latitudes_symmetric() {
        let cfg = config();
        let c = cfg.center_index();
        assert_eq!(cfg.latitude(c), 0.0);
        assert!((cfg.latitude(0) + cfg.lane_width).abs() < 1e-12);
        assert!((cfg.latitude(cfg.num_latitudes - 1) - cfg.lane_width).abs() < 1e-12);
        for j in 0..c {
            assert!((cfg.latitude(j) + cfg.latitude(2 * c - j)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_start_station_anchored_to_road() {
        let cfg = config();
        // Interval 7.5, min distance 5
        assert!((cfg.lattice_start_station(0.0) - 7.5).abs() < 1e-12);
        assert!((cfg.lattice_start_station(2.0) - 7.5).abs() < 1e-12);
        assert!((cfg.lattice_start_station(3.0) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_straight_lane_curvature_exactly_zero() {
        let lattice = Lattice::build(config(), &straight_centerline(), 7.5).unwrap();
        assert_eq!(lattice.nodes().len(), 8 * 11);
        assert!(lattice.nodes().iter().all(|n| n.pose.curv == 0.0));
        let node = lattice.node(2, 0);
        assert!((node.pose.x - 22.5).abs() < 1e-6);
        assert!((node.pose.y + 3.7).abs() < 1e-6);
    }

    #[test]
    fn test_offset_curvature() {
        // Radius 50 left turn: left of center is tighter
        assert!((offset_curvature(0.02, 2.0) - 1.0 / 48.0).abs() < 1e-12);
        assert!((offset_curvature(0.02, -2.0) - 1.0 / 52.0).abs() < 1e-12);
        assert_eq!(offset_curvature(0.0, 3.0), 0.0);
    }

    #[test]
    fn test_edges_window() {
        let lattice = Lattice::build(config(), &straight_centerline(), 7.5).unwrap();
        let connectivity = lattice.connectivity();
        let into: Vec<_> = connectivity.edges_into(2, 5).collect();
        // Two stations back, seven latitudes each, nearest station first
        assert_eq!(into.len(), 14);
        assert!(into[..7].iter().all(|&(i, _)| i == 1));
        assert!(into.iter().all(|&(i, j)| i < 2 && (2..=8).contains(&j)));

        let at_edge: Vec<_> = connectivity.edges_into(1, 0).collect();
        assert_eq!(at_edge.len(), 4);
        assert!(at_edge.iter().all(|&(i, _)| i == 0));
        assert_eq!(connectivity.edges_into(0, 5).count(), 0);
    }

    #[test]
    fn test_edge_table_covers_window() {
        let connectivity = config().connectivity();
        let stored: Vec<_> = (0..connectivity.num_slots())
            .filter_map(|slot| connectivity.slot_edge(slot).map(|edge| (slot, edge)))
            .collect();
        let expected: usize = iproduct!(0..8, 0..11)
            .map(|(i, j)| connectivity.edges_into(i, j).count())
            .sum();
        assert_eq!(stored.len(), expected);
        for (slot, (from, to)) in stored {
            assert_eq!(connectivity.edge_slot(from, to), Some(slot));
            assert!(connectivity.edges_into(to.0, to.1).any(|origin| origin == from));
        }
        assert_eq!(connectivity.edge_slot((0, 5), (0, 5)), None);
        assert_eq!(connectivity.edge_slot((0, 5), (3, 5)), None);
        assert_eq!(connectivity.edge_slot((0, 5), (1, 9)), None);
        assert_eq!(connectivity.edge_slot((6, 5), (8, 5)), None);
    }

    #[test]
    fn test_first_ring() {
        let lattice = Lattice::build(config(), &straight_centerline(), 7.5).unwrap();
        assert_eq!(lattice.first_ring().count(), 2 * 11);
        assert!(lattice.in_first_ring(1));
        assert!(!lattice.in_first_ring(2));
    }

    #[test]
    fn test_even_latitudes_rejected() {
        let cfg = LatticeConfig {
            num_latitudes: 10,
            ..config()
        };
        assert!(matches!(
            Lattice::build(cfg, &straight_centerline(), 7.5),
            Err(PlannerError::InvalidConfig(_))
        ));
    }
}
