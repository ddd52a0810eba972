//! Dynamic-programming search over the state lattice
//!
//! Each lattice node is split into cells by the acceleration profile of the
//! edge that reached it and by bucketed arrival velocity and time. Stations
//! are relaxed in increasing order, so every origin cell is final before
//! any edge leaving it is priced.

use itertools::iproduct;
use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::config::PlannerConfig;

use super::state_lattice::Connectivity;

/// Price and end state of one edge under one acceleration profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeOutcome {
    pub cost: f64,
    pub final_velocity: f64,
    pub final_time: f64,
}

/// Edge pricing used by the search. `None` marks an infeasible edge.
pub trait EdgeCostModel: Sync {
    fn num_profiles(&self) -> usize;

    /// Edge from the vehicle to a first-ring node `(station, latitude)`
    fn vehicle_edge(&self, to: (usize, usize), profile: usize) -> Option<EdgeOutcome>;

    /// Edge between two lattice nodes, entered at `velocity` and `time`
    fn lattice_edge(
        &self,
        from: (usize, usize),
        to: (usize, usize),
        profile: usize,
        velocity: f64,
        time: f64,
    ) -> Option<EdgeOutcome>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub num_stations: usize,
    pub num_latitudes: usize,
    pub station_connectivity: usize,
    pub latitude_connectivity: usize,
    pub speed_limit: f64,
    pub num_velocity_buckets: usize,
    pub num_time_buckets: usize,
    pub time_bucket_duration: f64,
}

impl SearchConfig {
    pub fn from_planner_config(config: &PlannerConfig) -> Self {
        Self {
            num_stations: config.num_stations,
            num_latitudes: config.num_latitudes,
            station_connectivity: config.station_connectivity,
            latitude_connectivity: config.latitude_connectivity,
            speed_limit: config.speed_limit,
            num_velocity_buckets: config.num_velocity_buckets,
            num_time_buckets: config.num_time_buckets,
            time_bucket_duration: config.time_bucket_duration,
        }
    }

    pub fn connectivity(&self) -> Connectivity {
        Connectivity {
            num_stations: self.num_stations,
            num_latitudes: self.num_latitudes,
            station_connectivity: self.station_connectivity,
            latitude_connectivity: self.latitude_connectivity,
        }
    }
}

/// Address of one search cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellIndex {
    pub station: usize,
    pub latitude: usize,
    pub profile: usize,
    pub velocity_bucket: usize,
    pub time_bucket: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backpointer {
    Vehicle,
    Cell(CellIndex),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub cost: f64,
    pub velocity: f64,
    pub time: f64,
    pub backpointer: Backpointer,
}

/// One edge of the winning chain, vehicle side first
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchLink {
    /// Origin node, `None` for the edge leaving the vehicle
    pub from: Option<(usize, usize)>,
    pub to: (usize, usize),
    pub profile: usize,
    /// Entry velocity; NaN on the vehicle edge, whose entry state belongs to
    /// the cost model
    pub start_velocity: f64,
    pub start_time: f64,
    pub end_velocity: f64,
    pub end_time: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub links: Vec<SearchLink>,
    pub cost: f64,
}

impl SearchResult {
    /// Destination of the first edge
    pub fn first_ring_node(&self) -> Option<(usize, usize)> {
        self.links.first().map(|l| l.to)
    }
}

pub struct GraphSearch {
    config: SearchConfig,
}

impl GraphSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn velocity_bucket(&self, velocity: f64) -> usize {
        let n = self.config.num_velocity_buckets;
        if n <= 1 {
            return 0;
        }
        let width = self.config.speed_limit / (n - 1) as f64;
        ((velocity / width).floor().max(0.0) as usize).min(n - 1)
    }

    pub fn time_bucket(&self, time: f64) -> usize {
        let n = self.config.num_time_buckets;
        ((time / self.config.time_bucket_duration).floor().max(0.0) as usize).min(n - 1)
    }

    fn cells_per_node(&self, num_profiles: usize) -> usize {
        num_profiles * self.config.num_velocity_buckets * self.config.num_time_buckets
    }

    fn local_index(&self, profile: usize, velocity_bucket: usize, time_bucket: usize) -> usize {
        (profile * self.config.num_velocity_buckets + velocity_bucket)
            * self.config.num_time_buckets
            + time_bucket
    }

    fn cell_index(&self, node: (usize, usize), local: usize, num_profiles: usize) -> CellIndex {
        let nt = self.config.num_time_buckets;
        let nv = self.config.num_velocity_buckets;
        debug_assert!(local < self.cells_per_node(num_profiles));
        CellIndex {
            station: node.0,
            latitude: node.1,
            profile: local / (nv * nt),
            velocity_bucket: (local / nt) % nv,
            time_bucket: local % nt,
        }
    }

    fn relax(
        &self,
        cells: &mut [Option<Cell>],
        local: usize,
        outcome: EdgeOutcome,
        base_cost: f64,
        backpointer: Backpointer,
    ) {
        let cost = base_cost + outcome.cost;
        if !cost.is_finite() {
            return;
        }
        let better = match &cells[local] {
            Some(existing) => cost < existing.cost,
            None => true,
        };
        if better {
            cells[local] = Some(Cell {
                cost,
                velocity: outcome.final_velocity,
                time: outcome.final_time,
                backpointer,
            });
        }
    }

    /// Cells of one destination node given all finalized earlier stations
    fn solve_node<M: EdgeCostModel>(
        &self,
        model: &M,
        table: &[Vec<Option<Cell>>],
        to: (usize, usize),
    ) -> Vec<Option<Cell>> {
        let num_profiles = model.num_profiles();
        let mut cells = vec![None; self.cells_per_node(num_profiles)];

        let connectivity = self.config.connectivity();
        if connectivity.in_first_ring(to.0) {
            for profile in 0..num_profiles {
                if let Some(outcome) = model.vehicle_edge(to, profile) {
                    let local = self.local_index(
                        profile,
                        self.velocity_bucket(outcome.final_velocity),
                        self.time_bucket(outcome.final_time),
                    );
                    self.relax(&mut cells, local, outcome, 0.0, Backpointer::Vehicle);
                }
            }
        }

        for from in connectivity.edges_into(to.0, to.1) {
            let origin_cells = &table[from.0 * self.config.num_latitudes + from.1];
            for (origin_local, origin) in origin_cells.iter().enumerate() {
                let Some(origin) = origin else {
                    continue;
                };
                for profile in 0..num_profiles {
                    let Some(outcome) =
                        model.lattice_edge(from, to, profile, origin.velocity, origin.time)
                    else {
                        continue;
                    };
                    let local = self.local_index(
                        profile,
                        self.velocity_bucket(outcome.final_velocity),
                        self.time_bucket(outcome.final_time),
                    );
                    let back = Backpointer::Cell(self.cell_index(from, origin_local, num_profiles));
                    self.relax(&mut cells, local, outcome, origin.cost, back);
                }
            }
        }
        cells
    }

    /// Minimum-cost chain from the vehicle to the furthest reachable station
    pub fn search<M: EdgeCostModel>(&self, model: &M) -> Option<SearchResult> {
        let ns = self.config.num_stations;
        let nl = self.config.num_latitudes;
        let mut table: Vec<Vec<Option<Cell>>> = Vec::with_capacity(ns * nl);

        for station in 0..ns {
            let row: Vec<Vec<Option<Cell>>> = (0..nl)
                .into_par_iter()
                .map(|latitude| self.solve_node(model, &table, (station, latitude)))
                .collect();
            table.extend(row);
        }

        let terminal = self.terminal(&table, model.num_profiles())?;
        Some(self.backtrack(&table, terminal))
    }

    /// Cheapest cell at the last station, else the cheapest at the furthest
    /// reachable station
    fn terminal(&self, table: &[Vec<Option<Cell>>], num_profiles: usize) -> Option<CellIndex> {
        let nl = self.config.num_latitudes;
        (0..self.config.num_stations).rev().find_map(|station| {
            iproduct!(0..nl, 0..table[station * nl].len())
                .filter_map(|(latitude, local)| {
                    let cell = table[station * nl + latitude][local].as_ref()?;
                    Some((OrderedFloat(cell.cost), (station, latitude), local))
                })
                .min_by_key(|(cost, _, _)| *cost)
                .map(|(_, node, local)| self.cell_index(node, local, num_profiles))
        })
    }

    fn lookup<'t>(&self, table: &'t [Vec<Option<Cell>>], index: &CellIndex) -> Option<&'t Cell> {
        let local = self.local_index(index.profile, index.velocity_bucket, index.time_bucket);
        table[index.station * self.config.num_latitudes + index.latitude][local].as_ref()
    }

    fn backtrack(&self, table: &[Vec<Option<Cell>>], terminal: CellIndex) -> SearchResult {
        let mut links = Vec::new();
        let mut current = terminal;
        let cost = self.lookup(table, &terminal).map_or(f64::INFINITY, |c| c.cost);

        while let Some(cell) = self.lookup(table, &current) {
            let to = (current.station, current.latitude);
            match cell.backpointer {
                Backpointer::Vehicle => {
                    links.push(SearchLink {
                        from: None,
                        to,
                        profile: current.profile,
                        start_velocity: f64::NAN,
                        start_time: 0.0,
                        end_velocity: cell.velocity,
                        end_time: cell.time,
                    });
                    break;
                }
                Backpointer::Cell(prev) => {
                    let (start_velocity, start_time) = self
                        .lookup(table, &prev)
                        .map_or((f64::NAN, f64::NAN), |p| (p.velocity, p.time));
                    links.push(SearchLink {
                        from: Some((prev.station, prev.latitude)),
                        to,
                        profile: current.profile,
                        start_velocity,
                        start_time,
                        end_velocity: cell.velocity,
                        end_time: cell.time,
                    });
                    current = prev;
                }
            }
        }
        links.reverse();
        SearchResult { links, cost }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Constant-speed model with hand-set edge costs
    struct TableModel {
        vehicle: HashMap<(usize, usize), f64>,
        lattice: HashMap<((usize, usize), (usize, usize)), f64>,
    }

    impl EdgeCostModel for TableModel {
        fn num_profiles(&self) -> usize {
            1
        }

        fn vehicle_edge(&self, to: (usize, usize), _profile: usize) -> Option<EdgeOutcome> {
            self.vehicle.get(&to).map(|&cost| EdgeOutcome {
                cost,
                final_velocity: 5.0,
                final_time: 1.0,
            })
        }

        fn lattice_edge(
            &self,
            from: (usize, usize),
            to: (usize, usize),
            _profile: usize,
            velocity: f64,
            time: f64,
        ) -> Option<EdgeOutcome> {
            self.lattice.get(&(from, to)).map(|&cost| EdgeOutcome {
                cost,
                final_velocity: velocity,
                final_time: time + 1.0,
            })
        }
    }

    fn config_3x3() -> SearchConfig {
        SearchConfig {
            num_stations: 3,
            num_latitudes: 3,
            station_connectivity: 1,
            latitude_connectivity: 3,
            speed_limit: 10.0,
            num_velocity_buckets: 1,
            num_time_buckets: 1,
            time_bucket_duration: 10.0,
        }
    }

    fn full_model(cost: impl Fn((usize, usize), (usize, usize)) -> f64) -> TableModel {
        let mut vehicle = HashMap::new();
        let mut lattice = HashMap::new();
        for j in 0..3 {
            vehicle.insert((0, j), cost((usize::MAX, 1), (0, j)));
        }
        for i in 0..2 {
            for a in 0..3 {
                for b in 0..3 {
                    if (a as i64 - b as i64).abs() <= 1 {
                        lattice.insert(((i, a), (i + 1, b)), cost((i, a), (i + 1, b)));
                    }
                }
            }
        }
        TableModel { vehicle, lattice }
    }

    #[test]
    fn test_optimal_chain_on_3x3() {
        // Cheap route weaves 1 -> 0 -> 1; the straight route costs more
        let model = full_model(|from, to| match (from, to) {
            ((usize::MAX, _), (0, 0)) => 1.0,
            ((usize::MAX, _), _) => 2.0,
            ((0, 0), (1, 1)) => 0.5,
            ((1, 1), (2, 2)) => 0.25,
            _ => 3.0,
        });
        let search = GraphSearch::new(config_3x3());
        let result = search.search(&model).unwrap();
        let nodes: Vec<_> = result.links.iter().map(|l| l.to).collect();
        assert_eq!(nodes, vec![(0, 0), (1, 1), (2, 2)]);
        assert!((result.cost - 1.75).abs() < 1e-12);
        assert_eq!(result.links[0].from, None);
        assert_eq!(result.links[1].from, Some((0, 0)));
    }

    #[test]
    fn test_matches_brute_force() {
        let weights = |from: (usize, usize), to: (usize, usize)| {
            let seed = (from.0.wrapping_mul(31) ^ from.1.wrapping_mul(7) ^ to.0 * 13 ^ to.1 * 5)
                % 11;
            1.0 + seed as f64
        };
        let model = full_model(weights);
        let result = GraphSearch::new(config_3x3()).search(&model).unwrap();

        let mut best = f64::INFINITY;
        for a in 0..3usize {
            for b in 0..3usize {
                for c in 0..3usize {
                    if a.abs_diff(b) > 1 || b.abs_diff(c) > 1 {
                        continue;
                    }
                    let cost = model.vehicle[&(0, a)]
                        + model.lattice[&((0, a), (1, b))]
                        + model.lattice[&((1, b), (2, c))];
                    best = best.min(cost);
                }
            }
        }
        assert!((result.cost - best).abs() < 1e-12);
        assert_eq!(result.links.len(), 3);
    }

    #[test]
    fn test_falls_back_to_furthest_station() {
        let mut model = full_model(|_, _| 1.0);
        model.lattice.retain(|(from, _), _| from.0 == 0);
        let result = GraphSearch::new(config_3x3()).search(&model).unwrap();
        assert_eq!(result.links.len(), 2);
        assert_eq!(result.links[1].to.0, 1);
    }

    #[test]
    fn test_no_vehicle_edge_is_none() {
        let mut model = full_model(|_, _| 1.0);
        model.vehicle.clear();
        assert!(GraphSearch::new(config_3x3()).search(&model).is_none());
    }

    #[test]
    fn test_buckets() {
        let search = GraphSearch::new(SearchConfig {
            num_velocity_buckets: 4,
            num_time_buckets: 2,
            time_bucket_duration: 4.0,
            speed_limit: 15.0,
            ..config_3x3()
        });
        assert_eq!(search.velocity_bucket(0.0), 0);
        assert_eq!(search.velocity_bucket(4.9), 0);
        assert_eq!(search.velocity_bucket(5.0), 1);
        assert_eq!(search.velocity_bucket(14.9), 2);
        assert_eq!(search.velocity_bucket(15.0), 3);
        assert_eq!(search.velocity_bucket(40.0), 3);
        assert_eq!(search.time_bucket(3.9), 0);
        assert_eq!(search.time_bucket(20.0), 1);

        let single = GraphSearch::new(config_3x3());
        assert_eq!(single.velocity_bucket(9.0), 0);
    }

    #[test]
    fn test_ties_keep_first_found() {
        let model = full_model(|_, _| 1.0);
        let result = GraphSearch::new(config_3x3()).search(&model).unwrap();
        // All chains cost 3; the first vehicle edge (latitude 0) is kept and
        // every later node keeps its lowest-latitude origin
        assert!((result.cost - 3.0).abs() < 1e-12);
        assert_eq!(result.links[0].to, (0, 0));
    }
}
