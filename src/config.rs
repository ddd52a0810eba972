//! Planner configuration
//!
//! A single explicit struct enumerating every tunable of the planning
//! pipeline. It travels inside each planning request, can be loaded from a
//! TOML file, and is validated once before a planner is built from it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::error::{PlannerError, PlannerResult};

/// Spiral path solver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpiralSolverConfig {
    /// Sum of absolute (x, y, heading) residuals below which a solve converged
    pub convergence_tolerance: f64,
    /// Newton iteration cap for the full-strength solve
    pub max_iterations: usize,
    /// Number of continuation steps ramping the boundary conditions
    pub relaxation_steps: usize,
    /// Newton iterations per continuation step
    pub relaxation_iterations: usize,
}

impl Default for SpiralSolverConfig {
    fn default() -> Self {
        Self {
            convergence_tolerance: 0.01,
            max_iterations: 24,
            relaxation_steps: 16,
            relaxation_iterations: 4,
        }
    }
}

/// Configuration for one planning cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerConfig {
    // Horizon and lattice
    /// Distance ahead of the vehicle covered by the lattice [m]
    pub spatial_horizon: f64,
    /// Spacing of the resampled centerline [m]
    pub centerline_station_interval: f64,
    /// Number of lattice stations
    pub num_stations: usize,
    /// Number of lattice latitudes (odd)
    pub num_latitudes: usize,
    /// How many stations ahead an edge may reach
    pub station_connectivity: usize,
    /// Width of the lateral window an edge may reach, in latitude indices
    pub latitude_connectivity: usize,
    /// Minimum distance between the vehicle and the first lattice station [m]
    pub min_first_station_distance: f64,

    // Grids
    /// XY occupancy grid cell size [m]
    pub xy_grid_cell_size: f64,
    /// Road-relative grid cell size along the station axis [m]
    pub sl_station_cell_size: f64,
    /// Road-relative grid cell size along the latitude axis [m]
    pub sl_latitude_cell_size: f64,
    /// Extra grid extent around the lattice [m]
    pub grid_margin: f64,

    // Obstacle dilation
    pub lethal_dilation_s: f64,
    pub hazard_dilation_s: f64,
    pub lethal_dilation_l: f64,
    pub hazard_dilation_l: f64,
    /// Cost of a full hazard cell (hazard cells carry half of it)
    pub obstacle_hazard_cost: f64,

    // Dynamic obstacles
    /// Number of time-bucketed dynamic obstacle layers
    pub num_dynamic_layers: usize,
    /// Duration covered by one dynamic layer [s]
    pub dynamic_layer_duration: f64,

    // Lane
    pub lane_width: f64,
    /// Half-width of the zero-cost band around the centerline [m]
    pub lane_center_band: f64,
    /// Lane cost per meter of latitude outside the center band
    pub lane_cost_slope: f64,
    /// Latitude beyond which cells are infeasible [m]
    pub lane_shoulder_latitude: f64,
    /// Preferred side: positive is left, negative right, zero none
    pub lane_preference: f64,
    /// Fractional lane cost discount on the preferred side
    pub lane_preference_discount: f64,

    // Velocity and acceleration
    pub speed_limit: f64,
    pub speed_limit_penalty: f64,
    pub soft_acceleration: f64,
    pub hard_acceleration: f64,
    /// Magnitude of the soft deceleration [m/s^2]
    pub soft_deceleration: f64,
    /// Magnitude of the hard deceleration [m/s^2]
    pub hard_deceleration: f64,
    pub hard_acceleration_penalty: f64,
    pub hard_deceleration_penalty: f64,
    pub lateral_acceleration_limit: f64,
    pub soft_lateral_acceleration_penalty: f64,
    /// Maximum curvature rate along a path [1/m^2]
    pub dcurvature_max: f64,
    /// Maximum curvature along a path [1/m]
    pub curvature_max: f64,
    /// Cost per second spent on an edge
    pub time_penalty: f64,

    // Search
    pub num_velocity_buckets: usize,
    pub num_time_buckets: usize,
    pub time_bucket_duration: f64,
    /// Cost discount for re-choosing last cycle's first-ring node
    pub hysteresis_discount: f64,
    /// Arc length step used to sample edges and the output trajectory [m]
    pub path_sampling_step: f64,

    pub solver: SpiralSolverConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            spatial_horizon: 60.0,
            centerline_station_interval: 0.5,
            num_stations: 8,
            num_latitudes: 11,
            station_connectivity: 2,
            latitude_connectivity: 7,
            min_first_station_distance: 5.0,
            xy_grid_cell_size: 0.25,
            sl_station_cell_size: 0.25,
            sl_latitude_cell_size: 0.1,
            grid_margin: 5.0,
            lethal_dilation_s: 2.5,
            hazard_dilation_s: 5.0,
            lethal_dilation_l: 1.0,
            hazard_dilation_l: 1.5,
            obstacle_hazard_cost: 10.0,
            num_dynamic_layers: 8,
            dynamic_layer_duration: 1.0,
            lane_width: 3.7,
            lane_center_band: 0.3,
            lane_cost_slope: 2.0,
            lane_shoulder_latitude: 4.0,
            lane_preference: 0.0,
            lane_preference_discount: 0.25,
            speed_limit: 15.0,
            speed_limit_penalty: 20.0,
            soft_acceleration: 1.0,
            hard_acceleration: 2.5,
            soft_deceleration: 1.5,
            hard_deceleration: 4.0,
            hard_acceleration_penalty: 2.0,
            hard_deceleration_penalty: 2.0,
            lateral_acceleration_limit: 3.0,
            soft_lateral_acceleration_penalty: 10.0,
            dcurvature_max: 0.25,
            curvature_max: 0.25,
            time_penalty: 1.0,
            num_velocity_buckets: 4,
            num_time_buckets: 2,
            time_bucket_duration: 4.0,
            hysteresis_discount: 0.1,
            path_sampling_step: 0.5,
            solver: SpiralSolverConfig::default(),
        }
    }
}

impl PlannerConfig {
    /// Load and validate a configuration from a TOML file
    pub fn load(path: &Path) -> PlannerResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(contents: &str) -> PlannerResult<Self> {
        let config: PlannerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Spacing between lattice stations [m]
    pub fn lattice_station_interval(&self) -> f64 {
        self.spatial_horizon / self.num_stations as f64
    }

    /// Check every tunable once, before any planning happens
    pub fn validate(&self) -> PlannerResult<()> {
        let positive = [
            ("spatialHorizon", self.spatial_horizon),
            ("centerlineStationInterval", self.centerline_station_interval),
            ("xyGridCellSize", self.xy_grid_cell_size),
            ("slStationCellSize", self.sl_station_cell_size),
            ("slLatitudeCellSize", self.sl_latitude_cell_size),
            ("laneWidth", self.lane_width),
            ("laneShoulderLatitude", self.lane_shoulder_latitude),
            ("speedLimit", self.speed_limit),
            ("softAcceleration", self.soft_acceleration),
            ("hardAcceleration", self.hard_acceleration),
            ("softDeceleration", self.soft_deceleration),
            ("hardDeceleration", self.hard_deceleration),
            ("lateralAccelerationLimit", self.lateral_acceleration_limit),
            ("dcurvatureMax", self.dcurvature_max),
            ("curvatureMax", self.curvature_max),
            ("dynamicLayerDuration", self.dynamic_layer_duration),
            ("timeBucketDuration", self.time_bucket_duration),
            ("pathSamplingStep", self.path_sampling_step),
            ("convergenceTolerance", self.solver.convergence_tolerance),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(PlannerError::InvalidConfig(format!(
                    "{} must be a positive finite number, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("minFirstStationDistance", self.min_first_station_distance),
            ("gridMargin", self.grid_margin),
            ("lethalDilationS", self.lethal_dilation_s),
            ("hazardDilationS", self.hazard_dilation_s),
            ("lethalDilationL", self.lethal_dilation_l),
            ("hazardDilationL", self.hazard_dilation_l),
            ("obstacleHazardCost", self.obstacle_hazard_cost),
            ("laneCenterBand", self.lane_center_band),
            ("laneCostSlope", self.lane_cost_slope),
            ("speedLimitPenalty", self.speed_limit_penalty),
            ("hardAccelerationPenalty", self.hard_acceleration_penalty),
            ("hardDecelerationPenalty", self.hard_deceleration_penalty),
            (
                "softLateralAccelerationPenalty",
                self.soft_lateral_acceleration_penalty,
            ),
            ("timePenalty", self.time_penalty),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(PlannerError::InvalidConfig(format!(
                    "{} must be a non-negative finite number, got {}",
                    name, value
                )));
            }
        }

        if !self.lane_preference.is_finite() {
            return Err(PlannerError::InvalidConfig(
                "lanePreference must be finite".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.lane_preference_discount) {
            return Err(PlannerError::InvalidConfig(
                "lanePreferenceDiscount must lie in [0, 1]".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.hysteresis_discount) {
            return Err(PlannerError::InvalidConfig(
                "hysteresisDiscount must lie in [0, 1)".to_string(),
            ));
        }
        if self.soft_acceleration > self.hard_acceleration
            || self.soft_deceleration > self.hard_deceleration
        {
            return Err(PlannerError::InvalidConfig(
                "soft acceleration limits must not exceed hard limits".to_string(),
            ));
        }

        if self.num_stations == 0 {
            return Err(PlannerError::InvalidConfig(
                "numStations must be at least 1".to_string(),
            ));
        }
        if self.num_latitudes == 0 || self.num_latitudes % 2 == 0 {
            return Err(PlannerError::InvalidConfig(format!(
                "numLatitudes must be odd, got {}",
                self.num_latitudes
            )));
        }
        if self.station_connectivity == 0 || self.station_connectivity > self.num_stations {
            return Err(PlannerError::InvalidConfig(format!(
                "stationConnectivity must lie in [1, numStations], got {}",
                self.station_connectivity
            )));
        }
        if self.latitude_connectivity == 0 {
            return Err(PlannerError::InvalidConfig(
                "latitudeConnectivity must be at least 1".to_string(),
            ));
        }
        if self.num_velocity_buckets == 0 || self.num_time_buckets == 0 {
            return Err(PlannerError::InvalidConfig(
                "velocity and time bucket counts must be at least 1".to_string(),
            ));
        }
        if self.solver.max_iterations == 0 {
            return Err(PlannerError::InvalidConfig(
                "solver.maxIterations must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PlannerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_even_latitudes_rejected() {
        let config = PlannerConfig {
            num_latitudes: 10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PlannerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_negative_cell_size_rejected() {
        let config = PlannerConfig {
            xy_grid_cell_size: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connectivity_beyond_stations_rejected() {
        let config = PlannerConfig {
            num_stations: 3,
            station_connectivity: 4,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lattice_station_interval() {
        let config = PlannerConfig {
            spatial_horizon: 80.0,
            num_stations: 10,
            ..Default::default()
        };
        assert!((config.lattice_station_interval() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = PlannerConfig::from_toml_str(
            r#"
            spatialHorizon = 40.0
            numLatitudes = 7

            [solver]
            maxIterations = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.spatial_horizon, 40.0);
        assert_eq!(config.num_latitudes, 7);
        assert_eq!(config.solver.max_iterations, 12);
        assert_eq!(config.solver.relaxation_steps, 16);
        assert_eq!(config.speed_limit, PlannerConfig::default().speed_limit);
    }

    #[test]
    fn test_from_toml_invalid() {
        let result = PlannerConfig::from_toml_str("numLatitudes = 4");
        assert!(matches!(result, Err(PlannerError::InvalidConfig(_))));

        let result = PlannerConfig::from_toml_str("numLatitudes = \"many\"");
        assert!(matches!(result, Err(PlannerError::ConfigParse(_))));
    }
}
