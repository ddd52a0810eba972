//! Error types for lattice_planner

use thiserror::Error;

/// Main error type for the planner and its ambient layers.
///
/// Numerical non-convergence of a single edge is not an error: it prices the
/// edge as infeasible. Likewise "no feasible trajectory" is reported as an
/// empty planning response rather than through this type.
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Degenerate or non-finite lane reference
    #[error("Invalid lane reference: {0}")]
    InvalidLaneReference(String),

    /// Inconsistent obstacle data
    #[error("Invalid obstacle: {0}")]
    InvalidObstacle(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Empty trajectory or decreasing arc length
    #[error("Invalid trajectory: {0}")]
    InvalidTrajectory(String),

    /// The planning worker could not be started
    #[error("Planning worker failed to initialize: {0}")]
    WorkerInit(String),

    /// The planning worker hung up
    #[error("Planning worker disconnected")]
    WorkerDisconnected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlannerError::InvalidLaneReference("need at least 2 anchors".to_string());
        assert_eq!(
            format!("{}", err),
            "Invalid lane reference: need at least 2 anchors"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PlannerError = io_err.into();
        assert!(matches!(err, PlannerError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<f64>("not a number").unwrap_err();
        let err: PlannerError = json_err.into();
        assert!(matches!(err, PlannerError::Serialization(_)));
    }
}
