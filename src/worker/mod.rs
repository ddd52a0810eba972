//! Planning worker and trajectory handoff
//!
//! - `messages`: plain-data request/response wire format
//! - `planning_worker`: dedicated planning thread
//! - `supervisor`: control-side request pacing and epoch filtering
//! - `handle`: lock-protected latest trajectory for the controllers

pub mod handle;
pub mod messages;
pub mod planning_worker;
pub mod supervisor;

pub use handle::TrajectoryHandle;
pub use messages::{PlanningRequest, PlanningResponse, RevivedRequest};
pub use planning_worker::{serve, PlanningWorker, WorkerEvent};
pub use supervisor::{PlanningSupervisor, PollOutcome};
