//! Planning supervisor
//!
//! Lives on the control side. Keeps at most one request in flight, stamps
//! requests with the current epoch and publishes accepted trajectories to
//! the [`TrajectoryHandle`]. `reset` bumps the epoch so that a response to a
//! request issued before the reset is dropped on arrival. That request still
//! counts as in flight until its response or failure comes back.

use std::time::Duration;

use crate::common::error::{PlannerError, PlannerResult};
use crate::common::trajectory::next_trajectory_id;
use crate::config::PlannerConfig;

use super::handle::TrajectoryHandle;
use super::messages::{PlanningRequest, PlanningResponse};
use super::planning_worker::{PlanningWorker, WorkerEvent};

/// What a processed worker event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new trajectory was published
    Published,
    /// The response held no feasible path; the previous trajectory stays
    KeptPrevious,
    /// The response belonged to an earlier epoch
    Stale,
    RequestFailed,
    WorkerFailed,
}

pub struct PlanningSupervisor {
    worker: PlanningWorker,
    trajectory: TrajectoryHandle,
    epoch: u64,
    in_flight: Option<u64>,
    pending_reset: bool,
    failure: Option<String>,
    last_response: Option<PlanningResponse>,
}

impl PlanningSupervisor {
    pub fn new(worker: PlanningWorker, trajectory: TrajectoryHandle) -> Self {
        Self {
            worker,
            trajectory,
            epoch: 0,
            in_flight: None,
            pending_reset: false,
            failure: None,
            last_response: None,
        }
    }

    pub fn spawn(config: PlannerConfig) -> PlannerResult<Self> {
        Ok(Self::new(PlanningWorker::spawn(config)?, TrajectoryHandle::new()))
    }

    pub fn trajectory(&self) -> &TrajectoryHandle {
        &self.trajectory
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether the request in flight was issued before the last reset
    pub fn awaiting_stale(&self) -> bool {
        self.in_flight.is_some_and(|epoch| epoch != self.epoch)
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn last_response(&self) -> Option<&PlanningResponse> {
        self.last_response.as_ref()
    }

    /// Submit `request` unless one is already in flight, stale or not.
    /// Returns whether it was sent. After a worker initialization failure
    /// nothing is sent.
    pub fn request(&mut self, mut request: PlanningRequest) -> PlannerResult<bool> {
        if let Some(failure) = &self.failure {
            return Err(PlannerError::WorkerInit(failure.clone()));
        }
        if self.in_flight.is_some() {
            return Ok(false);
        }
        request.epoch = self.epoch;
        request.reset |= std::mem::take(&mut self.pending_reset);
        self.worker.submit(request)?;
        self.in_flight = Some(self.epoch);
        Ok(true)
    }

    /// Start a new epoch: drop the current trajectory, ignore responses to
    /// older requests and clear hysteresis on the next request
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.pending_reset = true;
        self.last_response = None;
        self.trajectory.clear();
        log::info!("planning reset, epoch {}", self.epoch);
    }

    /// Process every event already waiting, without blocking
    pub fn poll(&mut self) -> Vec<PollOutcome> {
        let mut outcomes = Vec::new();
        while let Some(event) = self.worker.try_recv() {
            outcomes.push(self.handle_event(event));
        }
        outcomes
    }

    /// Block up to `timeout` for the next event
    pub fn wait(&mut self, timeout: Duration) -> PlannerResult<Option<PollOutcome>> {
        Ok(self
            .worker
            .recv_timeout(timeout)?
            .map(|event| self.handle_event(event)))
    }

    fn handle_event(&mut self, event: WorkerEvent) -> PollOutcome {
        match event {
            WorkerEvent::InitFailed(message) => {
                log::error!("planning disabled: {}", message);
                self.failure = Some(message);
                self.in_flight = None;
                PollOutcome::WorkerFailed
            }
            WorkerEvent::Failed { epoch, error } => {
                self.settle(epoch);
                log::warn!("planning request failed: {}", error);
                PollOutcome::RequestFailed
            }
            WorkerEvent::Planned(response) => {
                self.settle(response.epoch);
                if response.epoch != self.epoch {
                    log::debug!(
                        "dropping response from epoch {} (now {})",
                        response.epoch,
                        self.epoch
                    );
                    return PollOutcome::Stale;
                }
                let outcome = match response.full_trajectory(next_trajectory_id()) {
                    Some(trajectory) => {
                        self.trajectory.publish(trajectory);
                        PollOutcome::Published
                    }
                    None => {
                        log::info!("no feasible trajectory, keeping the previous one");
                        PollOutcome::KeptPrevious
                    }
                };
                self.last_response = Some(response);
                outcome
            }
        }
    }

    fn settle(&mut self, epoch: u64) {
        if self.in_flight == Some(epoch) {
            self.in_flight = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Pose;
    use crate::lane::LaneReferenceData;

    fn request() -> PlanningRequest {
        PlanningRequest {
            epoch: 0,
            config: PlannerConfig::default(),
            vehicle_pose: Pose::new(5.0, 0.0, 0.0),
            vehicle_station: 5.0,
            vehicle_velocity: 10.0,
            lane_reference: LaneReferenceData {
                anchors: vec![[0.0, 0.0], [120.0, 0.0]],
            },
            static_obstacles: Vec::new(),
            dynamic_obstacles: Vec::new(),
            reset: false,
        }
    }

    #[test]
    fn test_one_request_in_flight() {
        let mut supervisor = PlanningSupervisor::spawn(PlannerConfig::default()).unwrap();
        assert!(supervisor.request(request()).unwrap());
        assert!(!supervisor.request(request()).unwrap());
        let outcome = supervisor.wait(Duration::from_secs(60)).unwrap();
        assert_eq!(outcome, Some(PollOutcome::Published));
        assert!(!supervisor.in_flight());
        assert!(supervisor.trajectory().latest().is_some());
    }

    #[test]
    fn test_stale_epoch_dropped() {
        let mut supervisor = PlanningSupervisor::spawn(PlannerConfig::default()).unwrap();
        supervisor.request(request()).unwrap();
        supervisor.reset();
        assert_eq!(supervisor.epoch(), 1);
        let outcome = supervisor.wait(Duration::from_secs(60)).unwrap();
        assert_eq!(outcome, Some(PollOutcome::Stale));
        assert!(supervisor.trajectory().latest().is_none());

        assert!(supervisor.request(request()).unwrap());
        let outcome = supervisor.wait(Duration::from_secs(60)).unwrap();
        assert_eq!(outcome, Some(PollOutcome::Published));
        assert_eq!(supervisor.last_response().map(|r| r.epoch), Some(1));
    }

    #[test]
    fn test_reset_waits_for_stale_response() {
        let mut supervisor = PlanningSupervisor::spawn(PlannerConfig::default()).unwrap();
        assert!(supervisor.request(request()).unwrap());
        supervisor.reset();
        assert!(supervisor.in_flight());
        assert!(supervisor.awaiting_stale());
        assert!(!supervisor.request(request()).unwrap());

        let outcome = supervisor.wait(Duration::from_secs(60)).unwrap();
        assert_eq!(outcome, Some(PollOutcome::Stale));
        assert!(!supervisor.in_flight());

        // Exactly one response was outstanding
        assert!(supervisor.request(request()).unwrap());
        assert!(!supervisor.awaiting_stale());
        let outcome = supervisor.wait(Duration::from_secs(60)).unwrap();
        assert_eq!(outcome, Some(PollOutcome::Published));
        assert!(supervisor.wait(Duration::from_millis(200)).unwrap().is_none());
    }

    #[test]
    fn test_init_failure_is_permanent() {
        let config = PlannerConfig {
            station_connectivity: 0,
            ..Default::default()
        };
        let mut supervisor = PlanningSupervisor::spawn(config).unwrap();
        let outcome = supervisor.wait(Duration::from_secs(10)).unwrap();
        assert_eq!(outcome, Some(PollOutcome::WorkerFailed));
        assert!(supervisor.failure().is_some());
        assert!(matches!(
            supervisor.request(request()),
            Err(PlannerError::WorkerInit(_))
        ));
    }
}
