//! Dedicated planning thread
//!
//! Requests arrive over a `crossbeam_channel`, are revived into domain
//! objects and planned one at a time. Every request produces exactly one
//! event. A planner that cannot be built from the initial configuration is
//! reported once as `WorkerEvent::InitFailed` and the thread exits.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::common::error::{PlannerError, PlannerResult};
use crate::config::PlannerConfig;
use crate::path_planning::{LatticePlanner, PlanningInput};

use super::messages::{PlanningRequest, PlanningResponse};

#[derive(Debug)]
pub enum WorkerEvent {
    Planned(PlanningResponse),
    Failed { epoch: u64, error: PlannerError },
    InitFailed(String),
}

enum WorkerMessage {
    Plan(Box<PlanningRequest>),
    Shutdown,
}

pub struct PlanningWorker {
    requests: Sender<WorkerMessage>,
    events: Receiver<WorkerEvent>,
    handle: Option<JoinHandle<()>>,
}

impl PlanningWorker {
    /// Spawn the worker thread with its initial configuration
    pub fn spawn(config: PlannerConfig) -> PlannerResult<Self> {
        let (request_tx, request_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let handle = thread::Builder::new()
            .name("planning-worker".into())
            .spawn(move || run(config, request_rx, event_tx))
            .map_err(|e| PlannerError::WorkerInit(e.to_string()))?;
        Ok(Self {
            requests: request_tx,
            events: event_rx,
            handle: Some(handle),
        })
    }

    pub fn submit(&self, request: PlanningRequest) -> PlannerResult<()> {
        self.requests
            .send(WorkerMessage::Plan(Box::new(request)))
            .map_err(|_| PlannerError::WorkerDisconnected)
    }

    pub fn try_recv(&self) -> Option<WorkerEvent> {
        self.events.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> PlannerResult<Option<WorkerEvent>> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(PlannerError::WorkerDisconnected),
        }
    }
}

impl Drop for PlanningWorker {
    fn drop(&mut self) {
        let _ = self.requests.send(WorkerMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("planning worker panicked");
            }
        }
    }
}

fn run(config: PlannerConfig, requests: Receiver<WorkerMessage>, events: Sender<WorkerEvent>) {
    let mut planner = match LatticePlanner::new(config) {
        Ok(planner) => planner,
        Err(e) => {
            log::error!("planning worker failed to initialize: {}", e);
            let _ = events.send(WorkerEvent::InitFailed(e.to_string()));
            return;
        }
    };
    log::info!("planning worker started");

    for message in requests.iter() {
        let request = match message {
            WorkerMessage::Plan(request) => request,
            WorkerMessage::Shutdown => break,
        };
        let event = match serve(&mut planner, &request) {
            Ok(response) => WorkerEvent::Planned(response),
            Err(error) => {
                log::warn!("planning request {} failed: {}", request.epoch, error);
                WorkerEvent::Failed {
                    epoch: request.epoch,
                    error,
                }
            }
        };
        if events.send(event).is_err() {
            break;
        }
    }
    log::info!("planning worker stopped");
}

/// Plan one request synchronously. A request carrying a different
/// configuration rebuilds the planner, which also drops hysteresis.
pub fn serve(planner: &mut LatticePlanner, request: &PlanningRequest) -> PlannerResult<PlanningResponse> {
    let revived = request.revive()?;
    if &request.config != planner.config() {
        log::debug!("planner configuration changed");
        *planner = LatticePlanner::new(request.config.clone())?;
    } else if request.reset {
        planner.reset();
    }

    let output = planner.plan(&PlanningInput {
        vehicle_pose: request.vehicle_pose,
        vehicle_station: request.vehicle_station,
        vehicle_velocity: request.vehicle_velocity,
        lane: &revived.lane,
        static_obstacles: &revived.static_obstacles,
        dynamic_obstacles: &revived.dynamic_obstacles,
    })?;
    Ok(PlanningResponse::from_output(request, output))
}
