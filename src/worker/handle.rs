//! Single-writer, multi-reader trajectory handoff

use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::trajectory::PlannedTrajectory;

/// Latest planned trajectory shared with the control loop.
///
/// Readers clone the inner `Arc` and release the lock at once, so a reader
/// never sees a partial update and never waits on planning.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryHandle {
    inner: Arc<RwLock<Option<Arc<PlannedTrajectory>>>>,
}

impl TrajectoryHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, trajectory: PlannedTrajectory) {
        *self.inner.write() = Some(Arc::new(trajectory));
    }

    pub fn latest(&self) -> Option<Arc<PlannedTrajectory>> {
        self.inner.read().clone()
    }

    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}
