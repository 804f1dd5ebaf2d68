use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{BatchPhase, TargetId, TargetState};

/// Emitted by the orchestrator each time a grid reaches a terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub target_id: TargetId,
    pub state: TargetState,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

/// Observer of a batch. A grid is reported `Pending` when dispatch starts,
/// `Running` right before its pipeline starts, and once more through
/// [`ProgressSink::progress`] when it reaches a terminal state.
pub trait ProgressSink: Send + Sync {
    fn phase(&self, _phase: BatchPhase) {}

    fn transition(&self, _target_id: TargetId, _state: TargetState) {}

    fn progress(&self, progress: &Progress);
}

/// Logs progress as `<pct> % calculated`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn phase(&self, phase: BatchPhase) {
        info!(%phase, "batch phase");
    }

    fn transition(&self, target_id: TargetId, state: TargetState) {
        debug!(mv_grid = %target_id, %state, "MV grid state");
    }

    fn progress(&self, progress: &Progress) {
        info!(
            mv_grid = %progress.target_id,
            state = %progress.state,
            completed = progress.completed,
            total = progress.total,
            "{:.1} % calculated",
            progress.percent()
        );
    }
}
