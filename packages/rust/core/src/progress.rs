//! Progress callbacks for pipeline runs.

use blogwriter_shared::{RunId, StepName};

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a step executes.
    fn step_started(&self, step: StepName);
    /// Called after a step's output has been merged into state.
    fn step_finished(&self, step: StepName);
    /// Called when the run pauses in front of `step`.
    fn suspended(&self, run_id: &RunId, step: StepName);
    /// Called when the run completes.
    fn done(&self, run_id: &RunId);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn step_started(&self, _step: StepName) {}
    fn step_finished(&self, _step: StepName) {}
    fn suspended(&self, _run_id: &RunId, _step: StepName) {}
    fn done(&self, _run_id: &RunId) {}
}
