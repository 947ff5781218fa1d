//! Progress notification port
//!
//! Defines the interface for reporting progress during a council run.
//! Implementations live in the presentation layer.

/// The pipeline phases progress is reported for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouncilPhase {
    /// Concurrent generation across the agent panel
    Generation,
    /// Concurrent judge × response evaluation
    Evaluation,
    /// Refinement of the winning answer (including the retry pass)
    Synthesis,
}

impl CouncilPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouncilPhase::Generation => "generation",
            CouncilPhase::Evaluation => "evaluation",
            CouncilPhase::Synthesis => "synthesis",
        }
    }
}

/// Callback for progress updates during a council run
pub trait ProgressNotifier: Send + Sync {
    /// Called when a phase starts
    fn on_phase_start(&self, phase: &CouncilPhase, total_tasks: usize);

    /// Called when a task completes within a phase.
    ///
    /// `worker` is the agent id during generation and the judge id
    /// during evaluation; `success` is false for captured failures.
    fn on_task_complete(&self, phase: &CouncilPhase, worker: &str, success: bool);

    /// Called when a phase completes
    fn on_phase_complete(&self, phase: &CouncilPhase);
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_phase_start(&self, _phase: &CouncilPhase, _total_tasks: usize) {}
    fn on_task_complete(&self, _phase: &CouncilPhase, _worker: &str, _success: bool) {}
    fn on_phase_complete(&self, _phase: &CouncilPhase) {}
}
