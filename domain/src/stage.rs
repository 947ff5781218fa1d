//! Stage events for progressive execution
//!
//! [`StageEvent`] is the unit of the staged execution mode: the
//! orchestrator publishes read-only snapshots of pipeline progress and
//! the consumer only observes them.

use crate::decision::entities::{AgentResponse, BlockedDecision, Decision, JudgeEvaluation};

/// An event in a staged council run.
///
/// Emission order is strict:
/// `Start` → (`Blocked` | `Agents`+ → `Judges` → `Final`).
/// `Agents` may be emitted multiple times with progressively filled
/// response text; `Blocked` and `Final` each close the sequence.
#[derive(Debug, Clone)]
pub enum StageEvent {
    /// Pipeline accepted the request and is starting
    Start,
    /// The safety gate rejected the query (terminal)
    Blocked(BlockedDecision),
    /// Snapshot of the generation phase, in panel-declaration order.
    /// Response text may still be partial.
    Agents(Vec<AgentResponse>),
    /// Evaluation phase complete
    Judges {
        responses: Vec<AgentResponse>,
        evaluations: Vec<JudgeEvaluation>,
    },
    /// The finished decision (terminal)
    Final(Box<Decision>),
}

impl StageEvent {
    /// Stage name for progress display and logging
    pub fn name(&self) -> &'static str {
        match self {
            StageEvent::Start => "start",
            StageEvent::Blocked(_) => "blocked",
            StageEvent::Agents(_) => "agents",
            StageEvent::Judges { .. } => "judges",
            StageEvent::Final(_) => "final",
        }
    }

    /// Whether this event closes the sequence
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageEvent::Blocked(_) | StageEvent::Final(_))
    }
}
