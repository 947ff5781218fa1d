//! Council decision pipeline
//!
//! [`RunCouncilUseCase`] drives the fixed pipeline shape:
//! gate, concurrent generation, concurrent evaluation, selection,
//! refinement, single-shot retry, risk classification, audit.
//!
//! Failure containment: no backend error aborts a run. Generation
//! failures become marker responses, evaluation failures become neutral
//! scores, refinement failures degrade to the winner's original text.
//! Only configuration errors (at construction) and the safety gate
//! short-circuit, and both are typed outcomes.

mod judges;
mod panel;
mod staged;
mod synthesis;

use crate::config::{ConfigError, CouncilConfig};
use crate::ports::audit::{AuditRecord, AuditSink, NoAuditSink};
use crate::ports::evaluation::EvaluationBackend;
use crate::ports::generation::GenerationBackend;
use crate::ports::progress::{CouncilPhase, NoProgress, ProgressNotifier};
use chrono::Utc;
use council_domain::{
    AgentResponse, BlockedDecision, Decision, JudgeEvaluation, RiskLevel, SafetyGate, StageEvent,
    Verdict, assess_risk, disagreement_details, extract_citations, judge_feedback_for,
    judges_disagree, select,
};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors a pipeline run can surface to the caller.
///
/// Backend failures are captured inside the run and never appear here.
#[derive(Error, Debug)]
pub enum DecideError {
    #[error("Run cancelled")]
    Cancelled,
}

/// One request to the council
#[derive(Debug, Clone)]
pub struct DecideInput {
    pub query: String,
    /// Advisory word cap forwarded to generation backends
    pub word_limit: Option<usize>,
}

impl DecideInput {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            word_limit: None,
        }
    }

    pub fn with_word_limit(mut self, word_limit: usize) -> Self {
        self.word_limit = Some(word_limit);
        self
    }
}

/// The decision pipeline orchestrator.
///
/// Holds the immutable configuration, the compiled safety gate, and the
/// injected backend ports. Cheap to clone; clones share the backends and
/// the cancellation token.
#[derive(Clone)]
pub struct RunCouncilUseCase {
    config: Arc<CouncilConfig>,
    gate: Arc<SafetyGate>,
    generation: Arc<dyn GenerationBackend>,
    evaluation: Arc<dyn EvaluationBackend>,
    audit: Arc<dyn AuditSink>,
    progress: Arc<dyn ProgressNotifier>,
    cancel: CancellationToken,
}

impl RunCouncilUseCase {
    /// Build the orchestrator, validating the configuration and
    /// compiling the safety gate. Fails fast before any query is
    /// accepted.
    pub fn new(
        config: CouncilConfig,
        generation: Arc<dyn GenerationBackend>,
        evaluation: Arc<dyn EvaluationBackend>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let gate = SafetyGate::new(&config.safety_rules)?;

        Ok(Self {
            config: Arc::new(config),
            gate: Arc::new(gate),
            generation,
            evaluation,
            audit: Arc::new(NoAuditSink),
            progress: Arc::new(NoProgress),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn with_progress(mut self, notifier: Arc<dyn ProgressNotifier>) -> Self {
        self.progress = notifier;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &CouncilConfig {
        &self.config
    }

    /// Run the full pipeline for one query.
    ///
    /// Returns exactly one [`Verdict`]: blocked when the gate rejects,
    /// decided otherwise. Both outcomes are written to the audit sink.
    pub async fn decide(&self, input: DecideInput) -> Result<Verdict, DecideError> {
        let started = Instant::now();
        let decision_id = new_decision_id();
        info!(decision_id, "council run started");

        if let Some(blocked) = self.gate_check(&decision_id, &input.query) {
            let verdict = Verdict::Blocked(blocked);
            self.record_audit(&verdict).await;
            return Ok(verdict);
        }

        self.progress
            .on_phase_start(&CouncilPhase::Generation, self.config.agents.len());
        let responses = panel::generate_all(
            &self.config.agents,
            &self.generation,
            &input.query,
            input.word_limit,
            self.config.backend_timeout,
            &self.cancel,
            &self.progress,
        )
        .await?;
        self.progress.on_phase_complete(&CouncilPhase::Generation);

        let evaluations = self.evaluate(&input.query, &responses).await?;

        let decision = self
            .finish(decision_id, input.query, responses, evaluations, started)
            .await?;
        let verdict = Verdict::Decided(Box::new(decision));
        self.record_audit(&verdict).await;
        Ok(verdict)
    }

    /// Run the pipeline progressively, emitting [`StageEvent`]s.
    ///
    /// Event order is strict: `Start`, then either `Blocked` or one or
    /// more `Agents` snapshots followed by `Judges` and `Final`.
    /// Dropping the receiver abandons the run.
    pub fn decide_staged(&self, input: DecideInput) -> mpsc::Receiver<StageEvent> {
        let (tx, rx) = mpsc::channel(16);
        let pipeline = self.clone();
        tokio::spawn(async move {
            staged::run(pipeline, input, tx).await;
        });
        rx
    }

    /// Gate the query; `Some` is a terminal blocked outcome.
    fn gate_check(&self, decision_id: &str, query: &str) -> Option<BlockedDecision> {
        let result = self.gate.check(query);
        if result.passed {
            debug!(decision_id, reason = %result.reason, "query accepted");
            return None;
        }

        info!(decision_id, reason = %result.reason, "query blocked");
        Some(BlockedDecision {
            decision_id: decision_id.to_string(),
            timestamp: Utc::now(),
            query: query.to_string(),
            block_reason: result.reason,
            matched_patterns: result.matched_patterns,
        })
    }

    async fn evaluate(
        &self,
        query: &str,
        responses: &[AgentResponse],
    ) -> Result<Vec<JudgeEvaluation>, DecideError> {
        let task_count = self.config.judges.len() * responses.len();
        self.progress
            .on_phase_start(&CouncilPhase::Evaluation, task_count);
        let evaluations = judges::evaluate_all(
            &self.config.judges,
            &self.evaluation,
            query,
            responses,
            self.config.backend_timeout,
            &self.cancel,
            &self.progress,
        )
        .await?;
        self.progress.on_phase_complete(&CouncilPhase::Evaluation);
        Ok(evaluations)
    }

    /// Everything after evaluation: selection, refinement, retry, risk,
    /// decision assembly. Shared by the single-shot and staged paths.
    async fn finish(
        &self,
        decision_id: String,
        query: String,
        responses: Vec<AgentResponse>,
        evaluations: Vec<JudgeEvaluation>,
        started: Instant,
    ) -> Result<Decision, DecideError> {
        let selection = select(&responses, &evaluations);
        let selected = responses[selection.winner_index].clone();
        let mut confidence = selection.confidence;
        let judge_disagreement =
            judges_disagree(&evaluations, self.config.disagreement_threshold);
        debug!(
            decision_id,
            winner = %selected.agent_id,
            confidence,
            judge_disagreement,
            "selection complete"
        );

        let mut refined_response = None;
        let mut retry_feedback = String::new();
        let mut was_retried = false;

        if !self.config.skip_synthesis {
            self.progress.on_phase_start(&CouncilPhase::Synthesis, 1);

            refined_response = synthesis::refine(
                self.generation.as_ref(),
                &query,
                &selected,
                &responses,
                "",
                self.config.backend_timeout,
                &self.cancel,
            )
            .await?;

            self.progress
                .on_task_complete(&CouncilPhase::Synthesis, &selected.agent_id, true);
            self.progress.on_phase_complete(&CouncilPhase::Synthesis);
        }

        // Single-shot retry: a conditional branch, never a loop.
        // Independent of skip_synthesis; that flag only skips the
        // initial refinement pass.
        if confidence < self.config.confidence_threshold && self.config.max_retries > 0 {
            let feedback = judge_feedback_for(&evaluations, &selected.agent_id);
            if !feedback.is_empty() {
                info!(decision_id, confidence, "low confidence, retrying synthesis");
                let retried = synthesis::refine(
                    self.generation.as_ref(),
                    &query,
                    &selected,
                    &responses,
                    &feedback,
                    self.config.backend_timeout,
                    &self.cancel,
                )
                .await?;
                if retried.is_some() {
                    refined_response = retried;
                }
                retry_feedback = feedback;
                was_retried = true;
                confidence = (confidence + 0.1).min(1.0);
            }
        }

        let (mut risk_level, mut identified_risks) =
            assess_risk(&evaluations, confidence, judge_disagreement);

        // Advisory annotations: warn, never withhold the answer
        if confidence < self.config.confidence_threshold && risk_level != RiskLevel::Critical {
            identified_risks.push(format!(
                "LOW CONFIDENCE ({:.0}%): human review recommended",
                confidence * 100.0
            ));
            if risk_level == RiskLevel::Low {
                risk_level = RiskLevel::Medium;
            }
        }
        if judge_disagreement {
            identified_risks
                .push("JUDGE DISAGREEMENT: evaluators diverged significantly".to_string());
            for detail in disagreement_details(&evaluations, self.config.disagreement_threshold) {
                if detail.significant {
                    identified_risks.push(format!(
                        "Judge spread for {}: {:.1} points",
                        detail.agent_id, detail.spread
                    ));
                }
            }
        }

        let was_refined = refined_response.is_some();
        let final_text = refined_response
            .as_ref()
            .map(|r| r.text.as_str())
            .unwrap_or(&selected.text);
        let citations = extract_citations(final_text);

        let decision = Decision {
            decision_id,
            timestamp: Utc::now(),
            query,
            agent_responses: responses,
            judge_evaluations: evaluations,
            selected_response: selected,
            refined_response,
            confidence,
            risk_level,
            identified_risks,
            citations,
            selection_rationale: selection.rationale,
            retry_feedback,
            processing_time_ms: started.elapsed().as_millis() as u64,
            safety_passed: true,
            judge_disagreement,
            was_refined,
            was_retried,
        };

        info!(
            decision_id = %decision.decision_id,
            winner = %decision.selected_response.agent_id,
            confidence = decision.confidence,
            risk = %decision.risk_level,
            elapsed_ms = decision.processing_time_ms,
            "council run finished"
        );
        Ok(decision)
    }

    /// Best-effort audit write. A sink failure is logged, never fatal.
    async fn record_audit(&self, verdict: &Verdict) {
        let record = AuditRecord::from_verdict(verdict);
        if let Err(err) = self.audit.record(&record).await {
            warn!(decision_id = %verdict.decision_id(), error = %err, "audit write failed");
        }
    }
}

/// Short run identifier (first 8 hex chars of a v4 UUID)
fn new_decision_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
