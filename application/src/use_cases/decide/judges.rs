//! Evaluation fan-out
//!
//! Runs the full judge x response matrix concurrently and joins every
//! task before returning. A failed or timed-out evaluation is captured
//! as a neutral midpoint evaluation, so the matrix is always complete.

use super::DecideError;
use crate::ports::evaluation::{EvaluationBackend, StructuredEvaluation};
use crate::ports::progress::{CouncilPhase, ProgressNotifier};
use council_domain::{AgentResponse, JudgeEvaluation, JudgeIdentity};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Midpoint score substituted for missing, non-numeric, or failed
/// dimension values on the 0-10 scale.
const NEUTRAL_SCORE: f64 = 5.0;

/// Evaluate every response with every judge, fully parallel.
///
/// Output order is (judge, response) in declaration order regardless of
/// completion order. Aggregations downstream are commutative over judge
/// order, but a stable order keeps rationale text reproducible.
pub(super) async fn evaluate_all(
    judges: &[JudgeIdentity],
    backend: &Arc<dyn EvaluationBackend>,
    query: &str,
    responses: &[AgentResponse],
    timeout: Duration,
    cancel: &CancellationToken,
    progress: &Arc<dyn ProgressNotifier>,
) -> Result<Vec<JudgeEvaluation>, DecideError> {
    let mut join_set = JoinSet::new();

    for (judge_index, judge) in judges.iter().enumerate() {
        for (response_index, response) in responses.iter().enumerate() {
            let backend = Arc::clone(backend);
            let judge = judge.clone();
            let query = query.to_string();
            let response = response.clone();
            let slot = judge_index * responses.len() + response_index;
            join_set.spawn(async move {
                (slot, evaluate_one(&backend, &judge, &query, &response, timeout).await)
            });
        }
    }

    let total = judges.len() * responses.len();
    let mut slots: Vec<Option<JudgeEvaluation>> = (0..total).map(|_| None).collect();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                join_set.abort_all();
                return Err(DecideError::Cancelled);
            }
            joined = join_set.join_next() => match joined {
                Some(Ok((slot, evaluation))) => {
                    let success = !evaluation
                        .flagged_issues
                        .iter()
                        .any(|issue| issue == EVALUATION_ERROR_ISSUE);
                    progress.on_task_complete(
                        &CouncilPhase::Evaluation,
                        &evaluation.judge_id,
                        success,
                    );
                    slots[slot] = Some(evaluation);
                }
                Some(Err(join_err)) => {
                    warn!(error = %join_err, "evaluation task failed to join");
                }
                None => break,
            }
        }
    }

    let evaluations = slots
        .into_iter()
        .enumerate()
        .map(|(slot, entry)| {
            entry.unwrap_or_else(|| {
                let judge = &judges[slot / responses.len()];
                let response = &responses[slot % responses.len()];
                neutral_evaluation(judge, &response.agent_id, "task aborted")
            })
        })
        .collect();
    Ok(evaluations)
}

/// Flagged-issue string marking a captured evaluation failure
pub(super) const EVALUATION_ERROR_ISSUE: &str = "Evaluation error occurred";

async fn evaluate_one(
    backend: &Arc<dyn EvaluationBackend>,
    judge: &JudgeIdentity,
    query: &str,
    response: &AgentResponse,
    timeout: Duration,
) -> JudgeEvaluation {
    let rubric_prompt = judge.rubric.prompt_text();
    let result = tokio::time::timeout(
        timeout,
        backend.evaluate(query, &response.text, &rubric_prompt),
    )
    .await;

    match result {
        Ok(Ok(payload)) => scored_evaluation(judge, &response.agent_id, payload),
        Ok(Err(err)) => {
            warn!(judge = %judge.id, agent = %response.agent_id, error = %err, "evaluation failed");
            neutral_evaluation(judge, &response.agent_id, &err.to_string())
        }
        Err(_) => {
            warn!(judge = %judge.id, agent = %response.agent_id, ?timeout, "evaluation timed out");
            neutral_evaluation(judge, &response.agent_id, "deadline exceeded")
        }
    }
}

/// Build an evaluation from the structured payload.
///
/// Every rubric dimension gets a score: the backend's value when it is
/// numeric, the midpoint otherwise. Scores are clamped to the 0-10
/// scale before the weighted total is computed.
fn scored_evaluation(
    judge: &JudgeIdentity,
    agent_id: &str,
    payload: StructuredEvaluation,
) -> JudgeEvaluation {
    let scores: BTreeMap<String, f64> = judge
        .rubric
        .dimension_names()
        .map(|dimension| {
            let score = payload
                .score_for(dimension)
                .unwrap_or(NEUTRAL_SCORE)
                .clamp(0.0, 10.0);
            (dimension.to_string(), score)
        })
        .collect();
    let total_score = judge.rubric.weighted_score(&scores);

    JudgeEvaluation {
        judge_id: judge.id.clone(),
        judge_type: judge.judge_type.clone(),
        target_agent_id: agent_id.to_string(),
        scores,
        total_score,
        reasoning: payload.reasoning,
        flagged_issues: payload.issues,
    }
}

/// Captured-failure evaluation: midpoint on every dimension plus a
/// flagged issue naming the failure.
fn neutral_evaluation(judge: &JudgeIdentity, agent_id: &str, reason: &str) -> JudgeEvaluation {
    let scores: BTreeMap<String, f64> = judge
        .rubric
        .dimension_names()
        .map(|dimension| (dimension.to_string(), NEUTRAL_SCORE))
        .collect();
    let total_score = judge.rubric.weighted_score(&scores);

    JudgeEvaluation {
        judge_id: judge.id.clone(),
        judge_type: judge.judge_type.clone(),
        target_agent_id: agent_id.to_string(),
        scores,
        total_score,
        reasoning: format!("Evaluation failed: {reason}"),
        flagged_issues: vec![EVALUATION_ERROR_ISSUE.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::generation::BackendError;
    use crate::ports::progress::NoProgress;
    use async_trait::async_trait;
    use council_domain::{Rubric, RubricDimension};
    use serde_json::json;

    struct FixedScores;

    #[async_trait]
    impl EvaluationBackend for FixedScores {
        async fn evaluate(
            &self,
            _query: &str,
            _candidate: &str,
            _rubric_prompt: &str,
        ) -> Result<StructuredEvaluation, BackendError> {
            Ok(StructuredEvaluation {
                scores: BTreeMap::from([
                    ("accuracy".to_string(), json!(8.0)),
                    ("evidence".to_string(), json!("not a number")),
                ]),
                reasoning: "mixed payload".to_string(),
                issues: vec![],
            })
        }
    }

    fn judge() -> JudgeIdentity {
        JudgeIdentity::new(
            "judge_factuality",
            "Factuality",
            Rubric::new("Factuality")
                .with_dimension("accuracy", RubricDimension::new(0.6, "is it right"))
                .with_dimension("evidence", RubricDimension::new(0.4, "is it sourced")),
        )
    }

    fn response(id: &str) -> AgentResponse {
        AgentResponse::new(id, "Analytical", format!("answer from {id}"), 0.3, 10)
    }

    async fn run(
        judges: &[JudgeIdentity],
        backend: Arc<dyn EvaluationBackend>,
        responses: &[AgentResponse],
    ) -> Vec<JudgeEvaluation> {
        let progress: Arc<dyn ProgressNotifier> = Arc::new(NoProgress);
        evaluate_all(
            judges,
            &backend,
            "q",
            responses,
            Duration::from_secs(5),
            &CancellationToken::new(),
            &progress,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_non_numeric_dimension_defaults_to_midpoint() {
        let evaluations = run(&[judge()], Arc::new(FixedScores), &[response("a1")]).await;

        assert_eq!(evaluations.len(), 1);
        assert_eq!(evaluations[0].scores["accuracy"], 8.0);
        assert_eq!(evaluations[0].scores["evidence"], NEUTRAL_SCORE);
        // 0.6 * 8.0 + 0.4 * 5.0
        assert!((evaluations[0].total_score - 6.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_matrix_is_complete_and_ordered() {
        let judges = vec![judge(), {
            JudgeIdentity::new(
                "judge_safety",
                "Safety",
                Rubric::new("Safety")
                    .with_dimension("accuracy", RubricDimension::new(1.0, "")),
            )
        }];
        let responses = vec![response("a1"), response("a2")];
        let evaluations = run(&judges, Arc::new(FixedScores), &responses).await;

        assert_eq!(evaluations.len(), 4);
        assert_eq!(evaluations[0].judge_id, "judge_factuality");
        assert_eq!(evaluations[0].target_agent_id, "a1");
        assert_eq!(evaluations[1].target_agent_id, "a2");
        assert_eq!(evaluations[2].judge_id, "judge_safety");
        assert_eq!(evaluations[3].target_agent_id, "a2");
    }

    #[tokio::test]
    async fn test_backend_failure_becomes_neutral_evaluation() {
        struct AlwaysFails;

        #[async_trait]
        impl EvaluationBackend for AlwaysFails {
            async fn evaluate(
                &self,
                _query: &str,
                _candidate: &str,
                _rubric_prompt: &str,
            ) -> Result<StructuredEvaluation, BackendError> {
                Err(BackendError::RequestFailed("503".to_string()))
            }
        }

        let evaluations = run(&[judge()], Arc::new(AlwaysFails), &[response("a1")]).await;

        assert_eq!(evaluations[0].total_score, NEUTRAL_SCORE);
        assert_eq!(
            evaluations[0].flagged_issues,
            vec![EVALUATION_ERROR_ISSUE.to_string()]
        );
    }

    #[tokio::test]
    async fn test_out_of_range_scores_are_clamped() {
        struct Overeager;

        #[async_trait]
        impl EvaluationBackend for Overeager {
            async fn evaluate(
                &self,
                _query: &str,
                _candidate: &str,
                _rubric_prompt: &str,
            ) -> Result<StructuredEvaluation, BackendError> {
                Ok(StructuredEvaluation {
                    scores: BTreeMap::from([
                        ("accuracy".to_string(), json!(14.0)),
                        ("evidence".to_string(), json!(-2.0)),
                    ]),
                    ..Default::default()
                })
            }
        }

        let evaluations = run(&[judge()], Arc::new(Overeager), &[response("a1")]).await;

        assert_eq!(evaluations[0].scores["accuracy"], 10.0);
        assert_eq!(evaluations[0].scores["evidence"], 0.0);
    }
}
