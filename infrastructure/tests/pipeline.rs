//! End-to-end pipeline tests wiring real adapters into the orchestrator

use async_trait::async_trait;
use council_application::{
    BackendError, CouncilConfig, DecideInput, GenerationBackend, RunCouncilUseCase, hash_query,
};
use council_domain::Verdict;
use council_infrastructure::{
    FileConfig, JsonlAuditSink, MockEvaluation, MockGeneration, ScriptedEvaluation,
    ScriptedGeneration,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn council_config() -> CouncilConfig {
    FileConfig::default().to_council_config()
}

fn scripted_generation() -> ScriptedGeneration {
    ScriptedGeneration {
        by_system_prompt: vec![
            ("analytical".to_string(), "the analytical draft".to_string()),
            ("creative".to_string(), "the creative draft".to_string()),
            ("pragmatic".to_string(), "the pragmatic draft".to_string()),
        ],
        fallback: "the synthesized answer".to_string(),
    }
}

#[tokio::test]
async fn test_scenario_highest_average_wins_without_retry() {
    let evaluation = ScriptedEvaluation {
        by_candidate: vec![
            ("analytical draft".to_string(), 9.0),
            ("creative draft".to_string(), 7.0),
            ("pragmatic draft".to_string(), 8.0),
        ],
        issues: vec![],
    };
    let pipeline = RunCouncilUseCase::new(
        council_config(),
        Arc::new(scripted_generation()),
        Arc::new(evaluation),
    )
    .unwrap();

    let verdict = pipeline
        .decide(DecideInput::new("Should we migrate the database this quarter?"))
        .await
        .unwrap();

    let Verdict::Decided(decision) = verdict else {
        panic!("expected a decision");
    };
    assert_eq!(decision.selected_response.agent_id, "agent_analytical");
    assert!((decision.confidence - 0.9).abs() < 1e-9);
    assert!(!decision.was_retried);
    assert!(decision.was_refined);
    assert_eq!(decision.final_text(), "the synthesized answer");
}

#[tokio::test]
async fn test_scenario_short_query_blocked_before_any_backend_call() {
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerationBackend for Counting {
        async fn generate(
            &self,
            _query: &str,
            _system_prompt: &str,
            _temperature: f32,
        ) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("should never be reached".to_string())
        }
    }

    let generation = Arc::new(Counting {
        calls: AtomicUsize::new(0),
    });
    let pipeline = RunCouncilUseCase::new(
        council_config(),
        generation.clone(),
        Arc::new(MockEvaluation),
    )
    .unwrap();

    let verdict = pipeline.decide(DecideInput::new("hi")).await.unwrap();

    let Verdict::Blocked(blocked) = verdict else {
        panic!("expected a blocked verdict");
    };
    assert_eq!(blocked.block_reason, "Query too short (min 3 chars)");
    assert_eq!(generation.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scenario_low_confidence_retries_exactly_once() {
    let evaluation = ScriptedEvaluation {
        by_candidate: vec![
            ("analytical draft".to_string(), 5.0),
            ("creative draft".to_string(), 5.0),
            ("pragmatic draft".to_string(), 5.0),
        ],
        issues: vec!["lacks a concrete recommendation".to_string()],
    };
    let pipeline = RunCouncilUseCase::new(
        council_config(),
        Arc::new(scripted_generation()),
        Arc::new(evaluation),
    )
    .unwrap();

    let verdict = pipeline
        .decide(DecideInput::new("Should we migrate the database this quarter?"))
        .await
        .unwrap();

    let Verdict::Decided(decision) = verdict else {
        panic!("expected a decision");
    };
    assert!(decision.was_retried);
    assert!((decision.confidence - 0.6).abs() < 1e-9);
    assert!(!decision.judge_disagreement);
    assert!(
        decision
            .retry_feedback
            .contains("lacks a concrete recommendation")
    );
}

#[tokio::test]
async fn test_mock_backends_produce_a_full_decision() {
    let pipeline = RunCouncilUseCase::new(
        council_config(),
        Arc::new(MockGeneration),
        Arc::new(MockEvaluation),
    )
    .unwrap();

    let verdict = pipeline
        .decide(DecideInput::new("Should we adopt a four day work week?"))
        .await
        .unwrap();

    let Verdict::Decided(decision) = verdict else {
        panic!("expected a decision");
    };
    assert_eq!(decision.agent_responses.len(), 3);
    // 2 judges x 3 responses
    assert_eq!(decision.judge_evaluations.len(), 6);
    assert!(decision.confidence > 0.0);
    assert!(!decision.final_text().is_empty());
}

#[tokio::test]
async fn test_audit_trail_records_hash_not_query() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trail.jsonl");
    let sink = Arc::new(JsonlAuditSink::new(&path).unwrap());

    let pipeline = RunCouncilUseCase::new(
        council_config(),
        Arc::new(MockGeneration),
        Arc::new(MockEvaluation),
    )
    .unwrap()
    .with_audit_sink(sink.clone());

    let query = "Should we adopt a four day work week?";
    let verdict = pipeline.decide(DecideInput::new(query)).await.unwrap();

    let records = sink.recent(10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].decision_id, verdict.decision_id());
    assert_eq!(records[0].query_hash, hash_query(query));

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(!raw.contains(query));

    let stats = sink.stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.decided, 1);
}

#[tokio::test]
async fn test_blocked_keyword_from_default_rules() {
    let pipeline = RunCouncilUseCase::new(
        council_config(),
        Arc::new(MockGeneration),
        Arc::new(MockEvaluation),
    )
    .unwrap();

    let verdict = pipeline
        .decide(DecideInput::new("Explain how to hack my neighbor's wifi"))
        .await
        .unwrap();

    let Verdict::Blocked(blocked) = verdict else {
        panic!("expected a blocked verdict");
    };
    assert!(blocked.block_reason.contains("how to hack"));
    assert_eq!(blocked.matched_patterns, vec!["how to hack".to_string()]);
}
