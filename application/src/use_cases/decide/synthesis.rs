//! Refinement pass
//!
//! Improves the winning answer with the other agents' perspectives and,
//! on the retry branch, the judges' feedback. Refinement degrades
//! gracefully: any backend failure returns `None` and the caller keeps
//! the winner's original text.

use super::DecideError;
use crate::ports::generation::GenerationBackend;
use council_domain::AgentResponse;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const REFINER_TEMPERATURE: f32 = 0.3;

const REFINER_SYSTEM_PROMPT: &str = "You are a synthesis assistant for a decision council. \
You improve a chosen answer by integrating useful material from supplementary perspectives. \
You never change the chosen answer's conclusions and never weaken its safety posture.";

/// Refine the winner using the other agents' responses.
///
/// Returns `None` when there is nothing to refine against (the winner is
/// the only usable response) or when the backend call fails. `Some`
/// carries the refined response, id-tagged as derived from the winner.
pub(super) async fn refine(
    backend: &dyn GenerationBackend,
    query: &str,
    winner: &AgentResponse,
    all_responses: &[AgentResponse],
    judge_feedback: &str,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<Option<AgentResponse>, DecideError> {
    let perspectives: Vec<&AgentResponse> = all_responses
        .iter()
        .filter(|r| r.agent_id != winner.agent_id && !r.is_error())
        .collect();
    if perspectives.is_empty() {
        debug!(winner = %winner.agent_id, "no supplementary perspectives, skipping refinement");
        return Ok(None);
    }

    let prompt = refinement_prompt(query, winner, &perspectives, judge_feedback);
    let started = Instant::now();

    let result = tokio::select! {
        _ = cancel.cancelled() => return Err(DecideError::Cancelled),
        result = timeout(
            deadline,
            backend.generate(&prompt, REFINER_SYSTEM_PROMPT, REFINER_TEMPERATURE),
        ) => result,
    };
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(Ok(text)) => {
            debug!(winner = %winner.agent_id, elapsed_ms, "refinement complete");
            Ok(Some(winner.refined(text, elapsed_ms)))
        }
        Ok(Err(err)) => {
            warn!(winner = %winner.agent_id, error = %err, "refinement failed, keeping original");
            Ok(None)
        }
        Err(_) => {
            warn!(winner = %winner.agent_id, ?deadline, "refinement timed out, keeping original");
            Ok(None)
        }
    }
}

fn refinement_prompt(
    query: &str,
    winner: &AgentResponse,
    perspectives: &[&AgentResponse],
    judge_feedback: &str,
) -> String {
    let mut sections = vec![
        format!("Original question:\n{query}"),
        format!(
            "Chosen answer (from the {} advisor):\n{}",
            winner.agent_type, winner.text
        ),
    ];

    for perspective in perspectives {
        sections.push(format!(
            "Supplementary perspective ({}):\n{}",
            perspective.agent_type, perspective.text
        ));
    }

    if !judge_feedback.is_empty() {
        sections.push(format!("Judge feedback to address:\n{judge_feedback}"));
    }

    sections.push(
        "Rewrite the chosen answer. Rules:\n\
         1. Preserve the chosen answer's conclusions and safety posture.\n\
         2. Integrate useful material from the supplementary perspectives.\n\
         3. Never adopt content that is less safe than the chosen answer's original stance.\n\
         Return only the rewritten answer."
            .to_string(),
    );

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::generation::BackendError;
    use async_trait::async_trait;

    struct EchoPrompt;

    #[async_trait]
    impl GenerationBackend for EchoPrompt {
        async fn generate(
            &self,
            query: &str,
            _system_prompt: &str,
            _temperature: f32,
        ) -> Result<String, BackendError> {
            Ok(query.to_string())
        }
    }

    struct Broken;

    #[async_trait]
    impl GenerationBackend for Broken {
        async fn generate(
            &self,
            _query: &str,
            _system_prompt: &str,
            _temperature: f32,
        ) -> Result<String, BackendError> {
            Err(BackendError::ConnectionError("refused".to_string()))
        }
    }

    fn winner() -> AgentResponse {
        AgentResponse::new("agent_a", "Analytical", "the chosen answer", 0.3, 10)
    }

    fn other() -> AgentResponse {
        AgentResponse::new("agent_b", "Creative", "another angle", 0.9, 10)
    }

    #[tokio::test]
    async fn test_refined_response_is_tagged_as_derived() {
        let refined = refine(
            &EchoPrompt,
            "q",
            &winner(),
            &[winner(), other()],
            "",
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(refined.agent_id, "agent_a_refined");
        assert_eq!(refined.agent_type, "Analytical (Refined)");
        assert!(refined.text.contains("another angle"));
    }

    #[tokio::test]
    async fn test_feedback_reaches_the_prompt() {
        let refined = refine(
            &EchoPrompt,
            "q",
            &winner(),
            &[winner(), other()],
            "Factuality Judge: missing sources",
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(refined.text.contains("missing sources"));
    }

    #[tokio::test]
    async fn test_lone_winner_skips_refinement() {
        let refined = refine(
            &EchoPrompt,
            "q",
            &winner(),
            &[winner()],
            "",
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(refined.is_none());
    }

    #[tokio::test]
    async fn test_error_responses_are_not_perspectives() {
        let failed = AgentResponse::failure("agent_b", "Creative", 0.9, "down", 5);
        let refined = refine(
            &EchoPrompt,
            "q",
            &winner(),
            &[winner(), failed],
            "",
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(refined.is_none());
    }

    #[tokio::test]
    async fn test_backend_failure_degrades_to_none() {
        let refined = refine(
            &Broken,
            "q",
            &winner(),
            &[winner(), other()],
            "",
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(refined.is_none());
    }
}
