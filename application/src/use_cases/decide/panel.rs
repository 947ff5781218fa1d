//! Generation fan-out
//!
//! Runs one generation task per configured agent concurrently and joins
//! them all before returning. Results are slotted by panel-declaration
//! order, never completion order, so downstream selection is
//! deterministic given deterministic backend outputs.

use super::DecideError;
use crate::ports::generation::{BackendError, GenerationBackend};
use crate::ports::progress::{CouncilPhase, ProgressNotifier};
use council_domain::{AgentIdentity, AgentResponse};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Generate one response per configured agent.
///
/// Wait-for-all: the batch completes only when every task has produced a
/// result. A failed or timed-out call is captured as an error-marker
/// response, so the output always has exactly one entry per agent.
pub(super) async fn generate_all(
    agents: &[AgentIdentity],
    backend: &Arc<dyn GenerationBackend>,
    query: &str,
    word_limit: Option<usize>,
    timeout: Duration,
    cancel: &CancellationToken,
    progress: &Arc<dyn ProgressNotifier>,
) -> Result<Vec<AgentResponse>, DecideError> {
    let mut join_set = JoinSet::new();

    for (index, agent) in agents.iter().enumerate() {
        let backend = Arc::clone(backend);
        let agent = agent.clone();
        let query = query.to_string();
        join_set.spawn(async move {
            (index, generate_one(&backend, &agent, &query, word_limit, timeout).await)
        });
    }

    let mut slots: Vec<Option<AgentResponse>> = (0..agents.len()).map(|_| None).collect();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                join_set.abort_all();
                return Err(DecideError::Cancelled);
            }
            joined = join_set.join_next() => match joined {
                Some(Ok((index, response))) => {
                    progress.on_task_complete(
                        &CouncilPhase::Generation,
                        &response.agent_id,
                        !response.is_error(),
                    );
                    slots[index] = Some(response);
                }
                Some(Err(join_err)) => {
                    warn!(error = %join_err, "generation task failed to join");
                }
                None => break,
            }
        }
    }

    // Tasks that panicked leave their slot empty; fill with a marker
    let responses = slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                let agent = &agents[index];
                AgentResponse::failure(
                    &agent.id,
                    &agent.display_type,
                    agent.temperature,
                    "task aborted",
                    0,
                )
            })
        })
        .collect();
    Ok(responses)
}

async fn generate_one(
    backend: &Arc<dyn GenerationBackend>,
    agent: &AgentIdentity,
    query: &str,
    word_limit: Option<usize>,
    timeout: Duration,
) -> AgentResponse {
    let system_prompt = match word_limit {
        Some(limit) => format!(
            "{}\n\nKeep your answer under {limit} words.",
            agent.role_prompt
        ),
        None => agent.role_prompt.clone(),
    };

    let started = Instant::now();
    let result = tokio::time::timeout(
        timeout,
        backend.generate(query, &system_prompt, agent.temperature),
    )
    .await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(Ok(text)) => {
            debug!(agent = %agent.id, elapsed_ms, "generation complete");
            AgentResponse::new(&agent.id, &agent.display_type, text, agent.temperature, elapsed_ms)
        }
        Ok(Err(err)) => {
            warn!(agent = %agent.id, error = %err, "generation failed");
            AgentResponse::failure(&agent.id, &agent.display_type, agent.temperature, err, elapsed_ms)
        }
        Err(_) => {
            warn!(agent = %agent.id, ?timeout, "generation timed out");
            AgentResponse::failure(
                &agent.id,
                &agent.display_type,
                agent.temperature,
                BackendError::Timeout,
                elapsed_ms,
            )
        }
    }
}
