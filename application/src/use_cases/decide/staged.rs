//! Staged (progressive) execution
//!
//! Runs the same pipeline as `decide()` but publishes stage events over
//! a channel: the gate outcome, periodic snapshots of the in-flight
//! generation buffers, the completed evaluation matrix, and the final
//! decision. The orchestrator owns the mutable buffers; consumers only
//! ever receive cloned snapshots.

use super::{DecideError, DecideInput, RunCouncilUseCase, new_decision_id};
use crate::ports::generation::{BackendError, GenerationBackend, StreamEvent};
use council_domain::{
    AgentIdentity, AgentResponse, GENERATION_ERROR_PREFIX, StageEvent, Verdict,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

/// Shared per-agent generation state, polled by the snapshot loop
#[derive(Default)]
struct AgentBuffer {
    text: String,
    elapsed_ms: u64,
    done: bool,
}

/// Drive one staged run to completion.
///
/// A dropped receiver or a cancelled token abandons the run silently;
/// terminal events (`Blocked`, `Final`) are audited before emission.
pub(super) async fn run(
    pipeline: RunCouncilUseCase,
    input: DecideInput,
    tx: mpsc::Sender<StageEvent>,
) {
    let started = Instant::now();
    let decision_id = new_decision_id();

    if tx.send(StageEvent::Start).await.is_err() {
        return;
    }

    if let Some(blocked) = pipeline.gate_check(&decision_id, &input.query) {
        let verdict = Verdict::Blocked(blocked);
        pipeline.record_audit(&verdict).await;
        if let Verdict::Blocked(blocked) = verdict {
            let _ = tx.send(StageEvent::Blocked(blocked)).await;
        }
        return;
    }

    let responses = match generate_streaming(&pipeline, &input, &tx).await {
        Ok(responses) => responses,
        Err(DecideError::Cancelled) => return,
    };

    let evaluations = match pipeline.evaluate(&input.query, &responses).await {
        Ok(evaluations) => evaluations,
        Err(DecideError::Cancelled) => return,
    };
    let judges_event = StageEvent::Judges {
        responses: responses.clone(),
        evaluations: evaluations.clone(),
    };
    if tx.send(judges_event).await.is_err() {
        return;
    }

    let decision = match pipeline
        .finish(decision_id, input.query, responses, evaluations, started)
        .await
    {
        Ok(decision) => decision,
        Err(DecideError::Cancelled) => return,
    };
    let verdict = Verdict::Decided(Box::new(decision));
    pipeline.record_audit(&verdict).await;
    if let Verdict::Decided(decision) = verdict {
        let _ = tx.send(StageEvent::Final(decision)).await;
    }
}

/// Streaming generation fan-out with periodic snapshot publication.
///
/// The final snapshot (all buffers done) doubles as the materialized
/// response list handed to the evaluation phase, so consumers and the
/// pipeline see the identical text.
async fn generate_streaming(
    pipeline: &RunCouncilUseCase,
    input: &DecideInput,
    tx: &mpsc::Sender<StageEvent>,
) -> Result<Vec<AgentResponse>, DecideError> {
    let agents = &pipeline.config.agents;
    let buffers: Vec<Arc<Mutex<AgentBuffer>>> = agents
        .iter()
        .map(|_| Arc::new(Mutex::new(AgentBuffer::default())))
        .collect();

    let mut join_set = JoinSet::new();
    for (agent, buffer) in agents.iter().zip(&buffers) {
        let backend = Arc::clone(&pipeline.generation);
        let agent = agent.clone();
        let buffer = Arc::clone(buffer);
        let query = input.query.clone();
        let word_limit = input.word_limit;
        let deadline = pipeline.config.backend_timeout;
        join_set.spawn(async move {
            stream_one(&backend, &agent, &query, word_limit, deadline, &buffer).await;
        });
    }

    loop {
        tokio::select! {
            _ = pipeline.cancel.cancelled() => {
                join_set.abort_all();
                return Err(DecideError::Cancelled);
            }
            _ = tokio::time::sleep(pipeline.config.stream_poll_interval) => {}
        }

        let mut all_done = true;
        let mut snapshot = Vec::with_capacity(agents.len());
        for (agent, buffer) in agents.iter().zip(&buffers) {
            let state = buffer.lock().await;
            if !state.done {
                all_done = false;
            }
            snapshot.push(AgentResponse::new(
                &agent.id,
                &agent.display_type,
                state.text.clone(),
                agent.temperature,
                state.elapsed_ms,
            ));
        }

        if tx.send(StageEvent::Agents(snapshot.clone())).await.is_err() {
            join_set.abort_all();
            return Err(DecideError::Cancelled);
        }
        if all_done {
            while join_set.join_next().await.is_some() {}
            return Ok(snapshot);
        }
    }
}

/// Stream one agent's generation into its shared buffer
async fn stream_one(
    backend: &Arc<dyn GenerationBackend>,
    agent: &AgentIdentity,
    query: &str,
    word_limit: Option<usize>,
    deadline: Duration,
    buffer: &Arc<Mutex<AgentBuffer>>,
) {
    let started = Instant::now();
    let outcome = tokio::time::timeout(
        deadline,
        consume_stream(backend, agent, query, word_limit, buffer),
    )
    .await;

    let mut state = buffer.lock().await;
    state.elapsed_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => state.text = format!("{GENERATION_ERROR_PREFIX} {err}]"),
        Err(_) => state.text = format!("{GENERATION_ERROR_PREFIX} {}]", BackendError::Timeout),
    }
    state.done = true;
}

async fn consume_stream(
    backend: &Arc<dyn GenerationBackend>,
    agent: &AgentIdentity,
    query: &str,
    word_limit: Option<usize>,
    buffer: &Arc<Mutex<AgentBuffer>>,
) -> Result<(), BackendError> {
    let mut handle = backend
        .generate_stream(query, &agent.role_prompt, agent.temperature, word_limit)
        .await?;

    while let Some(event) = handle.receiver.recv().await {
        match event {
            StreamEvent::Delta(chunk) => buffer.lock().await.text.push_str(&chunk),
            StreamEvent::Completed(text) => {
                let mut state = buffer.lock().await;
                if state.text.is_empty() {
                    state.text = text;
                }
            }
            StreamEvent::Error(message) => return Err(BackendError::RequestFailed(message)),
        }
    }
    Ok(())
}
