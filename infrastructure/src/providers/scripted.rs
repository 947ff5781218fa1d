//! Offline backends
//!
//! [`MockGeneration`] and [`MockEvaluation`] power `--mock` runs with no
//! network at all; the `Scripted*` variants let tests pin exact texts
//! and scores per call.

use async_trait::async_trait;
use council_application::{
    BackendError, EvaluationBackend, GenerationBackend, StreamEvent, StreamHandle,
    StructuredEvaluation,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;

/// Deterministic offline generation.
///
/// The answer text is derived from the system prompt and query, so
/// different agents produce different drafts and repeated runs produce
/// identical ones.
#[derive(Default)]
pub struct MockGeneration;

fn mock_answer(query: &str, system_prompt: &str) -> String {
    let head: String = query.chars().take(40).collect();
    if system_prompt.to_lowercase().contains("creative") {
        format!("What if we approached '{head}' from a completely different angle?")
    } else if system_prompt.to_lowercase().contains("pragmat") {
        format!("From an operational perspective on '{head}', execution comes first.")
    } else {
        format!("Based on the available evidence regarding '{head}', the data suggests proceeding.")
    }
}

#[async_trait]
impl GenerationBackend for MockGeneration {
    async fn generate(
        &self,
        query: &str,
        system_prompt: &str,
        _temperature: f32,
    ) -> Result<String, BackendError> {
        Ok(mock_answer(query, system_prompt))
    }

    /// Streams the mock answer word by word with a short pause, so the
    /// staged mode has something progressive to show.
    async fn generate_stream(
        &self,
        query: &str,
        system_prompt: &str,
        _temperature: f32,
        word_limit: Option<usize>,
    ) -> Result<StreamHandle, BackendError> {
        let mut text = mock_answer(query, system_prompt);
        if let Some(limit) = word_limit {
            let words: Vec<&str> = text.split_whitespace().take(limit).collect();
            text = words.join(" ");
        }

        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            for word in text.split_inclusive(' ') {
                if tx.send(StreamEvent::Delta(word.to_string())).await.is_err() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
        });
        Ok(StreamHandle::new(rx))
    }
}

/// Deterministic offline evaluation.
///
/// Scores every dimension in the 6-8 band from a stable hash of the
/// candidate text; error-marker drafts score low and get flagged.
#[derive(Default)]
pub struct MockEvaluation;

fn stable_hash(text: &str) -> u64 {
    // FNV-1a, stable across runs unlike the std hasher
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in text.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[async_trait]
impl EvaluationBackend for MockEvaluation {
    async fn evaluate(
        &self,
        _query: &str,
        candidate: &str,
        rubric_prompt: &str,
    ) -> Result<StructuredEvaluation, BackendError> {
        if candidate.starts_with("[Error") {
            return Ok(StructuredEvaluation {
                scores: dimension_names(rubric_prompt)
                    .map(|name| (name, json!(2.0)))
                    .collect(),
                reasoning: "The draft contains an error marker instead of an answer.".to_string(),
                issues: vec!["Response generation failed".to_string()],
            });
        }

        let base = 6.0 + (stable_hash(candidate) % 3) as f64;
        Ok(StructuredEvaluation {
            scores: dimension_names(rubric_prompt)
                .enumerate()
                .map(|(offset, name)| (name, json!(base + (offset % 2) as f64 * 0.5)))
                .collect(),
            reasoning: "Deterministic offline evaluation.".to_string(),
            issues: vec![],
        })
    }
}

/// Recover dimension names from the rubric prompt text
/// ("- NAME (NN%): description" lines).
fn dimension_names(rubric_prompt: &str) -> impl Iterator<Item = String> + '_ {
    rubric_prompt.lines().filter_map(|line| {
        let line = line.strip_prefix("- ")?;
        let name = line.split(' ').next()?;
        Some(name.to_lowercase())
    })
}

/// Generation backend answering from an explicit script.
///
/// The first entry whose needle occurs in the system prompt wins;
/// `fallback` covers everything else (synthesis calls in particular).
pub struct ScriptedGeneration {
    pub by_system_prompt: Vec<(String, String)>,
    pub fallback: String,
}

#[async_trait]
impl GenerationBackend for ScriptedGeneration {
    async fn generate(
        &self,
        _query: &str,
        system_prompt: &str,
        _temperature: f32,
    ) -> Result<String, BackendError> {
        for (needle, answer) in &self.by_system_prompt {
            if system_prompt.contains(needle.as_str()) {
                return Ok(answer.clone());
            }
        }
        Ok(self.fallback.clone())
    }
}

/// Evaluation backend scoring from an explicit script.
///
/// Scores the single dimension `quality`; candidates not covered by the
/// script fail, exercising the neutral-fallback path.
pub struct ScriptedEvaluation {
    pub by_candidate: Vec<(String, f64)>,
    pub issues: Vec<String>,
}

#[async_trait]
impl EvaluationBackend for ScriptedEvaluation {
    async fn evaluate(
        &self,
        _query: &str,
        candidate: &str,
        _rubric_prompt: &str,
    ) -> Result<StructuredEvaluation, BackendError> {
        for (needle, score) in &self.by_candidate {
            if candidate.contains(needle.as_str()) {
                return Ok(StructuredEvaluation {
                    scores: BTreeMap::from([("quality".to_string(), json!(score))]),
                    reasoning: "scripted".to_string(),
                    issues: self.issues.clone(),
                });
            }
        }
        Err(BackendError::UnusableResponse(
            "candidate not in script".to_string(),
        ))
    }
}
