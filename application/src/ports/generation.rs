//! Generation backend port
//!
//! Defines the interface for the text-generation backends the agent
//! panel and synthesizer call.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors a backend call can produce.
///
/// These never abort the pipeline: the orchestrator captures them as
/// sentinel values (error-marker response text, neutral scores) so every
/// fan-out batch completes with one entry per task.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Unusable response: {0}")]
    UnusableResponse(String),

    #[error("Timeout")]
    Timeout,
}

/// An event in a streaming generation response
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A text chunk from the backend
    Delta(String),
    /// The complete response text (signals stream end)
    Completed(String),
    /// An error that occurred mid-stream
    Error(String),
}

/// Handle for receiving streaming events from a generation call.
///
/// Wraps an `mpsc::Receiver<StreamEvent>`. The stream is finite and not
/// restartable.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Consume the stream and collect all text into a single string.
    pub async fn collect_text(mut self) -> Result<String, BackendError> {
        let mut full_text = String::new();
        while let Some(event) = self.receiver.recv().await {
            match event {
                StreamEvent::Delta(chunk) => full_text.push_str(&chunk),
                StreamEvent::Completed(text) => {
                    if full_text.is_empty() {
                        return Ok(text);
                    }
                    return Ok(full_text);
                }
                StreamEvent::Error(e) => {
                    return Err(BackendError::RequestFailed(e));
                }
            }
        }
        // Channel closed without Completed, return what we have
        Ok(full_text)
    }
}

/// Backend for generating candidate answers
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a complete response for a query under a system role
    async fn generate(
        &self,
        query: &str,
        system_prompt: &str,
        temperature: f32,
    ) -> Result<String, BackendError>;

    /// Generate a streaming response.
    ///
    /// Default implementation calls `generate()` and wraps the result in
    /// a single `Completed` event, so non-streaming backends work
    /// without changes. `word_limit` is an advisory cap forwarded to the
    /// backend when supported.
    async fn generate_stream(
        &self,
        query: &str,
        system_prompt: &str,
        temperature: f32,
        _word_limit: Option<usize>,
    ) -> Result<StreamHandle, BackendError> {
        let result = self.generate(query, system_prompt, temperature).await?;
        let (tx, rx) = mpsc::channel(1);
        // If the receiver is dropped, that's fine
        let _ = tx.send(StreamEvent::Completed(result)).await;
        Ok(StreamHandle::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedBackend;

    #[async_trait]
    impl GenerationBackend for FixedBackend {
        async fn generate(
            &self,
            _query: &str,
            _system_prompt: &str,
            _temperature: f32,
        ) -> Result<String, BackendError> {
            Ok("fixed answer".to_string())
        }
    }

    #[tokio::test]
    async fn test_default_stream_wraps_generate() {
        let handle = FixedBackend
            .generate_stream("q", "sys", 0.5, None)
            .await
            .unwrap();
        assert_eq!(handle.collect_text().await.unwrap(), "fixed answer");
    }

    #[tokio::test]
    async fn test_collect_text_concatenates_deltas() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(StreamEvent::Delta("one ".to_string())).await.unwrap();
        tx.send(StreamEvent::Delta("two".to_string())).await.unwrap();
        drop(tx);

        let text = StreamHandle::new(rx).collect_text().await.unwrap();
        assert_eq!(text, "one two");
    }

    #[tokio::test]
    async fn test_collect_text_surfaces_stream_error() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(StreamEvent::Error("boom".to_string())).await.unwrap();
        drop(tx);

        assert!(StreamHandle::new(rx).collect_text().await.is_err());
    }
}
