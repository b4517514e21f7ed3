// src/providers/mock_text.rs
// Deterministic text provider for development, demos and tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::logging::{log_completion, log_usage};
use super::{AiProvider, ProviderCapabilities, ProviderChunk, ProviderStream, StreamingCapabilities, word_count};
use crate::error::ProviderError;
use crate::types::{ActionRequest, Artifact, ProviderResult, ProviderUsage};

/// Default word limit for generated text
const DEFAULT_MAX_WORDS: usize = 120;

/// Text provider that transforms the request's text locally.
///
/// Output is a marker such as `[shortened]` followed by the source words,
/// truncated so the whole output stays within the word limit.
pub struct MockTextProvider {
    id: String,
    max_words: usize,
    latency: Duration,
    delta_delay: Duration,
    streaming: bool,
    billable: bool,
    failure: Option<String>,
    fail_after_deltas: Option<usize>,
    calls: AtomicUsize,
    stream_calls: AtomicUsize,
}

impl MockTextProvider {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            max_words: DEFAULT_MAX_WORDS,
            latency: Duration::ZERO,
            delta_delay: Duration::ZERO,
            streaming: true,
            billable: false,
            failure: None,
            fail_after_deltas: None,
            calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = max_words.max(1);
        self
    }

    /// Simulated latency of a blocking call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Pause between streamed words
    pub fn with_delta_delay(mut self, delay: Duration) -> Self {
        self.delta_delay = delay;
        self
    }

    pub fn billable(mut self, billable: bool) -> Self {
        self.billable = billable;
        self
    }

    pub fn without_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }

    /// Every call fails with `message`
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Streams fail after emitting `count` deltas
    pub fn failing_after_deltas(mut self, count: usize) -> Self {
        self.fail_after_deltas = Some(count);
        self
    }

    /// Number of blocking calls received
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of streams opened
    pub fn stream_call_count(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    fn word_limit(&self, request: &ActionRequest) -> usize {
        request
            .constraint_u64("max_words")
            .map(|n| (n as usize).min(self.max_words))
            .unwrap_or(self.max_words)
            .max(1)
    }

    fn source_text<'a>(request: &'a ActionRequest) -> &'a str {
        let ctx = request.context();
        if ctx.original_text.trim().is_empty() {
            &ctx.surrounding_text
        } else {
            &ctx.original_text
        }
    }

    fn marker(request: &ActionRequest) -> String {
        let ctx = request.context();
        let instruction = ctx.instruction.as_deref().unwrap_or_default().to_lowercase();

        if instruction.contains("shorten") {
            return "[shortened]".to_string();
        }
        if let Some(language) = &ctx.language {
            return format!("[{}]", language);
        }
        let marker = match request.action_id() {
            "summarize-section" => "[summary]",
            "continue-writing" => "[continued]",
            _ if instruction.contains("expand") => "[expanded]",
            _ => "[rewritten]",
        };
        marker.to_string()
    }

    /// Text this provider produces for `request`
    pub fn transform(&self, request: &ActionRequest) -> String {
        let marker = Self::marker(request);
        let limit = self.word_limit(request);
        let body: Vec<&str> = Self::source_text(request)
            .split_whitespace()
            .take(limit.saturating_sub(1))
            .collect();

        if body.is_empty() {
            marker
        } else {
            format!("{} {}", marker, body.join(" "))
        }
    }

    fn input_tokens(request: &ActionRequest) -> u32 {
        let instruction = request.context().instruction.as_deref().unwrap_or_default();
        (word_count(Self::source_text(request)) + word_count(instruction)) as u32
    }
}

#[async_trait]
impl AiProvider for MockTextProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "Mock text provider"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            text: true,
            image: false,
            streaming: StreamingCapabilities {
                text: self.streaming,
                image: false,
            },
            billable: self.billable,
        }
    }

    async fn execute(
        &self,
        request: &ActionRequest,
        cancel: CancellationToken,
    ) -> Result<ProviderResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let start = Instant::now();

        if let Some(message) = &self.failure {
            return Err(ProviderError::new(&self.id, message.clone()));
        }

        if !self.latency.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(ProviderError::new(&self.id, "request cancelled"));
                }
                _ = tokio::time::sleep(self.latency) => {}
            }
        }

        let text = self.transform(request);
        let usage = ProviderUsage::new(
            Self::input_tokens(request),
            word_count(&text) as u32,
            start.elapsed().as_millis() as u64,
        );
        log_usage(request.request_id(), &self.id, &usage);
        log_completion(
            request.request_id(),
            &self.id,
            usage.latency_ms,
            1,
            text.len(),
        );

        Ok(ProviderResult::new(request.request_id())
            .with_artifact(Artifact::text(text))
            .with_usage(usage)
            .with_metadata("model", "mock-text-1"))
    }

    async fn stream(
        &self,
        request: &ActionRequest,
        cancel: CancellationToken,
    ) -> Result<ProviderStream, ProviderError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);

        if !self.streaming {
            return Err(ProviderError::new(&self.id, "streaming is not supported"));
        }
        if let Some(message) = &self.failure {
            return Err(ProviderError::new(&self.id, message.clone()));
        }

        let text = self.transform(request);
        let pieces: Vec<String> = text
            .split(' ')
            .enumerate()
            .map(|(i, word)| if i == 0 { word.to_string() } else { format!(" {}", word) })
            .collect();
        let input_tokens = Self::input_tokens(request);
        let output_tokens = word_count(&text) as u32;
        let provider_id = self.id.clone();
        let delay = self.delta_delay;
        let fail_after = self.fail_after_deltas;

        debug!(
            request_id = %request.request_id(),
            provider = %provider_id,
            deltas = pieces.len(),
            "Opening mock text stream"
        );

        let stream = async_stream::stream! {
            let started = Instant::now();
            for (index, piece) in pieces.into_iter().enumerate() {
                if fail_after == Some(index) {
                    yield Err(ProviderError::new(&provider_id, "simulated stream failure"));
                    return;
                }
                if !delay.is_zero() {
                    let cancelled = tokio::select! {
                        _ = cancel.cancelled() => true,
                        _ = tokio::time::sleep(delay) => false,
                    };
                    if cancelled {
                        yield Err(ProviderError::new(&provider_id, "stream cancelled"));
                        return;
                    }
                }
                yield Ok(ProviderChunk::Text(piece));
            }
            yield Ok(ProviderChunk::Usage(ProviderUsage::new(
                input_tokens,
                output_tokens,
                started.elapsed().as_millis() as u64,
            )));
        };

        Ok(Box::pin(stream))
    }
}
