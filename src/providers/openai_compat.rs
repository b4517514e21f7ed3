// src/providers/openai_compat.rs
// OpenAI-compatible chat completions provider (blocking + SSE streaming)

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use super::logging::{log_completion, log_usage};
use super::prompt::PromptBuilder;
use super::{AiProvider, ProviderCapabilities, ProviderChunk, ProviderStream, StreamingCapabilities};
use crate::config::OpenAiSettings;
use crate::error::ProviderError;
use crate::types::{ActionRequest, Artifact, ProviderResult, ProviderUsage};

const REQUEST_TIMEOUT_SECS: u64 = 120;
const CONNECT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

/// Asks the server for a final usage chunk on streamed responses
#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
    delta: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Text provider speaking the OpenAI chat completions protocol.
///
/// Unavailable (and skipped by routing) when no API key is configured.
pub struct OpenAiCompatProvider {
    id: String,
    settings: OpenAiSettings,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(id: impl Into<String>, settings: OpenAiSettings) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            id: id.into(),
            settings,
            client,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    fn body<'a>(&'a self, request: &ActionRequest, stream: bool) -> ChatRequest<'a> {
        let prompt = PromptBuilder::new(request);
        ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt.system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.user_prompt(),
                },
            ],
            stream,
            // Rough word-to-token headroom
            max_tokens: request
                .constraint_u64("max_words")
                .map(|words| (words as u32).saturating_mul(2).max(16)),
            stream_options: stream.then_some(StreamOptions { include_usage: true }),
        }
    }

    fn request_builder(&self, request: &ActionRequest, stream: bool) -> Result<reqwest::RequestBuilder, ProviderError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::new(&self.id, "no API key configured"))?;

        Ok(self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&self.body(request, stream)))
    }

    async fn send(&self, request: &ActionRequest) -> Result<ChatResponse, ProviderError> {
        let response = self
            .request_builder(request, false)?
            .send()
            .await
            .map_err(|e| ProviderError::new(&self.id, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(provider = %self.id, status = %status, "Chat completion failed");
            return Err(ProviderError::new(
                &self.id,
                format!("API error {}: {}", status, body),
            ));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ProviderError::new(&self.id, format!("invalid response body: {}", e)))
    }
}

#[async_trait]
impl AiProvider for OpenAiCompatProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "OpenAI-compatible chat"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            text: true,
            image: false,
            streaming: StreamingCapabilities {
                text: true,
                image: false,
            },
            billable: true,
        }
    }

    fn is_available(&self) -> bool {
        self.settings.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    #[instrument(skip(self, request, cancel), fields(request_id = %request.request_id(), model = %self.settings.model))]
    async fn execute(
        &self,
        request: &ActionRequest,
        cancel: CancellationToken,
    ) -> Result<ProviderResult, ProviderError> {
        let start = Instant::now();

        let response = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(ProviderError::new(&self.id, "request cancelled"));
            }
            response = self.send(request) => response?,
        };

        let content: String = response
            .choices
            .into_iter()
            .filter_map(|c| c.message.and_then(|m| m.content))
            .collect();
        if content.trim().is_empty() {
            return Err(ProviderError::new(&self.id, "response contained no text"));
        }

        let latency_ms = start.elapsed().as_millis() as u64;
        let usage = response
            .usage
            .map(|u| ProviderUsage::new(u.prompt_tokens, u.completion_tokens, latency_ms))
            .unwrap_or(ProviderUsage::new(0, 0, latency_ms));
        log_usage(request.request_id(), &self.id, &usage);
        log_completion(request.request_id(), &self.id, latency_ms, 1, content.len());

        Ok(ProviderResult::new(request.request_id())
            .with_artifact(Artifact::text(content.trim().to_string()))
            .with_usage(usage)
            .with_metadata("model", self.settings.model.clone()))
    }

    async fn stream(
        &self,
        request: &ActionRequest,
        cancel: CancellationToken,
    ) -> Result<ProviderStream, ProviderError> {
        let builder = self.request_builder(request, true)?;
        let mut es = EventSource::new(builder)
            .map_err(|e| ProviderError::new(&self.id, format!("failed to open event stream: {}", e)))?;

        let provider_id = self.id.clone();
        let request_id = request.request_id().to_string();

        let stream = async_stream::stream! {
            let start = Instant::now();
            let mut usage: Option<Usage> = None;

            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => None,
                    event = es.next() => event,
                };
                let Some(event) = next else {
                    if cancel.is_cancelled() {
                        yield Err(ProviderError::new(&provider_id, "stream cancelled"));
                    }
                    break;
                };

                match event {
                    Ok(Event::Open) => {
                        debug!(request_id = %request_id, provider = %provider_id, "Event stream opened");
                    }
                    Ok(Event::Message(msg)) => {
                        if msg.data == "[DONE]" {
                            break;
                        }
                        let chunk: ChatResponse = match serde_json::from_str(&msg.data) {
                            Ok(c) => c,
                            Err(e) => {
                                warn!(request_id = %request_id, error = %e, "Skipping unparseable stream chunk");
                                continue;
                            }
                        };
                        if chunk.usage.is_some() {
                            usage = chunk.usage;
                        }
                        for choice in chunk.choices {
                            if let Some(content) = choice.delta.and_then(|d| d.content) {
                                if !content.is_empty() {
                                    yield Ok(ProviderChunk::Text(content));
                                }
                            }
                        }
                    }
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(e) => {
                        yield Err(ProviderError::new(&provider_id, format!("stream error: {}", e)));
                        break;
                    }
                }
            }
            es.close();

            let latency_ms = start.elapsed().as_millis() as u64;
            if let Some(u) = usage {
                yield Ok(ProviderChunk::Usage(ProviderUsage::new(u.prompt_tokens, u.completion_tokens, latency_ms)));
            }
        };

        Ok(Box::pin(stream))
    }
}
