// src/providers/mock_image.rs
// Placeholder image provider: renders an SVG card for the prompt

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::logging::log_usage;
use super::{AiProvider, ProviderCapabilities, ProviderChunk, ProviderStream, StreamingCapabilities, word_count};
use crate::error::ProviderError;
use crate::types::{ActionRequest, Artifact, ProviderResult, ProviderUsage};

const DEFAULT_WIDTH: u32 = 1024;
const DEFAULT_HEIGHT: u32 = 1536;

pub struct MockImageProvider {
    id: String,
    width: u32,
    height: u32,
    streaming: bool,
    billable: bool,
    calls: AtomicUsize,
}

impl MockImageProvider {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            streaming: false,
            billable: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    pub fn billable(mut self, billable: bool) -> Self {
        self.billable = billable;
        self
    }

    /// Number of blocking and streaming calls received
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn prompt(request: &ActionRequest) -> String {
        request
            .input_str("prompt")
            .map(str::to_string)
            .or_else(|| request.context().instruction.clone())
            .unwrap_or_else(|| request.context().document_title.clone())
    }

    fn render(&self, prompt: &str) -> Artifact {
        let hue = prompt.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32)) % 360;
        let svg = format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}">"#,
                r#"<rect width="100%" height="100%" fill="hsl({hue},45%,35%)"/>"#,
                r#"<text x="50%" y="50%" fill="white" font-size="48" text-anchor="middle">{title}</text>"#,
                "</svg>"
            ),
            w = self.width,
            h = self.height,
            hue = hue,
            title = escape_xml(prompt),
        );

        Artifact::image("image/svg+xml", svg.into_bytes())
            .with_metadata("prompt", prompt)
            .with_metadata("width", self.width.to_string())
            .with_metadata("height", self.height.to_string())
    }

    fn generate(&self, request: &ActionRequest) -> (Artifact, ProviderUsage) {
        let start = Instant::now();
        let prompt = Self::prompt(request);
        let artifact = self.render(&prompt);
        let usage = ProviderUsage::new(
            word_count(&prompt) as u32,
            0,
            start.elapsed().as_millis() as u64,
        );
        log_usage(request.request_id(), &self.id, &usage);
        (artifact, usage)
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[async_trait]
impl AiProvider for MockImageProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "Mock image provider"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            text: false,
            image: true,
            streaming: StreamingCapabilities {
                text: false,
                image: self.streaming,
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
        if cancel.is_cancelled() {
            return Err(ProviderError::new(&self.id, "request cancelled"));
        }

        let (artifact, usage) = self.generate(request);
        Ok(ProviderResult::new(request.request_id())
            .with_artifact(artifact)
            .with_usage(usage)
            .with_metadata("model", "mock-image-1"))
    }

    async fn stream(
        &self,
        request: &ActionRequest,
        _cancel: CancellationToken,
    ) -> Result<ProviderStream, ProviderError> {
        if !self.streaming {
            return Err(ProviderError::new(&self.id, "streaming is not supported"));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (artifact, usage) = self.generate(request);
        let chunks = vec![Ok(ProviderChunk::Image(artifact)), Ok(ProviderChunk::Usage(usage))];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}
