// src/streaming.rs
// Streaming sessions: ordered events plus a proposal once the stream ends

use futures::{Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::actions::{ActionInput, AiAction};
use crate::error::{AiError, ProviderError, Result};
use crate::mapping::MappedOutput;
use crate::pipeline::ExecutionPipeline;
use crate::providers::ProviderChunk;
use crate::types::{Proposal, ProviderUsage, StreamEvent, StreamFailure};

/// Single-pass stream of session events. Ends after the terminal event.
pub struct EventStream {
    inner: UnboundedReceiverStream<StreamEvent>,
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Resolves to the accumulated proposal, or `None` if the session failed.
/// Always resolves after the terminal event has been published.
pub struct ProposalCompletion {
    rx: oneshot::Receiver<Option<Proposal>>,
}

impl Future for ProposalCompletion {
    type Output = Option<Proposal>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|r| r.ok().flatten())
    }
}

/// Handle to one streaming execution
pub struct StreamingSession {
    pub session_id: String,
    pub events: EventStream,
    pub completion: ProposalCompletion,
}

impl StreamingSession {
    /// Drain every event, then wait for the proposal
    pub async fn collect(self) -> (Vec<StreamEvent>, Option<Proposal>) {
        let events = self.events.collect().await;
        let proposal = self.completion.await;
        (events, proposal)
    }
}

/// Sending half of a session
struct SessionSink {
    session_id: String,
    events: mpsc::UnboundedSender<StreamEvent>,
    done: oneshot::Sender<Option<Proposal>>,
}

impl SessionSink {
    fn open() -> (Self, StreamingSession) {
        let session_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();
        (
            Self {
                session_id: session_id.clone(),
                events: tx,
                done: done_tx,
            },
            StreamingSession {
                session_id,
                events: EventStream {
                    inner: UnboundedReceiverStream::new(rx),
                },
                completion: ProposalCompletion { rx: done_rx },
            },
        )
    }

    fn emit(&self, event: StreamEvent) {
        // A consumer that went away must not stop accumulation
        let _ = self.events.send(event);
    }

    /// Publish the terminal event, then resolve the completion
    fn finish(self, outcome: Result<Proposal>) {
        match outcome {
            Ok(proposal) => {
                self.emit(StreamEvent::Completed);
                let _ = self.done.send(Some(proposal));
            }
            Err(e) => {
                match &e {
                    AiError::Cancelled => info!(session_id = %self.session_id, "Stream cancelled"),
                    _ => warn!(session_id = %self.session_id, code = %e.code(), error = %e, "Stream failed"),
                }
                self.emit(StreamEvent::Failed(StreamFailure::from(&e)));
                let _ = self.done.send(None);
            }
        }
    }
}

/// Starts streaming sessions over the shared pipeline
#[derive(Clone)]
pub struct StreamingSessionManager {
    pipeline: Arc<ExecutionPipeline>,
    enabled: bool,
}

impl StreamingSessionManager {
    pub fn new(pipeline: Arc<ExecutionPipeline>, enabled: bool) -> Self {
        Self { pipeline, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Start a session. Returns at once; work happens on a spawned task.
    pub fn start(
        &self,
        action: Arc<dyn AiAction>,
        input: ActionInput,
        cancel: CancellationToken,
    ) -> StreamingSession {
        let (sink, session) = SessionSink::open();
        let pipeline = self.pipeline.clone();
        let enabled = self.enabled;

        debug!(session_id = %session.session_id, action = %action.id(), "Starting stream session");
        tokio::spawn(async move {
            sink.emit(StreamEvent::Started);
            let outcome = if enabled {
                run(&pipeline, action.as_ref(), &input, &cancel, &sink).await
            } else {
                Err(AiError::StreamingDisabled)
            };
            sink.finish(outcome);
        });

        session
    }

    /// A session that failed before it could start
    pub fn rejected(err: AiError) -> StreamingSession {
        let (sink, session) = SessionSink::open();
        sink.emit(StreamEvent::Started);
        sink.finish(Err(err));
        session
    }
}

async fn run(
    pipeline: &ExecutionPipeline,
    action: &dyn AiAction,
    input: &ActionInput,
    cancel: &CancellationToken,
    sink: &SessionSink,
) -> Result<Proposal> {
    let prepared = pipeline.prepare(action, input, true, cancel).await?;
    let provider = prepared.route.provider.clone();
    let started = Instant::now();

    // Cancelling the caller's token cancels this child too
    let mut stream = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(AiError::Cancelled),
        stream = provider.stream(&prepared.request, cancel.child_token()) => stream?,
    };

    let mut text = String::new();
    let mut artifact_ids = Vec::new();
    let mut usage = None;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AiError::Cancelled),
            next = stream.next() => next,
        };

        match next {
            None => break,
            Some(Ok(ProviderChunk::Text(delta))) => {
                text.push_str(&delta);
                sink.emit(StreamEvent::TextDelta(delta));
            }
            Some(Ok(ProviderChunk::Image(artifact))) => {
                let id = pipeline.store_artifact(artifact).await?;
                artifact_ids.push(id.clone());
                sink.emit(StreamEvent::ImageDelta(id));
            }
            Some(Ok(ProviderChunk::Usage(u))) => usage = Some(u),
            Some(Err(_)) if cancel.is_cancelled() => return Err(AiError::Cancelled),
            Some(Err(e)) => return Err(e.into()),
        }
    }
    drop(stream);

    if text.trim().is_empty() && artifact_ids.is_empty() {
        return Err(ProviderError::new(provider.id(), "stream produced no content").into());
    }

    let usage = usage.unwrap_or_else(|| ProviderUsage::new(0, 0, started.elapsed().as_millis() as u64));
    let text = (!text.trim().is_empty()).then_some(text);
    Ok(pipeline
        .finish(action, input, &prepared, MappedOutput { text, artifact_ids }, usage)
        .await)
}
