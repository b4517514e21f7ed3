// src/types/stream.rs
// Events emitted by a streaming session

use serde::{Deserialize, Serialize};

use crate::error::AiError;

/// Terminal failure of a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFailure {
    pub code: String,
    pub message: String,
}

impl From<&AiError> for StreamFailure {
    fn from(err: &AiError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// One event of a streaming session.
///
/// A session emits exactly one `Started`, any number of deltas, then exactly
/// one of `Completed` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    Started,
    TextDelta(String),
    /// Id of an artifact already registered in the artifact store
    ImageDelta(String),
    Completed,
    Failed(StreamFailure),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed | StreamEvent::Failed(_))
    }

    pub fn is_delta(&self) -> bool {
        matches!(self, StreamEvent::TextDelta(_) | StreamEvent::ImageDelta(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_events() {
        assert!(StreamEvent::Completed.is_terminal());
        assert!(
            StreamEvent::Failed(StreamFailure {
                code: "ai.cancelled".into(),
                message: "operation cancelled".into(),
            })
            .is_terminal()
        );
        assert!(!StreamEvent::Started.is_terminal());
        assert!(!StreamEvent::TextDelta("x".into()).is_terminal());
        assert!(StreamEvent::ImageDelta("a-1".into()).is_delta());
    }

    #[test]
    fn test_failure_from_error() {
        let failure = StreamFailure::from(&AiError::StreamingDisabled);
        assert_eq!(failure.code, "ai.streaming_disabled");
        assert_eq!(failure.message, "streaming is disabled");
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(StreamEvent::TextDelta("hi".into())).unwrap();
        assert_eq!(json["type"], "text_delta");
        assert_eq!(json["data"], "hi");
    }
}
