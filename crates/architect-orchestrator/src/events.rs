//! Lifecycle notifications
//!
//! Events are plain data emitted in order for each request. Transport is the
//! sink's concern: a channel to a push-update task, a log, or a buffer in tests.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc::UnboundedSender;

use crate::types::GenerationStatus;
use architect_utils::types::{ArtifactType, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GenerationEvent {
    Started {
        request_id: String,
        artifact: ArtifactType,
        candidates: Vec<String>,
    },
    Attempt {
        request_id: String,
        index: usize,
        candidate: String,
        score: u8,
        passed: bool,
        failure: Option<ErrorKind>,
    },
    Completed {
        request_id: String,
        status: GenerationStatus,
        version: u64,
        candidate: String,
        score: u8,
    },
    Failed {
        request_id: String,
        kind: ErrorKind,
        reason: String,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: GenerationEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: GenerationEvent) {}
}

impl EventSink for UnboundedSender<GenerationEvent> {
    fn emit(&self, event: GenerationEvent) {
        // A dropped receiver means nobody is listening any more.
        let _ = self.send(event);
    }
}

/// Buffers events in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<GenerationEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GenerationEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: GenerationEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = GenerationEvent::Attempt {
            request_id: "r1".into(),
            index: 0,
            candidate: "local:llama3".into(),
            score: 85,
            passed: true,
            failure: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "attempt");
        assert_eq!(json["score"], 85);
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        for kind in [ErrorKind::Timeout, ErrorKind::Cancelled] {
            tx.emit(GenerationEvent::Failed {
                request_id: "r".into(),
                kind,
                reason: kind.to_string(),
            });
        }
        drop(tx);

        let mut kinds = Vec::new();
        while let Some(GenerationEvent::Failed { kind, .. }) = rx.recv().await {
            kinds.push(kind);
        }
        assert_eq!(kinds, vec![ErrorKind::Timeout, ErrorKind::Cancelled]);
    }

    #[test]
    fn test_send_after_receiver_dropped_is_ignored() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        tx.emit(GenerationEvent::Failed {
            request_id: "r".into(),
            kind: ErrorKind::Internal,
            reason: "x".into(),
        });
    }
}
