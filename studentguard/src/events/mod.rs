//! Session lifecycle events.
//!
//! The session emits one event per dispatch, completion, rejection and
//! discarded stale response. Sinks observe these; they never feed back
//! into the session.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{ActionKind, PipelineStage};

/// What happened to an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A call was issued.
    #[serde(rename = "action.dispatched")]
    Dispatched,
    /// A current call completed successfully.
    #[serde(rename = "action.succeeded")]
    Succeeded,
    /// A current call failed.
    #[serde(rename = "action.failed")]
    Failed,
    /// The action was refused before any call.
    #[serde(rename = "action.rejected")]
    Rejected,
    /// A superseded call completed and was discarded.
    #[serde(rename = "action.stale")]
    Stale,
    /// The session was returned to `no_data`.
    #[serde(rename = "pipeline.reset")]
    Reset,
}

impl EventKind {
    /// Returns the dotted event type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dispatched => "action.dispatched",
            Self::Succeeded => "action.succeeded",
            Self::Failed => "action.failed",
            Self::Rejected => "action.rejected",
            Self::Stale => "action.stale",
            Self::Reset => "pipeline.reset",
        }
    }
}

/// One lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// The session that produced the event.
    pub session_id: Uuid,
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// The action concerned.
    pub action: ActionKind,
    /// Dispatch generation of the action.
    pub generation: u64,
    /// Pipeline stage after the event.
    pub stage: PipelineStage,
    /// When the event was produced.
    pub timestamp: DateTime<Utc>,
    /// Extra data, such as an error message or a duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl PipelineEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(
        session_id: Uuid,
        kind: EventKind,
        action: ActionKind,
        generation: u64,
        stage: PipelineStage,
    ) -> Self {
        Self {
            session_id,
            kind,
            action,
            generation,
            stage,
            timestamp: Utc::now(),
            detail: None,
        }
    }

    /// Attaches extra data.
    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = PipelineEvent::new(
            Uuid::nil(),
            EventKind::Failed,
            ActionKind::Clean,
            2,
            PipelineStage::Uploaded,
        )
        .with_detail(serde_json::json!({"status": 400}));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "action.failed");
        assert_eq!(json["action"], "clean");
        assert_eq!(json["stage"], "uploaded");
        assert_eq!(json["detail"]["status"], 400);
    }

    #[test]
    fn test_event_kind_names_match_serde() {
        for kind in [
            EventKind::Dispatched,
            EventKind::Succeeded,
            EventKind::Failed,
            EventKind::Rejected,
            EventKind::Stale,
            EventKind::Reset,
        ] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
        }
    }
}
