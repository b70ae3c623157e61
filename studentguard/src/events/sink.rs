//! Event sink trait and implementations.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn, Level};

use super::PipelineEvent;
use super::EventKind;

/// Trait for sinks receiving session lifecycle events.
///
/// Sinks are used for observability and never influence the session.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: PipelineEvent);

    /// Emits an event without blocking.
    ///
    /// Must never panic; failures are logged and suppressed.
    fn try_emit(&self, event: &PipelineEvent);
}

/// A sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: PipelineEvent) {}

    fn try_emit(&self, _event: &PipelineEvent) {}
}

/// A sink that logs events through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink at the given level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event: &PipelineEvent) {
        // Failures are always worth surfacing, whatever the configured level.
        if event.kind == EventKind::Failed {
            warn!(
                event_type = event.kind.as_str(),
                action = %event.action,
                generation = event.generation,
                stage = %event.stage,
                detail = ?event.detail,
                "Event: {}", event.kind.as_str()
            );
            return;
        }

        if self.level == Level::DEBUG {
            debug!(
                event_type = event.kind.as_str(),
                action = %event.action,
                generation = event.generation,
                stage = %event.stage,
                detail = ?event.detail,
                "Event: {}", event.kind.as_str()
            );
        } else {
            info!(
                event_type = event.kind.as_str(),
                action = %event.action,
                generation = event.generation,
                stage = %event.stage,
                "Event: {}", event.kind.as_str()
            );
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: PipelineEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: &PipelineEvent) {
        self.log_event(event);
    }
}

/// A sink that keeps every event, for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<PipelineEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.read().clone()
    }

    /// Returns the events of one kind.
    #[must_use]
    pub fn events_of_kind(&self, kind: EventKind) -> Vec<PipelineEvent> {
        self.events
            .read()
            .iter()
            .filter(|event| event.kind == kind)
            .cloned()
            .collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: PipelineEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: &PipelineEvent) {
        self.events.write().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ActionKind, PipelineStage};
    use uuid::Uuid;

    fn event(kind: EventKind, action: ActionKind) -> PipelineEvent {
        PipelineEvent::new(Uuid::nil(), kind, action, 1, PipelineStage::NoData)
    }

    #[tokio::test]
    async fn test_noop_sink() {
        let sink = NoOpEventSink;
        sink.emit(event(EventKind::Dispatched, ActionKind::Upload)).await;
        sink.try_emit(&event(EventKind::Succeeded, ActionKind::Upload));
    }

    #[tokio::test]
    async fn test_logging_sink() {
        let sink = LoggingEventSink::debug();
        sink.emit(event(EventKind::Failed, ActionKind::Clean)).await;
        sink.try_emit(&event(EventKind::Stale, ActionKind::Clean));
        LoggingEventSink::default().try_emit(&event(EventKind::Reset, ActionKind::Reset));
    }

    #[tokio::test]
    async fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(event(EventKind::Dispatched, ActionKind::Train)).await;
        sink.try_emit(&event(EventKind::Succeeded, ActionKind::Train));
        sink.try_emit(&event(EventKind::Dispatched, ActionKind::Predict));

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.events()[1].kind, EventKind::Succeeded);
        assert_eq!(sink.events_of_kind(EventKind::Dispatched).len(), 2);

        sink.clear();
        assert!(sink.is_empty());
    }
}
