//! Structured tracing for session actions.
//!
//! Provides span attributes for one dispatched action, a timing helper and
//! a subscriber initializer for binaries.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use crate::core::{ActionKind, PipelineStage};

/// Span attributes for one dispatched action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpanAttributes {
    /// The action.
    pub action: ActionKind,
    /// Dispatch generation.
    pub generation: u64,
    /// Session ID.
    pub session_id: Option<String>,
    /// Stage after completion.
    pub stage: Option<PipelineStage>,
    /// Final outcome (`succeeded`, `failed`, `stale`).
    pub outcome: Option<String>,
    /// Duration in milliseconds.
    pub duration_ms: Option<f64>,
    /// Error message if failed.
    pub error: Option<String>,
}

impl ActionSpanAttributes {
    /// Creates attributes for a dispatch.
    #[must_use]
    pub fn new(action: ActionKind, generation: u64) -> Self {
        Self {
            action,
            generation,
            session_id: None,
            stage: None,
            outcome: None,
            duration_ms: None,
            error: None,
        }
    }

    /// Sets the session ID.
    #[must_use]
    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// Sets the stage.
    #[must_use]
    pub fn with_stage(mut self, stage: PipelineStage) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Sets the outcome.
    #[must_use]
    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the error.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Flattens to dotted attribute names.
    #[must_use]
    pub fn to_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();

        attrs.insert("action.name".to_string(), self.action.to_string());
        attrs.insert("action.generation".to_string(), self.generation.to_string());

        if let Some(ref v) = self.session_id {
            attrs.insert("session.id".to_string(), v.clone());
        }
        if let Some(v) = self.stage {
            attrs.insert("pipeline.stage".to_string(), v.to_string());
        }
        if let Some(ref v) = self.outcome {
            attrs.insert("action.outcome".to_string(), v.clone());
        }
        if let Some(v) = self.duration_ms {
            attrs.insert("action.duration_ms".to_string(), v.to_string());
        }
        if let Some(ref v) = self.error {
            attrs.insert("action.error".to_string(), v.clone());
        }

        attrs
    }
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Installs the global `tracing` subscriber.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`. Returns false if a
/// subscriber was already installed.
pub fn init_tracing(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_span_attributes() {
        let attrs = ActionSpanAttributes::new(ActionKind::Train, 4)
            .with_session_id("s-1")
            .with_stage(PipelineStage::Trained)
            .with_outcome("succeeded")
            .with_duration_ms(12.5);

        let flat = attrs.to_attributes();
        assert_eq!(flat.get("action.name"), Some(&"train".to_string()));
        assert_eq!(flat.get("action.generation"), Some(&"4".to_string()));
        assert_eq!(flat.get("pipeline.stage"), Some(&"trained".to_string()));
        assert_eq!(flat.get("action.duration_ms"), Some(&"12.5".to_string()));
        assert!(!flat.contains_key("action.error"));
    }

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("upload");
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(timer.name(), "upload");
        assert!(timer.finish() >= 10.0);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_init_tracing_twice() {
        init_tracing(LogFormat::Pretty);
        assert!(!init_tracing(LogFormat::Json));
    }
}
