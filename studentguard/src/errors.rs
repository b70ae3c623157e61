//! Error types for the StudentGuard orchestration core.
//!
//! Remote calls fail with a [`ClientError`]; session operations fail with an
//! [`ActionError`], whose [`ErrorClass`] follows the dashboard's taxonomy of
//! local validation, transport, application and stale-response failures.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::core::{ActionKind, PipelineStage};

/// Failure of a single remote call.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// No response reached the service.
    #[error("transport failure: {detail}")]
    Transport {
        /// Transport-level detail, for logs only.
        detail: String,
    },

    /// The service responded with a non-success status.
    #[error("service responded with HTTP {status}")]
    Application {
        /// HTTP status code.
        status: u16,
        /// The `error` field of the response body, when present.
        message: Option<String>,
    },

    /// The service responded with a success status but an unreadable body.
    #[error("unexpected payload (HTTP {status}): {detail}")]
    InvalidPayload {
        /// HTTP status code.
        status: u16,
        /// Decoder detail, for logs only.
        detail: String,
    },
}

impl ClientError {
    /// Creates a transport failure.
    #[must_use]
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport {
            detail: detail.into(),
        }
    }

    /// Creates an application failure carrying the service's message.
    #[must_use]
    pub fn application(status: u16, message: impl Into<String>) -> Self {
        Self::Application {
            status,
            message: Some(message.into()),
        }
    }

    /// Creates an application failure without a structured message.
    #[must_use]
    pub fn bare_status(status: u16) -> Self {
        Self::Application {
            status,
            message: None,
        }
    }

    /// Creates an invalid payload failure.
    #[must_use]
    pub fn invalid_payload(status: u16, detail: impl Into<String>) -> Self {
        Self::InvalidPayload {
            status,
            detail: detail.into(),
        }
    }

    /// The response status; `0` when no response was received.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Transport { .. } => 0,
            Self::Application { status, .. } | Self::InvalidPayload { status, .. } => *status,
        }
    }

    /// The message supplied by the service, if any.
    #[must_use]
    pub fn service_message(&self) -> Option<&str> {
        match self {
            Self::Application { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Returns true if the request never produced a response.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// The error classes surfaced by session operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Rejected before any network call.
    LocalValidation,
    /// No response reached the service.
    TransportFailure,
    /// The service answered with an error.
    ApplicationFailure,
    /// A completion arrived after its dispatch was invalidated.
    StaleResponseIgnored,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalValidation => write!(f, "local_validation"),
            Self::TransportFailure => write!(f, "transport_failure"),
            Self::ApplicationFailure => write!(f, "application_failure"),
            Self::StaleResponseIgnored => write!(f, "stale_response_ignored"),
        }
    }
}

/// Failure of a session operation.
#[derive(Debug, Clone, Error)]
pub enum ActionError {
    /// The pipeline has not reached the stage the action requires.
    #[error("{action} requires the pipeline to be at least '{required}' (currently '{current}')")]
    PrerequisiteNotMet {
        /// The rejected action.
        action: ActionKind,
        /// The stage the action requires.
        required: PipelineStage,
        /// The stage the pipeline is in.
        current: PipelineStage,
    },

    /// The action's input failed local validation.
    #[error("{message}")]
    InvalidInput {
        /// The rejected action.
        action: ActionKind,
        /// User-facing description of the problem.
        message: String,
    },

    /// A call for the same action is still outstanding.
    #[error("{action} is already in flight")]
    AlreadyInFlight {
        /// The rejected action.
        action: ActionKind,
    },

    /// A reset is outstanding; nothing else may be dispatched.
    #[error("{action} rejected: a reset is in progress")]
    ResetInProgress {
        /// The rejected action.
        action: ActionKind,
    },

    /// The service could not be reached.
    #[error("{message}")]
    Transport {
        /// The failed action.
        action: ActionKind,
        /// User-facing connectivity message.
        message: String,
        /// Transport detail.
        detail: String,
    },

    /// The service answered with an error.
    #[error("{message}")]
    Application {
        /// The failed action.
        action: ActionKind,
        /// HTTP status code.
        status: u16,
        /// The service's message, or the action's fallback.
        message: String,
    },

    /// The completion was superseded by a reset or a newer dispatch.
    #[error("stale {action} response discarded (generation {generation})")]
    StaleResponse {
        /// The superseded action.
        action: ActionKind,
        /// The generation the completion belonged to.
        generation: u64,
    },
}

impl ActionError {
    /// Creates a prerequisite failure.
    #[must_use]
    pub fn prerequisite(action: ActionKind, current: PipelineStage) -> Self {
        Self::PrerequisiteNotMet {
            action,
            required: action.required_stage(),
            current,
        }
    }

    /// Creates an input validation failure.
    #[must_use]
    pub fn invalid_input(action: ActionKind, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            action,
            message: message.into(),
        }
    }

    /// Builds the error for a failed remote call, using `message` as the
    /// user-facing text.
    #[must_use]
    pub fn from_client(action: ActionKind, error: &ClientError, message: impl Into<String>) -> Self {
        match error {
            ClientError::Transport { detail } => Self::Transport {
                action,
                message: message.into(),
                detail: detail.clone(),
            },
            ClientError::Application { status, .. } | ClientError::InvalidPayload { status, .. } => {
                Self::Application {
                    action,
                    status: *status,
                    message: message.into(),
                }
            }
        }
    }

    /// The action this error belongs to.
    #[must_use]
    pub fn action(&self) -> ActionKind {
        match self {
            Self::PrerequisiteNotMet { action, .. }
            | Self::InvalidInput { action, .. }
            | Self::AlreadyInFlight { action }
            | Self::ResetInProgress { action }
            | Self::Transport { action, .. }
            | Self::Application { action, .. }
            | Self::StaleResponse { action, .. } => *action,
        }
    }

    /// The taxonomy class of this error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::PrerequisiteNotMet { .. }
            | Self::InvalidInput { .. }
            | Self::AlreadyInFlight { .. }
            | Self::ResetInProgress { .. } => ErrorClass::LocalValidation,
            Self::Transport { .. } => ErrorClass::TransportFailure,
            Self::Application { .. } => ErrorClass::ApplicationFailure,
            Self::StaleResponse { .. } => ErrorClass::StaleResponseIgnored,
        }
    }

    /// Returns true if the error was produced without a network call.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.class() == ErrorClass::LocalValidation
    }

    /// The text to show the user; `None` for suppressed stale responses.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::StaleResponse { .. } => None,
            other => Some(other.to_string()),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("action".to_string(), serde_json::json!(self.action()));
        map.insert("class".to_string(), serde_json::json!(self.class()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match self {
            Self::PrerequisiteNotMet { required, current, .. } => {
                map.insert("required".to_string(), serde_json::json!(required));
                map.insert("current".to_string(), serde_json::json!(current));
            }
            Self::Transport { detail, .. } => {
                map.insert("detail".to_string(), serde_json::json!(detail));
            }
            Self::Application { status, .. } => {
                map.insert("status".to_string(), serde_json::json!(status));
            }
            Self::StaleResponse { generation, .. } => {
                map.insert("generation".to_string(), serde_json::json!(generation));
            }
            Self::InvalidInput { .. } | Self::AlreadyInFlight { .. } | Self::ResetInProgress { .. } => {}
        }

        map
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The base URL is not an absolute http(s) URL.
    #[error("invalid base URL '{0}': expected an absolute http:// or https:// URL")]
    InvalidBaseUrl(String),

    /// A timeout was zero, negative or not finite.
    #[error("invalid {name}: {value} (must be a positive number of seconds)")]
    InvalidTimeout {
        /// The offending setting.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// An environment variable could not be parsed.
    #[error("invalid value for {name}: '{value}'")]
    InvalidEnv {
        /// The environment variable.
        name: &'static str,
        /// The raw value.
        value: String,
    },

    /// A configured header name or value is not valid HTTP.
    #[error("invalid header '{0}'")]
    InvalidHeader(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    /// The configuration document could not be parsed.
    #[error("Serialization error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_status() {
        assert_eq!(ClientError::transport("refused").status(), 0);
        assert_eq!(ClientError::application(400, "bad").status(), 400);
        assert_eq!(ClientError::invalid_payload(200, "eof").status(), 200);
        assert!(ClientError::transport("refused").is_transport());
    }

    #[test]
    fn test_client_error_service_message() {
        assert_eq!(
            ClientError::application(400, "No data loaded").service_message(),
            Some("No data loaded")
        );
        assert_eq!(ClientError::bare_status(502).service_message(), None);
        assert_eq!(ClientError::transport("x").service_message(), None);
    }

    #[test]
    fn test_prerequisite_error() {
        let err = ActionError::prerequisite(ActionKind::Predict, PipelineStage::Cleaned);
        assert_eq!(err.class(), ErrorClass::LocalValidation);
        assert!(err.is_local());
        assert!(err.to_string().contains("trained"));
        assert!(err.to_string().contains("cleaned"));

        let dict = err.to_dict();
        assert_eq!(dict.get("required").unwrap(), "trained");
        assert_eq!(dict.get("class").unwrap(), "local_validation");
    }

    #[test]
    fn test_from_client_classes() {
        let transport = ActionError::from_client(
            ActionKind::Upload,
            &ClientError::transport("connection refused"),
            "cannot connect",
        );
        assert_eq!(transport.class(), ErrorClass::TransportFailure);
        assert_eq!(transport.to_string(), "cannot connect");

        let app = ActionError::from_client(
            ActionKind::Clean,
            &ClientError::application(400, "No data"),
            "No data",
        );
        assert_eq!(app.class(), ErrorClass::ApplicationFailure);

        let payload = ActionError::from_client(
            ActionKind::Train,
            &ClientError::invalid_payload(200, "missing field"),
            "fallback",
        );
        assert_eq!(payload.class(), ErrorClass::ApplicationFailure);
    }

    #[test]
    fn test_stale_response_is_not_user_visible() {
        let err = ActionError::StaleResponse {
            action: ActionKind::Upload,
            generation: 3,
        };
        assert_eq!(err.class(), ErrorClass::StaleResponseIgnored);
        assert!(err.user_message().is_none());
        assert_eq!(err.to_dict().get("generation").unwrap(), 3);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidTimeout {
            name: "timeout_seconds",
            value: -1.0,
        };
        assert!(err.to_string().contains("timeout_seconds"));
    }
}
