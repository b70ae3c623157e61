//! User-facing messages and derived display figures.
//!
//! Everything here is a pure function of its inputs, so figures shown to
//! the user are recomputed from cached payloads on every read.

use crate::core::ActionKind;
use crate::errors::ClientError;

/// Message shown when no response reached the service.
pub const CONNECTIVITY_MESSAGE: &str =
    "Connection/CORS error (status 0). Make sure the backend is running and CORS is enabled.";

/// Generic message for a failed action whose service gave no usable error.
#[must_use]
pub const fn fallback_message(action: ActionKind) -> &'static str {
    match action {
        ActionKind::Health => "Unable to reach the StudentGuard service.",
        ActionKind::Upload => "Unknown error while uploading the file.",
        ActionKind::Clean => "Unknown error while cleaning the data.",
        ActionKind::Train => {
            "Unknown error while training. Make sure the data is loaded and cleaned."
        }
        ActionKind::Predict => "Prediction failed. Make sure the model has been trained.",
        ActionKind::FetchMetrics => {
            "Error: make sure data has been loaded and a model trained first."
        }
        ActionKind::DataInfo => "Unable to load dataset information.",
        ActionKind::Compare => "Unable to compare the original and cleaned datasets.",
        ActionKind::Export => "Unable to export the cleaned dataset.",
        ActionKind::Reset => "Error while trying to reset the system. (Check the backend console.)",
    }
}

/// The text stored in an action's failed slot for a remote failure.
///
/// The service's own message wins; transport failures get the
/// connectivity message; anything else gets the action's fallback.
#[must_use]
pub fn failure_message(action: ActionKind, error: &ClientError) -> String {
    if error.is_transport() {
        return CONNECTIVITY_MESSAGE.to_string();
    }
    error
        .service_message()
        .map_or_else(|| fallback_message(action).to_string(), ToString::to_string)
}

/// Status line while an action is outstanding.
#[must_use]
pub const fn in_flight_line(action: ActionKind) -> &'static str {
    match action {
        ActionKind::Health => "Checking the service...",
        ActionKind::Upload => "Uploading dataset...",
        ActionKind::Clean => "Starting data cleaning...",
        ActionKind::Train => "Starting model training...",
        ActionKind::Predict => "Running prediction...",
        ActionKind::FetchMetrics => "Loading evaluation metrics...",
        ActionKind::DataInfo => "Loading dataset information...",
        ActionKind::Compare => "Comparing datasets...",
        ActionKind::Export => "Exporting cleaned dataset...",
        ActionKind::Reset => "Sending reset request to the server...",
    }
}

/// Status line after an action failed.
#[must_use]
pub fn failure_line(action: ActionKind) -> String {
    let phase = match action {
        ActionKind::Health => "the health check",
        ActionKind::Upload => "upload",
        ActionKind::Clean => "cleaning",
        ActionKind::Train => "training",
        ActionKind::Predict => "prediction",
        ActionKind::FetchMetrics => "metrics retrieval",
        ActionKind::DataInfo => "dataset inspection",
        ActionKind::Compare => "comparison",
        ActionKind::Export => "export",
        ActionKind::Reset => "reset",
    };
    format!("Error during {phase}.")
}

/// Status line before anything was uploaded.
pub const IDLE_LINE: &str = "Waiting for a dataset. Upload a CSV file to begin.";

/// Status line after a successful reset.
pub const RESET_LINE: &str = "System reset. Upload a new file.";

/// Status line after a successful clean.
pub const CLEANED_LINE: &str = "Data cleaned successfully. Ready to train.";

/// Status line after a successful upload.
#[must_use]
pub fn upload_status_line(total_missing: u64) -> String {
    if total_missing > 0 {
        format!("Upload succeeded. Detected {total_missing} missing values. Ready to clean.")
    } else {
        "Upload succeeded. No missing values detected. Ready to clean.".to_string()
    }
}

/// Success message for a clean that adjusted `values_adjusted` values.
#[must_use]
pub fn clean_success_message(values_adjusted: u64) -> String {
    if values_adjusted > 0 {
        format!("Cleaning succeeded: {values_adjusted} adjusted out-of-range values.")
    } else {
        "Cleaning succeeded. No significant adjustments were needed.".to_string()
    }
}

/// Status line after a successful training run.
#[must_use]
pub fn train_status_line(accuracy: f64) -> String {
    format!("Model trained and saved. Accuracy: {}.", format_metric(Some(accuracy)))
}

/// Formats a 0–1 metric as a percentage with two decimals.
#[must_use]
pub fn format_metric(metric: Option<f64>) -> String {
    match metric {
        Some(value) if value.is_finite() => format!("{:.2}%", value * 100.0),
        _ => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_message_prefers_service_text() {
        let err = ClientError::application(400, "No hay datos cargados");
        assert_eq!(failure_message(ActionKind::Clean, &err), "No hay datos cargados");
    }

    #[test]
    fn test_failure_message_transport() {
        let err = ClientError::transport("connection refused");
        assert_eq!(failure_message(ActionKind::Upload, &err), CONNECTIVITY_MESSAGE);
    }

    #[test]
    fn test_failure_message_fallbacks() {
        assert_eq!(
            failure_message(ActionKind::Train, &ClientError::bare_status(500)),
            fallback_message(ActionKind::Train)
        );
        assert_eq!(
            failure_message(ActionKind::Predict, &ClientError::invalid_payload(200, "eof")),
            fallback_message(ActionKind::Predict)
        );
    }

    #[test]
    fn test_upload_status_line() {
        assert!(upload_status_line(5).contains("Detected 5 missing values"));
        assert!(upload_status_line(0).contains("No missing values"));
    }

    #[test]
    fn test_clean_success_message() {
        assert!(clean_success_message(2).contains("2 adjusted"));
        assert!(clean_success_message(0).contains("No significant adjustments"));
    }

    #[test]
    fn test_train_status_line() {
        assert_eq!(
            train_status_line(0.875),
            "Model trained and saved. Accuracy: 87.50%."
        );
    }

    #[test]
    fn test_format_metric() {
        assert_eq!(format_metric(Some(0.8234)), "82.34%");
        assert_eq!(format_metric(None), "N/A");
        assert_eq!(format_metric(Some(f64::NAN)), "N/A");
    }

    #[test]
    fn test_every_action_has_lines() {
        for action in ActionKind::ALL {
            assert!(!fallback_message(action).is_empty());
            assert!(!in_flight_line(action).is_empty());
            assert!(failure_line(action).starts_with("Error during"));
        }
    }
}
