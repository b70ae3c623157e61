//! Response envelopes and body decoding for the pipeline service.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::errors::ClientError;
use crate::models::{
    CleanSummary, CleaningCounts, DatasetSnapshot, PredictionResult, PreviewRow, TrainMetrics,
    UploadSummary,
};

/// Body of `POST /upload`.
#[derive(Debug, Deserialize)]
pub struct UploadEnvelope {
    #[serde(default)]
    filename: String,
    #[serde(default)]
    message: String,
    info: DatasetSnapshot,
    #[serde(default)]
    preview: Vec<PreviewRow>,
}

impl UploadEnvelope {
    /// Converts to a summary, keeping at most `preview_rows` records.
    #[must_use]
    pub fn into_summary(self, preview_rows: usize) -> UploadSummary {
        let mut dataset = self.info;
        dataset.preview = self.preview;
        dataset.truncate_preview(preview_rows);
        UploadSummary {
            filename: self.filename,
            message: self.message,
            dataset,
        }
    }
}

/// Body of `POST /clean`.
#[derive(Debug, Deserialize)]
pub struct CleanEnvelope {
    #[serde(default)]
    message: String,
    #[serde(default)]
    summary: CleaningCounts,
    cleaned_info: DatasetSnapshot,
}

impl CleanEnvelope {
    /// Converts to a summary, keeping at most `preview_rows` records.
    #[must_use]
    pub fn into_summary(self, preview_rows: usize) -> CleanSummary {
        let mut cleaned = self.cleaned_info;
        cleaned.truncate_preview(preview_rows);
        CleanSummary {
            message: self.message,
            duplicates_removed: self.summary.duplicates_removed,
            missing_values_handled: self.summary.missing_values_handled,
            text_converted_to_numeric: self.summary.text_converted_to_numeric,
            values_adjusted: self.summary.values_adjusted,
            cleaned,
        }
    }
}

/// Body of `POST /train` and `POST /train_with_params`.
#[derive(Debug, Deserialize)]
pub struct TrainEnvelope {
    /// The service's message.
    #[serde(default)]
    pub message: String,
    /// Training metrics.
    pub metrics: TrainMetrics,
}

/// Body of `POST /predict`.
#[derive(Debug, Deserialize)]
pub struct PredictEnvelope {
    /// The service's message.
    #[serde(default)]
    pub message: String,
    /// The prediction.
    pub result: PredictionResult,
}

/// Body carrying only a message, such as `POST /reset`.
#[derive(Debug, Default, Deserialize)]
pub struct MessageEnvelope {
    /// The service's message.
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Extracts the `error` field of an error response body.
#[must_use]
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
}

/// Builds the error for a non-success response.
#[must_use]
pub fn failure(status: u16, body: &str) -> ClientError {
    ClientError::Application {
        status,
        message: error_message(body),
    }
}

/// Decodes a success response body.
///
/// # Errors
///
/// Returns `ClientError::InvalidPayload` if the body does not match `T`.
pub fn decode<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ClientError> {
    serde_json::from_str(body).map_err(|e| ClientError::invalid_payload(status, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_upload_envelope() {
        let body = fixtures::upload_body(&[("age", 3), ("score", 2)]).to_string();
        let envelope: UploadEnvelope = decode(200, &body).unwrap();
        let summary = envelope.into_summary(10);

        assert_eq!(summary.filename, "students.csv");
        assert_eq!(summary.total_missing_values(), 5);
        assert_eq!(summary.dataset.preview.len(), 2);
        assert_eq!(summary.dataset.data_types.get("age").unwrap(), "float64");
    }

    #[test]
    fn test_upload_envelope_truncates_preview() {
        let body = fixtures::upload_body(&[]).to_string();
        let envelope: UploadEnvelope = decode(200, &body).unwrap();
        assert_eq!(envelope.into_summary(1).dataset.preview.len(), 1);
    }

    #[test]
    fn test_clean_envelope() {
        let body = fixtures::clean_body(2).to_string();
        let envelope: CleanEnvelope = decode(200, &body).unwrap();
        let summary = envelope.into_summary(10);

        assert_eq!(summary.values_adjusted, 2);
        assert_eq!(summary.duplicates_removed, 1);
        assert_eq!(summary.remaining_missing_values(), 0);
    }

    #[test]
    fn test_train_envelope() {
        let body = fixtures::train_body(Some(fixtures::echoed_params(0.5))).to_string();
        let envelope: TrainEnvelope = decode(200, &body).unwrap();
        assert_eq!(envelope.metrics.hyperparams_used.unwrap().c, 0.5);
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"error": "No hay datos cargados"}"#),
            Some("No hay datos cargados".to_string())
        );
        assert_eq!(error_message(r#"{"error": "  "}"#), None);
        assert_eq!(error_message(r#"{"message": "only a message"}"#), None);
        assert_eq!(error_message("<html>Bad Gateway</html>"), None);
    }

    #[test]
    fn test_failure() {
        let err = failure(404, r#"{"error": "Modelo no entrenado"}"#);
        assert_eq!(err.status(), 404);
        assert_eq!(err.service_message(), Some("Modelo no entrenado"));

        let err = failure(502, "");
        assert_eq!(err.service_message(), None);
    }

    #[test]
    fn test_decode_invalid_payload() {
        let err = decode::<TrainEnvelope>(200, r#"{"message": "ok"}"#).unwrap_err();
        assert!(matches!(err, ClientError::InvalidPayload { status: 200, .. }));
    }
}
