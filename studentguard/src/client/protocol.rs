//! The remote pipeline client trait and its request types.
//!
//! Implementations issue exactly one request per call and never retry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::ClientError;
use crate::models::{
    CleanSummary, DatasetComparison, DatasetInfo, EvaluationReport, ExportReceipt,
    Hyperparameters, PredictionInput, PredictionResult, TrainMetrics, UploadSummary,
};

/// A dataset file ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFile {
    /// File name sent with the upload.
    pub file_name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl DatasetFile {
    /// Creates a dataset file from memory.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a dataset file from disk.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if the file cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { file_name, bytes })
    }

    /// Size of the contents in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the file has no contents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns true if the file name carries a `.csv` extension.
    #[must_use]
    pub fn has_csv_extension(&self) -> bool {
        Path::new(&self.file_name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
    }
}

/// Response of the health endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Service status keyword.
    #[serde(default)]
    pub status: Option<String>,
    /// Service greeting.
    #[serde(default)]
    pub message: String,
    /// Service version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Protocol for the remote pipeline service.
///
/// One method per remote action. Each call is a single request; failures
/// are reported as [`ClientError`] and never retried.
#[async_trait]
pub trait PipelineClient: Send + Sync {
    /// Probes the service.
    async fn health(&self) -> Result<HealthStatus, ClientError>;

    /// Uploads a dataset, replacing the service's current dataset.
    async fn upload(&self, file: DatasetFile) -> Result<UploadSummary, ClientError>;

    /// Cleans the current dataset.
    async fn clean(&self) -> Result<CleanSummary, ClientError>;

    /// Trains a model with the service's default parameters.
    async fn train(&self) -> Result<TrainMetrics, ClientError>;

    /// Trains a model with the given parameters.
    async fn train_with_params(&self, params: &Hyperparameters) -> Result<TrainMetrics, ClientError>;

    /// Retrieves the last training run's metrics and confusion matrix.
    async fn metrics(&self) -> Result<EvaluationReport, ClientError>;

    /// Runs single-record inference.
    async fn predict(&self, input: &PredictionInput) -> Result<PredictionResult, ClientError>;

    /// Retrieves statistics for the current dataset.
    async fn dataset_info(&self) -> Result<DatasetInfo, ClientError>;

    /// Compares the original and cleaned datasets.
    async fn compare(&self) -> Result<DatasetComparison, ClientError>;

    /// Exports the cleaned dataset on the service side.
    async fn export(&self) -> Result<ExportReceipt, ClientError>;

    /// Resets the service's session state.
    async fn reset(&self) -> Result<String, ClientError>;
}
