//! Scripted pipeline client for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::client::{DatasetFile, HealthStatus, PipelineClient};
use crate::core::ActionKind;
use crate::errors::ClientError;
use crate::models::{
    CleanSummary, DatasetComparison, DatasetInfo, EvaluationReport, ExportReceipt,
    Hyperparameters, PredictionInput, PredictionResult, TrainMetrics, UploadSummary,
};

/// One call received by a [`ScriptedPipelineClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    /// `health`.
    Health,
    /// `upload`, with the file name and size.
    Upload {
        /// File name sent.
        file_name: String,
        /// Size in bytes.
        bytes: usize,
    },
    /// `clean`.
    Clean,
    /// `train`.
    Train,
    /// `train_with_params`, with the parameters sent.
    TrainWithParams(Hyperparameters),
    /// `metrics`.
    Metrics,
    /// `predict`, with the input sent.
    Predict(PredictionInput),
    /// `dataset_info`.
    DataInfo,
    /// `compare`.
    Compare,
    /// `export`.
    Export,
    /// `reset`.
    Reset,
}

impl RecordedCall {
    /// The action slot the call belongs to.
    #[must_use]
    pub fn action(&self) -> ActionKind {
        match self {
            Self::Health => ActionKind::Health,
            Self::Upload { .. } => ActionKind::Upload,
            Self::Clean => ActionKind::Clean,
            Self::Train | Self::TrainWithParams(_) => ActionKind::Train,
            Self::Metrics => ActionKind::FetchMetrics,
            Self::Predict(_) => ActionKind::Predict,
            Self::DataInfo => ActionKind::DataInfo,
            Self::Compare => ActionKind::Compare,
            Self::Export => ActionKind::Export,
            Self::Reset => ActionKind::Reset,
        }
    }
}

#[derive(Debug)]
struct Script<T> {
    queue: Mutex<VecDeque<Result<T, ClientError>>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T> Script<T> {
    fn push(&self, outcome: Result<T, ClientError>) {
        self.queue.lock().push_back(outcome);
    }

    fn next(&self) -> Result<T, ClientError> {
        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::transport("no scripted response")))
    }
}

/// A [`PipelineClient`] that replays queued outcomes.
///
/// Each method pops the next outcome queued for it; an empty queue yields a
/// transport failure. A held action parks its calls until the gate returned
/// by [`ScriptedPipelineClient::hold`] is notified, which lets tests observe
/// in-flight states and late completions.
#[derive(Debug, Default)]
pub struct ScriptedPipelineClient {
    health: Script<HealthStatus>,
    upload: Script<UploadSummary>,
    clean: Script<CleanSummary>,
    train: Script<TrainMetrics>,
    metrics: Script<EvaluationReport>,
    predict: Script<PredictionResult>,
    info: Script<DatasetInfo>,
    compare: Script<DatasetComparison>,
    export: Script<ExportReceipt>,
    reset: Script<String>,
    calls: Mutex<Vec<RecordedCall>>,
    gates: Mutex<HashMap<ActionKind, Arc<Notify>>>,
}

impl ScriptedPipelineClient {
    /// Creates a client with empty scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a health outcome.
    pub fn script_health(&self, outcome: Result<HealthStatus, ClientError>) {
        self.health.push(outcome);
    }

    /// Queues an upload outcome.
    pub fn script_upload(&self, outcome: Result<UploadSummary, ClientError>) {
        self.upload.push(outcome);
    }

    /// Queues a clean outcome.
    pub fn script_clean(&self, outcome: Result<CleanSummary, ClientError>) {
        self.clean.push(outcome);
    }

    /// Queues a train outcome, used by both training methods.
    pub fn script_train(&self, outcome: Result<TrainMetrics, ClientError>) {
        self.train.push(outcome);
    }

    /// Queues a metrics outcome.
    pub fn script_metrics(&self, outcome: Result<EvaluationReport, ClientError>) {
        self.metrics.push(outcome);
    }

    /// Queues a predict outcome.
    pub fn script_predict(&self, outcome: Result<PredictionResult, ClientError>) {
        self.predict.push(outcome);
    }

    /// Queues a dataset info outcome.
    pub fn script_dataset_info(&self, outcome: Result<DatasetInfo, ClientError>) {
        self.info.push(outcome);
    }

    /// Queues a compare outcome.
    pub fn script_compare(&self, outcome: Result<DatasetComparison, ClientError>) {
        self.compare.push(outcome);
    }

    /// Queues an export outcome.
    pub fn script_export(&self, outcome: Result<ExportReceipt, ClientError>) {
        self.export.push(outcome);
    }

    /// Queues a reset outcome.
    pub fn script_reset(&self, outcome: Result<String, ClientError>) {
        self.reset.push(outcome);
    }

    /// Parks every call for `action` until the returned gate is notified.
    pub fn hold(&self, action: ActionKind) -> Arc<Notify> {
        Arc::clone(self.gates.lock().entry(action).or_default())
    }

    /// Stops parking calls for `action`.
    pub fn release(&self, action: ActionKind) {
        if let Some(gate) = self.gates.lock().remove(&action) {
            gate.notify_waiters();
        }
    }

    /// Every call received, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of calls received for one action slot.
    #[must_use]
    pub fn calls_for(&self, action: ActionKind) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.action() == action)
            .count()
    }

    async fn receive(&self, call: RecordedCall) {
        let action = call.action();
        self.calls.lock().push(call);

        let gate = self.gates.lock().get(&action).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl PipelineClient for ScriptedPipelineClient {
    async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.receive(RecordedCall::Health).await;
        self.health.next()
    }

    async fn upload(&self, file: DatasetFile) -> Result<UploadSummary, ClientError> {
        self.receive(RecordedCall::Upload {
            bytes: file.len(),
            file_name: file.file_name,
        })
        .await;
        self.upload.next()
    }

    async fn clean(&self) -> Result<CleanSummary, ClientError> {
        self.receive(RecordedCall::Clean).await;
        self.clean.next()
    }

    async fn train(&self) -> Result<TrainMetrics, ClientError> {
        self.receive(RecordedCall::Train).await;
        self.train.next()
    }

    async fn train_with_params(&self, params: &Hyperparameters) -> Result<TrainMetrics, ClientError> {
        self.receive(RecordedCall::TrainWithParams(params.clone()))
            .await;
        self.train.next()
    }

    async fn metrics(&self) -> Result<EvaluationReport, ClientError> {
        self.receive(RecordedCall::Metrics).await;
        self.metrics.next()
    }

    async fn predict(&self, input: &PredictionInput) -> Result<PredictionResult, ClientError> {
        self.receive(RecordedCall::Predict(*input)).await;
        self.predict.next()
    }

    async fn dataset_info(&self) -> Result<DatasetInfo, ClientError> {
        self.receive(RecordedCall::DataInfo).await;
        self.info.next()
    }

    async fn compare(&self) -> Result<DatasetComparison, ClientError> {
        self.receive(RecordedCall::Compare).await;
        self.compare.next()
    }

    async fn export(&self) -> Result<ExportReceipt, ClientError> {
        self.receive(RecordedCall::Export).await;
        self.export.next()
    }

    async fn reset(&self) -> Result<String, ClientError> {
        self.receive(RecordedCall::Reset).await;
        self.reset.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_scripted_outcomes_in_order() {
        let client = ScriptedPipelineClient::new();
        client.script_clean(Ok(fixtures::clean_summary(2)));
        client.script_clean(Err(ClientError::application(400, "No data")));

        assert_eq!(client.clean().await.unwrap().values_adjusted, 2);
        assert_eq!(client.clean().await.unwrap_err().status(), 400);
        assert!(client.clean().await.unwrap_err().is_transport());
        assert_eq!(client.calls_for(ActionKind::Clean), 3);
    }

    #[tokio::test]
    async fn test_records_arguments() {
        let client = ScriptedPipelineClient::new();
        let params = Hyperparameters::default().with_c(-1.0);
        let _ = client.train_with_params(&params).await;
        let _ = client.upload(fixtures::csv_file()).await;

        let calls = client.calls();
        assert_eq!(calls[0], RecordedCall::TrainWithParams(params));
        assert!(matches!(&calls[1], RecordedCall::Upload { file_name, .. } if file_name == "students.csv"));
        assert_eq!(client.calls_for(ActionKind::Train), 1);
    }

    #[tokio::test]
    async fn test_hold_parks_call() {
        let client = ScriptedPipelineClient::new();
        client.script_reset(Ok("reset".to_string()));
        let gate = client.hold(ActionKind::Reset);

        let mut call = tokio_test::task::spawn(client.reset());
        tokio_test::assert_pending!(call.poll());
        assert_eq!(client.call_count(), 1);

        gate.notify_one();
        let outcome = tokio_test::assert_ready!(call.poll());
        assert_eq!(outcome.unwrap(), "reset");
    }
}
