//! The dashboard session: one owned mirror of one remote pipeline session.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::cache::{ResultCache, StagePayload};
use super::machine::{DispatchTicket, StageMachine};
use crate::client::{DatasetFile, HealthStatus, PipelineClient};
use crate::core::{ActionKind, ActionStatus, PipelineStage};
use crate::errors::{ActionError, ClientError};
use crate::events::{EventKind, EventSink, NoOpEventSink, PipelineEvent};
use crate::messages;
use crate::models::{
    CleanSummary, DatasetComparison, DatasetInfo, EvaluationReport, ExportReceipt,
    Hyperparameters, PredictionInput, PredictionResult, TrainMetrics, UploadSummary,
};
use crate::observability::{ActionSpanAttributes, SpanTimer};

/// Default upload size limit, matching the service's.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// What the last health check learned about the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    /// No health check has completed.
    #[default]
    Unknown,
    /// The service answered.
    Connected {
        /// Version reported by the service.
        version: Option<String>,
    },
    /// No response reached the service.
    Unreachable,
}

/// A point-in-time view of the session, for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session ID.
    pub session_id: Uuid,
    /// Current stage.
    pub stage: PipelineStage,
    /// Every status slot, in action order.
    pub statuses: Vec<(ActionKind, ActionStatus)>,
    /// Connection state.
    pub connection: ConnectionState,
    /// Missing values in the current dataset.
    pub total_missing_values: u64,
    /// Status line.
    pub status_line: String,
}

#[derive(Debug, Default)]
struct SessionState {
    machine: StageMachine,
    cache: ResultCache,
    connection: ConnectionState,
    /// Last stage-changing action whose completion was applied.
    last_action: Option<ActionKind>,
}

impl SessionState {
    fn try_begin<V>(&mut self, action: ActionKind, validate: V) -> Result<DispatchTicket, ActionError>
    where
        V: FnOnce() -> Result<(), String>,
    {
        self.machine.check(action)?;
        if let Err(message) = validate() {
            self.machine.record_failure(action, message.clone());
            return Err(ActionError::invalid_input(action, message));
        }
        self.machine.begin(action)
    }

    fn status_line(&self) -> String {
        let in_flight = ActionKind::ALL
            .into_iter()
            .find(|action| action.is_stage_changing() && self.machine.status(*action).is_in_flight());
        if let Some(action) = in_flight {
            return messages::in_flight_line(action).to_string();
        }

        let Some(action) = self.last_action else {
            return messages::IDLE_LINE.to_string();
        };
        if self.machine.status(action).is_failure() {
            return messages::failure_line(action);
        }
        match action {
            ActionKind::Upload => messages::upload_status_line(self.cache.displayed_missing_total()),
            ActionKind::Clean => messages::CLEANED_LINE.to_string(),
            ActionKind::Train => self.cache.train().map_or_else(
                || messages::IDLE_LINE.to_string(),
                |entry| messages::train_status_line(entry.payload().accuracy),
            ),
            ActionKind::Reset => messages::RESET_LINE.to_string(),
            _ => messages::IDLE_LINE.to_string(),
        }
    }
}

/// Orchestrates the pipeline actions of one dashboard session.
///
/// Every action checks the stage guard, issues one call, and applies the
/// outcome when the call completes. The state lock is never held across
/// a call, so distinct actions may be outstanding at once.
pub struct PipelineSession {
    id: Uuid,
    client: Arc<dyn PipelineClient>,
    sink: Arc<dyn EventSink>,
    max_upload_bytes: usize,
    state: Mutex<SessionState>,
}

impl fmt::Debug for PipelineSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineSession")
            .field("id", &self.id)
            .field("stage", &self.stage())
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish_non_exhaustive()
    }
}

impl PipelineSession {
    /// Creates a session over `client`.
    #[must_use]
    pub fn new(client: Arc<dyn PipelineClient>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client,
            sink: Arc::new(NoOpEventSink),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Creates a session talking HTTP to the configured service.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid.
    #[cfg(feature = "http")]
    pub fn from_config(
        config: crate::config::ClientConfig,
    ) -> Result<Self, crate::errors::ConfigError> {
        let max_upload_bytes = config.max_upload_bytes;
        let client = crate::client::HttpPipelineClient::new(config)?;
        Ok(Self::new(Arc::new(client)).with_max_upload_bytes(max_upload_bytes))
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the upload size limit.
    #[must_use]
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// The session ID.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The current stage.
    #[must_use]
    pub fn stage(&self) -> PipelineStage {
        self.state.lock().machine.stage()
    }

    /// The status of an action's slot.
    #[must_use]
    pub fn status(&self, action: ActionKind) -> ActionStatus {
        self.state.lock().machine.status(action)
    }

    /// The current dispatch generation of an action.
    ///
    /// The reset generation changes whenever a reset is dispatched or
    /// completes, so holders of derived state can tell it was wiped.
    #[must_use]
    pub fn generation(&self, action: ActionKind) -> u64 {
        self.state.lock().machine.generation(action)
    }

    /// Returns true if the stage satisfies the action's prerequisite.
    #[must_use]
    pub fn can_run(&self, action: ActionKind) -> bool {
        self.state.lock().machine.can_run(action)
    }

    /// The last known connection state.
    #[must_use]
    pub fn connection(&self) -> ConnectionState {
        self.state.lock().connection.clone()
    }

    /// The cached upload summary.
    #[must_use]
    pub fn upload_summary(&self) -> Option<Arc<UploadSummary>> {
        self.state.lock().cache.upload().map(|entry| entry.payload())
    }

    /// The cached clean summary.
    #[must_use]
    pub fn clean_summary(&self) -> Option<Arc<CleanSummary>> {
        self.state.lock().cache.clean().map(|entry| entry.payload())
    }

    /// The cached training metrics.
    #[must_use]
    pub fn train_metrics(&self) -> Option<Arc<TrainMetrics>> {
        self.state.lock().cache.train().map(|entry| entry.payload())
    }

    /// The cached evaluation report.
    #[must_use]
    pub fn evaluation_report(&self) -> Option<Arc<EvaluationReport>> {
        self.state.lock().cache.evaluation().map(|entry| entry.payload())
    }

    /// Missing values in the dataset as it currently stands.
    #[must_use]
    pub fn total_missing_values(&self) -> u64 {
        self.state.lock().cache.displayed_missing_total()
    }

    /// Success message for the cached clean.
    #[must_use]
    pub fn clean_message(&self) -> Option<String> {
        self.clean_summary()
            .map(|summary| messages::clean_success_message(summary.values_adjusted))
    }

    /// Status line for the cached training run.
    #[must_use]
    pub fn train_status(&self) -> Option<String> {
        self.train_metrics()
            .map(|metrics| messages::train_status_line(metrics.accuracy))
    }

    /// One line describing where the session stands.
    #[must_use]
    pub fn status_line(&self) -> String {
        self.state.lock().status_line()
    }

    /// A consistent view of the whole session.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            session_id: self.id,
            stage: state.machine.stage(),
            statuses: state.machine.statuses(),
            connection: state.connection.clone(),
            total_missing_values: state.cache.displayed_missing_total(),
            status_line: state.status_line(),
        }
    }

    /// Probes the service and records the connection state.
    ///
    /// # Errors
    ///
    /// Returns `ActionError` if the service cannot be reached or answers
    /// with an error.
    pub async fn health(&self) -> Result<HealthStatus, ActionError> {
        let result = self
            .execute(
                ActionKind::Health,
                || self.client.health(),
                |state, health: HealthStatus| {
                    state.connection = ConnectionState::Connected {
                        version: health.version.clone(),
                    };
                    health
                },
            )
            .await;

        match &result {
            Err(ActionError::Transport { .. }) => {
                self.state.lock().connection = ConnectionState::Unreachable;
            }
            Err(ActionError::Application { .. }) => {
                self.state.lock().connection = ConnectionState::Connected { version: None };
            }
            _ => {}
        }
        result
    }

    /// Uploads a dataset, replacing the current one.
    ///
    /// The file is checked locally first; a rejected file never reaches the
    /// service. Success moves the stage to `uploaded` and drops the clean
    /// and train results.
    ///
    /// # Errors
    ///
    /// Returns `ActionError` on local rejection, remote failure or a
    /// superseded completion.
    pub async fn upload(&self, file: DatasetFile) -> Result<UploadSummary, ActionError> {
        let limit = self.max_upload_bytes;
        let ticket = self.begin_validated(ActionKind::Upload, || check_upload(&file, limit))?;
        info!(
            session_id = %self.id,
            file_name = %file.file_name,
            bytes = file.len(),
            "Uploading dataset"
        );

        self.complete(
            ticket,
            || self.client.upload(file),
            |state, summary: UploadSummary| {
                state.cache.store(StagePayload::Upload(summary.clone()));
                summary
            },
        )
        .await
    }

    /// Cleans the current dataset.
    ///
    /// # Errors
    ///
    /// Returns `ActionError` if nothing was uploaded or the call fails.
    pub async fn clean(&self) -> Result<CleanSummary, ActionError> {
        self.execute(
            ActionKind::Clean,
            || self.client.clean(),
            |state, summary: CleanSummary| {
                state.cache.store(StagePayload::Clean(summary.clone()));
                summary
            },
        )
        .await
    }

    /// Trains a model with the service's default parameters.
    ///
    /// # Errors
    ///
    /// Returns `ActionError` if the data is not cleaned or the call fails.
    pub async fn train(&self) -> Result<TrainMetrics, ActionError> {
        self.execute(
            ActionKind::Train,
            || self.client.train(),
            |state, metrics: TrainMetrics| {
                state.cache.store(StagePayload::Train(metrics.clone()));
                metrics
            },
        )
        .await
    }

    /// Trains a model with explicit parameters, sent as given.
    ///
    /// Shares the train slot with [`PipelineSession::train`].
    ///
    /// # Errors
    ///
    /// Returns `ActionError` if the data is not cleaned or the call fails.
    pub async fn retrain(&self, params: &Hyperparameters) -> Result<TrainMetrics, ActionError> {
        let issues = params.issues();
        if !issues.is_empty() {
            debug!(session_id = %self.id, ?issues, "Submitting out-of-domain hyperparameters");
        }

        self.execute(
            ActionKind::Train,
            || self.client.train_with_params(params),
            |state, metrics: TrainMetrics| {
                state.cache.store(StagePayload::Train(metrics.clone()));
                metrics
            },
        )
        .await
    }

    /// Retrieves the evaluation report of the current model.
    ///
    /// # Errors
    ///
    /// Returns `ActionError` if no model is trained or the call fails.
    pub async fn fetch_metrics(&self) -> Result<EvaluationReport, ActionError> {
        self.execute(
            ActionKind::FetchMetrics,
            || self.client.metrics(),
            |state, report: EvaluationReport| {
                state.cache.store(StagePayload::Evaluation(report.clone()));
                report
            },
        )
        .await
    }

    /// Runs single-record inference.
    ///
    /// The stage guard is checked first, then every field range. Neither
    /// kind of rejection reaches the service.
    ///
    /// # Errors
    ///
    /// Returns `ActionError` on local rejection or remote failure.
    pub async fn predict(&self, input: &PredictionInput) -> Result<PredictionResult, ActionError> {
        let ticket = self.begin_validated(ActionKind::Predict, || input.validate())?;
        self.complete(ticket, || self.client.predict(input), |_, result| result)
            .await
    }

    /// Retrieves statistics for the current dataset.
    ///
    /// # Errors
    ///
    /// Returns `ActionError` if nothing was uploaded or the call fails.
    pub async fn dataset_info(&self) -> Result<DatasetInfo, ActionError> {
        self.execute(ActionKind::DataInfo, || self.client.dataset_info(), |_, info| info)
            .await
    }

    /// Compares the original and cleaned datasets.
    ///
    /// # Errors
    ///
    /// Returns `ActionError` if the data is not cleaned or the call fails.
    pub async fn compare(&self) -> Result<DatasetComparison, ActionError> {
        self.execute(ActionKind::Compare, || self.client.compare(), |_, comparison| comparison)
            .await
    }

    /// Has the service write the cleaned dataset out.
    ///
    /// # Errors
    ///
    /// Returns `ActionError` if the data is not cleaned or the call fails.
    pub async fn export(&self) -> Result<ExportReceipt, ActionError> {
        self.execute(ActionKind::Export, || self.client.export(), |_, receipt| receipt)
            .await
    }

    /// Fetches the evaluation report and dataset statistics concurrently.
    pub async fn refresh_reports(
        &self,
    ) -> (
        Result<EvaluationReport, ActionError>,
        Result<DatasetInfo, ActionError>,
    ) {
        futures::join!(self.fetch_metrics(), self.dataset_info())
    }

    /// Resets the remote session and returns to `no_data`.
    ///
    /// Every outstanding call is invalidated at dispatch. When the reset
    /// completes the local state is cleared even if the call failed.
    ///
    /// # Errors
    ///
    /// Returns `ActionError` if a reset is already outstanding or the call
    /// fails.
    pub async fn reset(&self) -> Result<String, ActionError> {
        let ticket = self.begin_validated(ActionKind::Reset, || Ok(()))?;
        let timer = SpanTimer::start(ticket.action.as_str());

        let outcome = self.client.reset().await;
        let duration_ms = timer.finish();

        let result = {
            let mut state = self.state.lock();
            let result = outcome.map_err(|error| {
                let message = messages::failure_message(ActionKind::Reset, &error);
                ActionError::from_client(ActionKind::Reset, &error, message)
            });
            state
                .machine
                .finish_reset(result.as_ref().map(|_| ()).map_err(ToString::to_string));
            state.cache.clear();
            state.last_action = Some(ActionKind::Reset);
            result
        };

        match &result {
            Ok(_) => info!(session_id = %self.id, duration_ms, "Pipeline reset"),
            Err(error) => warn!(
                session_id = %self.id,
                duration_ms,
                error = %error,
                "Reset call failed; local state cleared anyway"
            ),
        }
        self.emit(
            PipelineEvent::new(
                self.id,
                EventKind::Reset,
                ActionKind::Reset,
                ticket.generation,
                PipelineStage::NoData,
            )
            .with_detail(serde_json::json!({
                "succeeded": result.is_ok(),
                "duration_ms": duration_ms,
            })),
        );

        result
    }

    async fn execute<T, R, F, Fut, A>(
        &self,
        action: ActionKind,
        call: F,
        apply: A,
    ) -> Result<R, ActionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
        A: FnOnce(&mut SessionState, T) -> R,
    {
        let ticket = self.begin_validated(action, || Ok(()))?;
        self.complete(ticket, call, apply).await
    }

    fn begin_validated<V>(&self, action: ActionKind, validate: V) -> Result<DispatchTicket, ActionError>
    where
        V: FnOnce() -> Result<(), String>,
    {
        let (attempt, stage, generation) = {
            let mut state = self.state.lock();
            let attempt = state.try_begin(action, validate);
            (attempt, state.machine.stage(), state.machine.generation(action))
        };

        match attempt {
            Ok(ticket) => {
                debug!(
                    session_id = %self.id,
                    action = %action,
                    generation = ticket.generation,
                    stage = %stage,
                    "Action dispatched"
                );
                self.emit(PipelineEvent::new(
                    self.id,
                    EventKind::Dispatched,
                    action,
                    ticket.generation,
                    stage,
                ));
                Ok(ticket)
            }
            Err(error) => {
                info!(
                    session_id = %self.id,
                    action = %action,
                    stage = %stage,
                    class = %error.class(),
                    error = %error,
                    "Action rejected"
                );
                self.emit(
                    PipelineEvent::new(self.id, EventKind::Rejected, action, generation, stage)
                        .with_detail(serde_json::json!(error.to_dict())),
                );
                Err(error)
            }
        }
    }

    async fn complete<T, R, F, Fut, A>(
        &self,
        ticket: DispatchTicket,
        call: F,
        apply: A,
    ) -> Result<R, ActionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
        A: FnOnce(&mut SessionState, T) -> R,
    {
        let timer = SpanTimer::start(ticket.action.as_str());
        let outcome = call().await;
        let duration_ms = timer.finish();

        let (result, stage) = {
            let mut state = self.state.lock();
            let result = match outcome {
                Ok(payload) => match state.machine.transition(&ticket, Ok(())) {
                    Ok(()) => {
                        if ticket.action.is_stage_changing() {
                            state.last_action = Some(ticket.action);
                        }
                        let applied = apply(&mut *state, payload);
                        debug_assert!(state.cache.highest_tier() <= state.machine.stage());
                        Ok(applied)
                    }
                    Err(stale) => Err(stale),
                },
                Err(error) => {
                    let message = messages::failure_message(ticket.action, &error);
                    match state.machine.transition(&ticket, Err(message.clone())) {
                        Ok(()) => {
                            if ticket.action.is_stage_changing() {
                                state.last_action = Some(ticket.action);
                            }
                            Err(ActionError::from_client(ticket.action, &error, message))
                        }
                        Err(stale) => Err(stale),
                    }
                }
            };
            (result, state.machine.stage())
        };

        self.report_completion(&ticket, stage, duration_ms, result.as_ref().err());
        result
    }

    fn report_completion(
        &self,
        ticket: &DispatchTicket,
        stage: PipelineStage,
        duration_ms: f64,
        error: Option<&ActionError>,
    ) {
        let mut attributes = ActionSpanAttributes::new(ticket.action, ticket.generation)
            .with_session_id(self.id.to_string())
            .with_stage(stage)
            .with_duration_ms(duration_ms);

        let event = PipelineEvent::new(self.id, EventKind::Succeeded, ticket.action, ticket.generation, stage);
        let event = match error {
            None => {
                attributes = attributes.with_outcome("succeeded");
                info!(
                    session_id = %self.id,
                    action = %ticket.action,
                    generation = ticket.generation,
                    stage = %stage,
                    duration_ms,
                    "Action succeeded"
                );
                event.with_detail(serde_json::json!({ "duration_ms": duration_ms }))
            }
            Some(stale @ ActionError::StaleResponse { .. }) => {
                attributes = attributes.with_outcome("stale");
                debug!(
                    session_id = %self.id,
                    action = %ticket.action,
                    generation = ticket.generation,
                    "Discarded stale response"
                );
                PipelineEvent {
                    kind: EventKind::Stale,
                    ..event
                }
                .with_detail(serde_json::json!(stale.to_dict()))
            }
            Some(error) => {
                attributes = attributes.with_outcome("failed").with_error(error.to_string());
                warn!(
                    session_id = %self.id,
                    action = %ticket.action,
                    generation = ticket.generation,
                    class = %error.class(),
                    duration_ms,
                    error = %error,
                    "Action failed"
                );
                PipelineEvent {
                    kind: EventKind::Failed,
                    ..event
                }
                .with_detail(serde_json::json!(error.to_dict()))
            }
        };

        debug!(attributes = ?attributes.to_attributes(), "Action span closed");
        self.emit(event);
    }

    fn emit(&self, event: PipelineEvent) {
        self.sink.try_emit(&event);
    }
}

/// Checks a file before it is uploaded.
fn check_upload(file: &DatasetFile, max_bytes: usize) -> Result<(), String> {
    if file.file_name.trim().is_empty() {
        return Err("Select a CSV file to upload.".to_string());
    }
    if !file.has_csv_extension() {
        return Err(format!(
            "Only .csv files are accepted (got '{}').",
            file.file_name
        ));
    }
    if file.is_empty() {
        return Err(format!("'{}' is empty.", file.file_name));
    }
    if file.len() > max_bytes {
        return Err(format!(
            "'{}' is {} bytes; the limit is {max_bytes} bytes.",
            file.file_name,
            file.len()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_upload() {
        assert!(check_upload(&DatasetFile::new("students.csv", "a,b\n1,2\n"), 1024).is_ok());

        let err = check_upload(&DatasetFile::new("", "a"), 1024).unwrap_err();
        assert!(err.contains("Select a CSV file"));

        let err = check_upload(&DatasetFile::new("students.xlsx", "a"), 1024).unwrap_err();
        assert!(err.contains(".csv"));

        let err = check_upload(&DatasetFile::new("students.csv", ""), 1024).unwrap_err();
        assert!(err.contains("empty"));

        let err = check_upload(&DatasetFile::new("students.csv", vec![b'a'; 2048]), 1024).unwrap_err();
        assert!(err.contains("limit is 1024 bytes"));
    }

    #[test]
    fn test_connection_state_serialization() {
        let json = serde_json::to_value(ConnectionState::Connected {
            version: Some("1.0.0".into()),
        })
        .unwrap();
        assert_eq!(json["state"], "connected");
        assert_eq!(json["version"], "1.0.0");
    }
}
