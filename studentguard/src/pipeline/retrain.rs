//! Retraining with user-supplied hyperparameters.

use parking_lot::Mutex;
use std::sync::Arc;

use super::memory::ResetScoped;
use super::session::PipelineSession;
use crate::core::ActionKind;
use crate::errors::ActionError;
use crate::models::{Hyperparameters, TrainMetrics};

/// Holds the working hyperparameters of the tuning form.
///
/// After every successful retrain the working copy is replaced by the
/// parameters the service reports it actually used. A session reset
/// returns the working copy to its initial values and forgets the last
/// metrics.
#[derive(Debug)]
pub struct RetrainSession {
    session: Arc<PipelineSession>,
    initial: Hyperparameters,
    working: Mutex<ResetScoped<Hyperparameters>>,
    last_metrics: Mutex<ResetScoped<TrainMetrics>>,
}

impl RetrainSession {
    /// Creates a retrain session starting from the default parameters.
    #[must_use]
    pub fn new(session: Arc<PipelineSession>) -> Self {
        Self::with_params(session, Hyperparameters::default())
    }

    /// Creates a retrain session with an initial working copy.
    #[must_use]
    pub fn with_params(session: Arc<PipelineSession>, params: Hyperparameters) -> Self {
        Self {
            session,
            initial: params,
            working: Mutex::new(ResetScoped::new()),
            last_metrics: Mutex::new(ResetScoped::new()),
        }
    }

    /// The working copy.
    #[must_use]
    pub fn params(&self) -> Hyperparameters {
        let epoch = self.epoch();
        self.working
            .lock()
            .get(epoch)
            .cloned()
            .unwrap_or_else(|| self.initial.clone())
    }

    /// Replaces the working copy.
    pub fn set_params(&self, params: Hyperparameters) {
        let epoch = self.epoch();
        self.working.lock().set(epoch, params);
    }

    /// Edits the working copy.
    pub fn update<F>(&self, edit: F)
    where
        F: FnOnce(&mut Hyperparameters),
    {
        let mut params = self.params();
        edit(&mut params);
        self.set_params(params);
    }

    /// Advisory problems with the working copy.
    #[must_use]
    pub fn issues(&self) -> Vec<String> {
        self.params().issues()
    }

    /// Returns true if the data is cleaned.
    #[must_use]
    pub fn can_retrain(&self) -> bool {
        self.session.can_run(ActionKind::Train)
    }

    /// Metrics of the last retrain issued through this session.
    #[must_use]
    pub fn last_metrics(&self) -> Option<TrainMetrics> {
        let epoch = self.epoch();
        self.last_metrics.lock().get(epoch).cloned()
    }

    /// Retrains with the working copy, sent verbatim, and adopts the
    /// parameters echoed back.
    ///
    /// When the service omits the echo the submitted values are kept.
    ///
    /// # Errors
    ///
    /// Returns `ActionError` if the data is not cleaned or the call fails;
    /// the working copy is then left unchanged.
    pub async fn retrain(&self) -> Result<TrainMetrics, ActionError> {
        let epoch = self.epoch();
        let submitted = self.params();
        let metrics = self.session.retrain(&submitted).await?;

        let effective = metrics.hyperparams_used.clone().unwrap_or(submitted);
        self.working.lock().set(epoch, effective);
        self.last_metrics.lock().set(epoch, metrics.clone());
        Ok(metrics)
    }

    fn epoch(&self) -> u64 {
        self.session.generation(ActionKind::Reset)
    }
}
