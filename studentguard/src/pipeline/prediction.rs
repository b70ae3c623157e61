//! Single-record prediction on top of a pipeline session.

use parking_lot::Mutex;
use std::sync::Arc;

use super::memory::ResetScoped;
use super::session::PipelineSession;
use crate::core::{ActionKind, ActionStatus};
use crate::errors::ActionError;
use crate::models::{PredictionInput, PredictionResult, RiskAssessment};

/// Prediction form state: the shared session plus the last result shown.
///
/// The last result lives here rather than in the result cache; it never
/// affects the pipeline stage or cached pipeline results. A session reset
/// hides it.
#[derive(Debug)]
pub struct PredictionSession {
    session: Arc<PipelineSession>,
    last: Mutex<ResetScoped<PredictionResult>>,
}

impl PredictionSession {
    /// Creates a prediction session.
    #[must_use]
    pub fn new(session: Arc<PipelineSession>) -> Self {
        Self {
            session,
            last: Mutex::new(ResetScoped::new()),
        }
    }

    /// Returns true if a model is available.
    #[must_use]
    pub fn can_predict(&self) -> bool {
        self.session.can_run(ActionKind::Predict)
    }

    /// The predict slot.
    #[must_use]
    pub fn status(&self) -> ActionStatus {
        self.session.status(ActionKind::Predict)
    }

    /// Submits one record.
    ///
    /// A failure hides the previous result; rejections caused by an
    /// outstanding call or a superseded response leave it in place.
    ///
    /// # Errors
    ///
    /// Returns `ActionError` on local rejection or remote failure.
    pub async fn predict(&self, input: &PredictionInput) -> Result<PredictionResult, ActionError> {
        let epoch = self.epoch();
        match self.session.predict(input).await {
            Ok(result) => {
                self.last.lock().set(epoch, result.clone());
                Ok(result)
            }
            Err(error) => {
                if !matches!(
                    error,
                    ActionError::AlreadyInFlight { .. } | ActionError::StaleResponse { .. }
                ) {
                    self.last.lock().clear();
                }
                Err(error)
            }
        }
    }

    /// The last successful prediction.
    #[must_use]
    pub fn last_result(&self) -> Option<PredictionResult> {
        let epoch = self.epoch();
        self.last.lock().get(epoch).cloned()
    }

    /// Display assessment of the last prediction.
    #[must_use]
    pub fn assessment(&self) -> Option<RiskAssessment> {
        let epoch = self.epoch();
        self.last.lock().get(epoch).map(PredictionResult::assessment)
    }

    /// Forgets the last prediction.
    pub fn clear(&self) {
        self.last.lock().clear();
    }

    fn epoch(&self) -> u64 {
        self.session.generation(ActionKind::Reset)
    }
}
