//! Result cache for completed pipeline stages.
//!
//! One slot per tier. Payloads are held behind `Arc` so a stored value is
//! swapped in whole and readers keep whatever snapshot they cloned.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::core::PipelineStage;
use crate::models::{CleanSummary, EvaluationReport, TrainMetrics, UploadSummary};

/// A cached payload and when it was stored.
#[derive(Debug)]
pub struct CachedEntry<T> {
    payload: Arc<T>,
    stored_at: DateTime<Utc>,
}

impl<T> CachedEntry<T> {
    fn new(payload: T) -> Self {
        Self {
            payload: Arc::new(payload),
            stored_at: Utc::now(),
        }
    }

    /// A shared handle to the payload.
    #[must_use]
    pub fn payload(&self) -> Arc<T> {
        Arc::clone(&self.payload)
    }

    /// When the payload was stored.
    #[must_use]
    pub fn stored_at(&self) -> DateTime<Utc> {
        self.stored_at
    }
}

impl<T> Clone for CachedEntry<T> {
    fn clone(&self) -> Self {
        Self {
            payload: Arc::clone(&self.payload),
            stored_at: self.stored_at,
        }
    }
}

/// A payload produced by a stage-changing or evaluation action.
#[derive(Debug, Clone)]
pub enum StagePayload {
    /// Upload summary; `uploaded` tier.
    Upload(UploadSummary),
    /// Clean summary; `cleaned` tier.
    Clean(CleanSummary),
    /// Training metrics; `trained` tier.
    Train(TrainMetrics),
    /// Evaluation report; `trained` tier.
    Evaluation(EvaluationReport),
}

impl StagePayload {
    /// The tier the payload belongs to.
    #[must_use]
    pub fn tier(&self) -> PipelineStage {
        match self {
            Self::Upload(_) => PipelineStage::Uploaded,
            Self::Clean(_) => PipelineStage::Cleaned,
            Self::Train(_) | Self::Evaluation(_) => PipelineStage::Trained,
        }
    }
}

/// The last payload of each completed stage.
#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    upload: Option<CachedEntry<UploadSummary>>,
    clean: Option<CachedEntry<CleanSummary>>,
    train: Option<CachedEntry<TrainMetrics>>,
    evaluation: Option<CachedEntry<EvaluationReport>>,
}

impl ResultCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a payload, dropping everything that depended on the
    /// previous one.
    ///
    /// A new upload clears the clean, train and evaluation slots; a new
    /// clean clears train and evaluation; a new train clears evaluation.
    pub fn store(&mut self, payload: StagePayload) {
        match payload {
            StagePayload::Upload(summary) => {
                self.invalidate(PipelineStage::Cleaned);
                self.upload = Some(CachedEntry::new(summary));
            }
            StagePayload::Clean(summary) => {
                self.invalidate(PipelineStage::Trained);
                self.clean = Some(CachedEntry::new(summary));
            }
            StagePayload::Train(metrics) => {
                self.evaluation = None;
                self.train = Some(CachedEntry::new(metrics));
            }
            StagePayload::Evaluation(report) => {
                self.evaluation = Some(CachedEntry::new(report));
            }
        }
    }

    /// Clears every tier at or above `from`.
    pub fn invalidate(&mut self, from: PipelineStage) {
        if from <= PipelineStage::Trained {
            self.train = None;
            self.evaluation = None;
        }
        if from <= PipelineStage::Cleaned {
            self.clean = None;
        }
        if from <= PipelineStage::Uploaded {
            self.upload = None;
        }
    }

    /// Clears every tier.
    pub fn clear(&mut self) {
        self.invalidate(PipelineStage::NoData);
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upload.is_none()
            && self.clean.is_none()
            && self.train.is_none()
            && self.evaluation.is_none()
    }

    /// The highest tier holding a payload.
    #[must_use]
    pub fn highest_tier(&self) -> PipelineStage {
        if self.train.is_some() || self.evaluation.is_some() {
            PipelineStage::Trained
        } else if self.clean.is_some() {
            PipelineStage::Cleaned
        } else if self.upload.is_some() {
            PipelineStage::Uploaded
        } else {
            PipelineStage::NoData
        }
    }

    /// The cached upload summary.
    #[must_use]
    pub fn upload(&self) -> Option<&CachedEntry<UploadSummary>> {
        self.upload.as_ref()
    }

    /// The cached clean summary.
    #[must_use]
    pub fn clean(&self) -> Option<&CachedEntry<CleanSummary>> {
        self.clean.as_ref()
    }

    /// The cached training metrics.
    #[must_use]
    pub fn train(&self) -> Option<&CachedEntry<TrainMetrics>> {
        self.train.as_ref()
    }

    /// The cached evaluation report.
    #[must_use]
    pub fn evaluation(&self) -> Option<&CachedEntry<EvaluationReport>> {
        self.evaluation.as_ref()
    }

    /// Missing values in the dataset as it currently stands.
    ///
    /// Summed from the cleaned snapshot when there is one, else from the
    /// upload; zero when nothing is cached.
    #[must_use]
    pub fn displayed_missing_total(&self) -> u64 {
        if let Some(clean) = &self.clean {
            return clean.payload.remaining_missing_values();
        }
        self.upload
            .as_ref()
            .map_or(0, |upload| upload.payload.total_missing_values())
    }
}
