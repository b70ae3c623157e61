//! Pipeline stages and the actions that move between them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How far the remote pipeline session has progressed.
///
/// Variants are declared in pipeline order, so `Ord` compares progress.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Nothing has been uploaded yet, or the session was reset.
    #[default]
    NoData,
    /// A dataset has been uploaded.
    Uploaded,
    /// The uploaded dataset has been cleaned.
    Cleaned,
    /// A model has been trained on the cleaned dataset.
    Trained,
}

impl PipelineStage {
    /// All stages in pipeline order.
    pub const ALL: [Self; 4] = [Self::NoData, Self::Uploaded, Self::Cleaned, Self::Trained];

    /// Returns the stage name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoData => "no_data",
            Self::Uploaded => "uploaded",
            Self::Cleaned => "cleaned",
            Self::Trained => "trained",
        }
    }

    /// Returns true if this stage is at least `required`.
    #[must_use]
    pub fn satisfies(&self, required: Self) -> bool {
        *self >= required
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-initiated operation against the remote pipeline.
///
/// Each kind owns one status slot. Train-with-parameters shares the
/// [`ActionKind::Train`] slot because both replace the same model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Probe the service.
    Health,
    /// Upload a dataset file.
    Upload,
    /// Clean the uploaded dataset.
    Clean,
    /// Train (or retrain with parameters).
    Train,
    /// Single-record inference.
    Predict,
    /// Retrieve evaluation metrics and the confusion matrix.
    FetchMetrics,
    /// Retrieve dataset statistics.
    DataInfo,
    /// Compare the original and cleaned datasets.
    Compare,
    /// Export the cleaned dataset on the service side.
    Export,
    /// Reset the remote session.
    Reset,
}

impl ActionKind {
    /// Every action kind.
    pub const ALL: [Self; 10] = [
        Self::Health,
        Self::Upload,
        Self::Clean,
        Self::Train,
        Self::Predict,
        Self::FetchMetrics,
        Self::DataInfo,
        Self::Compare,
        Self::Export,
        Self::Reset,
    ];

    /// Returns the action name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Upload => "upload",
            Self::Clean => "clean",
            Self::Train => "train",
            Self::Predict => "predict",
            Self::FetchMetrics => "fetch_metrics",
            Self::DataInfo => "data_info",
            Self::Compare => "compare",
            Self::Export => "export",
            Self::Reset => "reset",
        }
    }

    /// The minimum stage the pipeline must have reached before dispatch.
    #[must_use]
    pub const fn required_stage(&self) -> PipelineStage {
        match self {
            Self::Health | Self::Upload | Self::Reset => PipelineStage::NoData,
            Self::Clean | Self::DataInfo => PipelineStage::Uploaded,
            Self::Train | Self::Compare | Self::Export => PipelineStage::Cleaned,
            Self::Predict | Self::FetchMetrics => PipelineStage::Trained,
        }
    }

    /// The stage a successful completion targets.
    ///
    /// `None` means the stage is left unchanged.
    #[must_use]
    pub const fn advances_to(&self) -> Option<PipelineStage> {
        match self {
            Self::Upload => Some(PipelineStage::Uploaded),
            Self::Clean => Some(PipelineStage::Cleaned),
            Self::Train => Some(PipelineStage::Trained),
            Self::Reset => Some(PipelineStage::NoData),
            Self::Health
            | Self::Predict
            | Self::FetchMetrics
            | Self::DataInfo
            | Self::Compare
            | Self::Export => None,
        }
    }

    /// The stage after a successful completion, starting from `current`.
    ///
    /// A re-clean never lowers the stage: the service keeps its trained
    /// model when the data is cleaned again.
    #[must_use]
    pub fn stage_after(&self, current: PipelineStage) -> PipelineStage {
        match (self, self.advances_to()) {
            (Self::Clean, Some(target)) => current.max(target),
            (_, Some(target)) => target,
            (_, None) => current,
        }
    }

    /// Returns true if a successful `producer` makes an outstanding call of
    /// this action obsolete.
    ///
    /// An upload replaces the dataset every other data action reads. A
    /// clean replaces the data that training, comparison and export read.
    /// A train replaces the model the evaluation report describes.
    #[must_use]
    pub const fn is_superseded_by(&self, producer: Self) -> bool {
        match producer {
            Self::Upload => !matches!(self, Self::Health | Self::Upload | Self::Reset),
            Self::Clean => matches!(self, Self::Train | Self::Compare | Self::Export),
            Self::Train => matches!(self, Self::FetchMetrics),
            _ => false,
        }
    }

    /// Returns true if a success changes the pipeline stage.
    #[must_use]
    pub const fn is_stage_changing(&self) -> bool {
        self.advances_to().is_some()
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
