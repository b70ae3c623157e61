//! Payload types exchanged with the remote pipeline.
//!
//! This module contains:
//! - Dataset summaries (upload, clean, info, comparison, export)
//! - Training parameters, metrics and evaluation reports
//! - Prediction input, result and risk assessment

mod dataset;
mod prediction;
mod training;

pub use dataset::{
    CleanSummary, CleaningCounts, DatasetChanges, DatasetComparison, DatasetInfo,
    DatasetSnapshot, DatasetTotals, ExportReceipt, PreviewRow, UploadSummary,
};
pub use prediction::{
    FieldRange, FieldViolation, PredictionInput, PredictionResult, RiskAssessment, RiskLevel,
    PREDICTION_FIELD_RANGES,
};
pub use training::{
    ConfusionMatrix, EvaluationReport, Hyperparameters, Solver, TrainMetrics, DEFAULT_C,
    DEFAULT_MAX_ITER, DEFAULT_SOLVER,
};
