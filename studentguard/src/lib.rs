//! # StudentGuard
//!
//! Client-side orchestration core for the StudentGuard student-risk model
//! pipeline.
//!
//! A remote service holds one dataset and one trained model per session.
//! This crate mirrors that session locally and provides:
//!
//! - **Stage machine**: `no_data → uploaded → cleaned → trained`, with every
//!   action gated on the stage it requires
//! - **Per-action status**: idle, in flight, succeeded or failed, with
//!   superseded completions discarded
//! - **Result cache**: the latest upload, clean, train and evaluation
//!   results, invalidated as earlier stages are redone
//! - **Typed client**: an HTTP implementation of the service protocol and a
//!   trait seam for substitutes
//! - **Event-driven observability**: lifecycle events for every dispatch
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use studentguard::prelude::*;
//!
//! let session = PipelineSession::from_config(ClientConfig::from_env()?)?;
//! session.upload(DatasetFile::from_path("students.csv").await?).await?;
//! session.clean().await?;
//! let metrics = session.train().await?;
//! println!("{}", format_metric(Some(metrics.accuracy)));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod client;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod messages;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "http")]
    pub use crate::client::HttpPipelineClient;
    pub use crate::client::{DatasetFile, HealthStatus, PipelineClient};
    pub use crate::config::ClientConfig;
    pub use crate::core::{ActionKind, ActionStatus, PipelineStage};
    pub use crate::errors::{ActionError, ClientError, ConfigError, ErrorClass};
    pub use crate::events::{
        CollectingEventSink, EventKind, EventSink, LoggingEventSink, NoOpEventSink,
        PipelineEvent,
    };
    pub use crate::messages::format_metric;
    pub use crate::models::{
        CleanSummary, DatasetComparison, DatasetInfo, EvaluationReport, ExportReceipt,
        Hyperparameters, PredictionInput, PredictionResult, RiskAssessment, TrainMetrics,
        UploadSummary,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{
        ConnectionState, PipelineSession, PredictionSession, RetrainSession, SessionSnapshot,
    };
}
