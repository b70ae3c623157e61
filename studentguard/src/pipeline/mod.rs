//! Pipeline orchestration.
//!
//! This module provides:
//! - The stage machine with its guards and generation counters
//! - The result cache
//! - The session that drives actions against a client
//! - Prediction and retrain sessions layered on a shared session

mod cache;
mod machine;
mod memory;
mod prediction;
mod retrain;
mod session;


pub use cache::{CachedEntry, ResultCache, StagePayload};
pub use machine::{DispatchTicket, StageMachine};
pub use prediction::PredictionSession;
pub use retrain::RetrainSession;
pub use session::{ConnectionState, PipelineSession, SessionSnapshot, DEFAULT_MAX_UPLOAD_BYTES};
