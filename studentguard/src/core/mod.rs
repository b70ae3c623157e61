//! Core domain types for the pipeline orchestration:
//! - Pipeline stages and action kinds, with the stage-guard table
//! - Per-action status slots

mod stage;
mod status;

pub use stage::{ActionKind, PipelineStage};
pub use status::ActionStatus;
