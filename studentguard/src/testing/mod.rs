//! Testing utilities for pipeline sessions.
//!
//! This module provides:
//! - A scripted [`PipelineClient`](crate::client::PipelineClient) that records calls
//! - Canned service payloads

pub mod fixtures;
mod mocks;

pub use mocks::{RecordedCall, ScriptedPipelineClient};
