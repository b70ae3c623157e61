//! Remote pipeline client.
//!
//! This module provides:
//! - The [`PipelineClient`] protocol trait, one method per remote action
//! - Response envelopes and error-body decoding
//! - An HTTP implementation (feature `http`)

#[cfg(feature = "http")]
mod http;
mod protocol;
pub mod wire;

#[cfg(feature = "http")]
pub use http::HttpPipelineClient;
pub use protocol::{DatasetFile, HealthStatus, PipelineClient};
