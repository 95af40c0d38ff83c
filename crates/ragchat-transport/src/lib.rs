// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod types;
mod transport;
mod sse;
mod mock;
pub mod upload;

use std::sync::Arc;

pub use types::*;
pub use transport::{OutcomeStream, QueryTransport, StreamHandle};
pub use sse::{SseDecoder, SseTransport};
pub use mock::ScriptedTransport;
pub use upload::{UploadClient, UploadError};

use ragchat_config::ServerConfig;

/// Construct the answer-stream transport for the configured server.
pub fn from_config(cfg: &ServerConfig) -> anyhow::Result<Arc<dyn QueryTransport>> {
    Ok(Arc::new(SseTransport::new(cfg)?))
}
