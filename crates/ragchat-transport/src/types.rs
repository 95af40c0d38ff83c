// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

/// Why an answer stream stopped.
///
/// The query endpoint has no explicit "done" event, so consumers usually
/// treat both variants as the end of the answer.  The distinction is kept
/// for logging and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum StreamEnd {
    /// The server closed the stream after delivering its events.
    Closed,
    /// Connecting, the HTTP status, or reading the body failed.
    Failed(String),
}

impl StreamEnd {
    pub fn is_failure(&self) -> bool {
        matches!(self, StreamEnd::Failed(_))
    }
}

impl std::fmt::Display for StreamEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamEnd::Closed => write!(f, "closed"),
            StreamEnd::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// One item delivered by an answer stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The data payload of one server-sent event.
    Fragment(String),
    /// Terminal signal; delivered exactly once, always last.
    Ended(StreamEnd),
}

impl StreamOutcome {
    pub fn fragment(text: impl Into<String>) -> Self {
        Self::Fragment(text.into())
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Ended(StreamEnd::Failed(reason.into()))
    }

    pub fn is_end(&self) -> bool {
        matches!(self, StreamOutcome::Ended(_))
    }
}
