// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use ragchat_transport::StreamEnd;

use crate::Message;

/// Result of handing a query to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Empty or whitespace-only input; nothing changed.
    Ignored,
    /// The query was logged and its stream opened.
    Started,
    /// Another answer is streaming; the query waits at `position` (1-based).
    Queued { position: usize },
    /// Another answer is streaming and the busy policy drops new queries.
    Rejected,
}

/// Events emitted by the controller while a query runs.
/// Front ends (interactive session, one-shot `ask`) subscribe to these to
/// drive their output.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A query was logged and its stream opened
    Started(String),
    /// A query is waiting for the current answer to finish
    Queued { query: String, position: usize },
    /// A query was dropped because another answer is streaming
    Rejected(String),
    /// A fragment arrived; `buffer` is the accumulated answer so far
    Fragment { fragment: String, buffer: String },
    /// The stream ended and the buffer became `message`
    Finalized { message: Message, end: StreamEnd },
}

impl SessionEvent {
    /// The event describing `submission` of `query`, if it is worth showing.
    pub fn for_submission(query: &str, submission: Submission) -> Option<Self> {
        match submission {
            Submission::Ignored => None,
            Submission::Started => Some(SessionEvent::Started(query.to_string())),
            Submission::Queued { position } => {
                Some(SessionEvent::Queued { query: query.to_string(), position })
            }
            Submission::Rejected => Some(SessionEvent::Rejected(query.to_string())),
        }
    }
}
