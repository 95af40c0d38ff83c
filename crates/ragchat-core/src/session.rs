// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use ragchat_input::HistoryStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One entry in the message log.  Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self { text: text.into(), sender: Sender::User }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self { text: text.into(), sender: Sender::Bot }
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }
}

/// Lifecycle of the query currently owned by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// No query in flight.
    Idle,
    /// The user message is logged; the stream is being opened.
    Submitted,
    /// The stream is open and fragments accumulate in the buffer.
    Streaming,
    /// The buffer has been turned into a bot message.
    Finalized,
}

impl QueryState {
    pub fn can_transition_to(self, next: QueryState) -> bool {
        use QueryState::*;
        matches!(
            (self, next),
            (Idle, Submitted) | (Submitted, Streaming) | (Streaming, Finalized) | (Finalized, Idle)
        )
    }
}

impl std::fmt::Display for QueryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QueryState::Idle => "idle",
            QueryState::Submitted => "submitted",
            QueryState::Streaming => "streaming",
            QueryState::Finalized => "finalized",
        };
        f.write_str(s)
    }
}

// ─── History ─────────────────────────────────────────────────────────────────

/// Query history with write-through persistence.
pub struct History {
    entries: Vec<String>,
    store: Box<dyn HistoryStore>,
}

impl History {
    /// Read the stored history.  An unreadable store starts an empty history.
    pub fn load(store: Box<dyn HistoryStore>) -> Self {
        let entries = store.load().unwrap_or_else(|e| {
            warn!(error = %e, "could not load query history; starting empty");
            Vec::new()
        });
        Self { entries, store }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append `entry` and save.  A failed save is logged and the in-memory
    /// history keeps the entry.
    pub fn append(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
        self.flush();
    }

    /// Write the full history to the store.
    pub fn flush(&self) {
        if let Err(e) = self.store.save(&self.entries) {
            warn!(error = %e, entries = self.entries.len(), "could not save query history");
        }
    }
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History").field("entries", &self.entries).finish_non_exhaustive()
    }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// State owned by one interactive session: the message log, the streaming
/// buffer, the query lifecycle and the persisted history.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    messages: Vec<Message>,
    buffer: String,
    state: QueryState,
    history: History,
}

impl Session {
    /// Start a session, loading history from `store`.
    pub fn init(store: Box<dyn HistoryStore>) -> Self {
        let history = History::load(store);
        let id = Uuid::new_v4().to_string();
        info!(session = %id, history = history.len(), "session started");
        Self { id, messages: Vec::new(), buffer: String::new(), state: QueryState::Idle, history }
    }

    /// End the session.  History is written one last time; the message log
    /// is returned to the caller and otherwise discarded.
    pub fn teardown(self) -> Vec<Message> {
        self.history.flush();
        info!(session = %self.id, messages = self.messages.len(), "session ended");
        self.messages
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub(crate) fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub(crate) fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut String {
        &mut self.buffer
    }

    /// Move to `next` if the transition is legal.  Returns `false` and leaves
    /// the state unchanged otherwise.
    pub(crate) fn transition(&mut self, next: QueryState) -> bool {
        if !self.state.can_transition_to(next) {
            warn!(from = %self.state, to = %next, "refusing illegal query state transition");
            return false;
        }
        debug!(from = %self.state, to = %next, "query state");
        self.state = next;
        true
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
