// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::VecDeque;
use std::sync::Arc;

use ragchat_config::BusyPolicy;
use ragchat_input::QueryQueue;
use ragchat_transport::{QueryTransport, StreamEnd, StreamHandle, StreamOutcome};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    events::{Submission, SessionEvent},
    session::{History, Message, QueryState, Session},
};

/// Drives one query at a time through the transport and turns the streamed
/// fragments into bot messages.
pub struct QueryController {
    session: Session,
    transport: Arc<dyn QueryTransport>,
    policy: BusyPolicy,
    queue: QueryQueue,
    active: Option<StreamHandle>,
    /// Events produced outside `next_event`, delivered before stream events.
    outbox: VecDeque<SessionEvent>,
}

impl QueryController {
    pub fn new(session: Session, transport: Arc<dyn QueryTransport>, policy: BusyPolicy) -> Self {
        Self {
            session,
            transport,
            policy,
            queue: QueryQueue::new(),
            active: None,
            outbox: VecDeque::new(),
        }
    }

    pub fn state(&self) -> QueryState {
        self.session.state()
    }

    pub fn messages(&self) -> &[Message] {
        self.session.messages()
    }

    pub fn buffer(&self) -> &str {
        self.session.buffer()
    }

    pub fn history(&self) -> &History {
        self.session.history()
    }

    /// Number of queries waiting for the current answer.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// `true` while a stream is open or events are waiting to be delivered.
    pub fn is_active(&self) -> bool {
        self.active.is_some() || !self.outbox.is_empty()
    }

    /// Hand a query to the controller.
    ///
    /// Blank input is ignored.  While idle the query starts immediately;
    /// otherwise the busy policy decides whether it waits or is dropped.
    /// Every accepted query is appended to history at once, so history keeps
    /// submission order even for queries that never get to run.
    pub fn submit_query(&mut self, text: &str) -> Submission {
        if text.trim().is_empty() {
            return Submission::Ignored;
        }
        if self.session.state() != QueryState::Idle {
            return match self.policy {
                BusyPolicy::Queue => {
                    self.session.history_mut().append(text.to_string());
                    let position = self.queue.push(text);
                    info!(position, "answer in progress; query queued");
                    Submission::Queued { position }
                }
                BusyPolicy::Reject => {
                    info!(state = %self.session.state(), "answer in progress; query rejected");
                    Submission::Rejected
                }
            };
        }
        self.session.history_mut().append(text.to_string());
        self.start(text.to_string());
        Submission::Started
    }

    /// Re-submit history entry `index`.  The entry is appended to history
    /// again, exactly like typing it.
    pub fn replay(&mut self, index: usize) -> Submission {
        let Some(entry) = self.session.history().get(index).map(str::to_owned) else {
            warn!(index, entries = self.session.history().len(), "no history entry to replay");
            return Submission::Ignored;
        };
        debug!(index, "replaying history entry");
        self.submit_query(&entry)
    }

    fn start(&mut self, text: String) {
        if !self.session.transition(QueryState::Submitted) {
            return;
        }
        self.session.push(Message::user(text.clone()));

        let handle = self.transport.open_stream(&text);
        debug!(transport = self.transport.name(), "stream opened");
        self.active = Some(handle);
        self.session.transition(QueryState::Streaming);
    }

    /// Append one fragment to the buffer.  Returns the updated buffer, or
    /// `None` if no answer is streaming and the fragment was dropped.
    pub fn on_fragment(&mut self, fragment: &str) -> Option<&str> {
        if self.session.state() != QueryState::Streaming {
            warn!(state = %self.session.state(), "dropping fragment outside of a stream");
            return None;
        }
        let buffer = self.session.buffer_mut();
        buffer.push_str(fragment);
        buffer.push(' ');
        Some(self.session.buffer())
    }

    /// Finalize the streaming answer into a bot message.
    ///
    /// A clean close and a transport failure are handled the same way; the
    /// partial answer is kept.  Starts the next queued query, if any.
    pub fn on_stream_end(&mut self, end: &StreamEnd) -> Option<Message> {
        if self.session.state() != QueryState::Streaming {
            warn!(state = %self.session.state(), %end, "dropping stream end outside of a stream");
            return None;
        }
        if let Some(mut handle) = self.active.take() {
            handle.close();
        }

        let text = std::mem::take(self.session.buffer_mut()).trim().to_string();
        let message = Message::bot(text);
        self.session.push(message.clone());
        self.session.transition(QueryState::Finalized);
        match end {
            StreamEnd::Closed => info!(chars = message.text.len(), "answer finalized"),
            StreamEnd::Failed(reason) => {
                warn!(%reason, chars = message.text.len(), "answer stream failed; keeping partial answer")
            }
        }
        self.session.transition(QueryState::Idle);

        if let Some(next) = self.queue.pop() {
            debug!(remaining = self.queue.len(), "starting queued query");
            self.start(next.clone());
            self.outbox.push_back(SessionEvent::Started(next));
        }
        Some(message)
    }

    /// Wait for the next event of the running query.
    ///
    /// Returns `None` when no stream is open and nothing is pending.
    /// Cancel-safe: dropping the future before it completes loses nothing.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            if let Some(event) = self.outbox.pop_front() {
                return Some(event);
            }
            let outcome = self.active.as_mut()?.next().await;
            let end = match outcome {
                Some(StreamOutcome::Fragment(fragment)) => match self.on_fragment(&fragment) {
                    Some(buffer) => {
                        let buffer = buffer.to_string();
                        return Some(SessionEvent::Fragment { fragment, buffer });
                    }
                    None => continue,
                },
                Some(StreamOutcome::Ended(end)) => end,
                None => StreamEnd::Closed,
            };
            match self.on_stream_end(&end) {
                Some(message) => return Some(SessionEvent::Finalized { message, end }),
                None => self.active = None,
            }
        }
    }

    /// Run until the current query and every queued query have finalized,
    /// forwarding events to `tx`.  Stops early if the receiver is dropped.
    pub async fn drive(&mut self, tx: mpsc::Sender<SessionEvent>) {
        while let Some(event) = self.next_event().await {
            if tx.send(event).await.is_err() {
                debug!("event receiver dropped; stopping");
                break;
            }
        }
    }

    /// Close any open stream, drop queued queries and end the session.
    /// Queued queries are already in history.  Returns the final message log.
    pub fn teardown(mut self) -> Vec<Message> {
        if let Some(mut handle) = self.active.take() {
            handle.close();
        }
        let dropped = self.queue.clear();
        if dropped > 0 {
            info!(dropped, "discarding queued queries");
        }
        self.session.teardown()
    }
}
