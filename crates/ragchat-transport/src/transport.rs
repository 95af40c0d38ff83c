// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::pin::Pin;

use futures::{Stream, StreamExt};
use tracing::debug;

use crate::{StreamEnd, StreamOutcome};

pub type OutcomeStream = Pin<Box<dyn Stream<Item = StreamOutcome> + Send>>;

/// Opens one answer stream per query.
pub trait QueryTransport: Send + Sync {
    /// Human-readable transport name for logs.
    fn name(&self) -> &str;

    /// Open a stream for `query`.
    ///
    /// Never fails up front: connection problems are reported through the
    /// returned handle as `StreamOutcome::Ended(StreamEnd::Failed(..))`, so
    /// every opened stream produces exactly one terminal signal.
    fn open_stream(&self, query: &str) -> StreamHandle;
}

/// An open answer stream.
///
/// Yields fragments in arrival order followed by exactly one
/// [`StreamOutcome::Ended`].  The underlying connection is released when the
/// terminal outcome is yielded; [`StreamHandle::close`] after that is a no-op.
pub struct StreamHandle {
    query: String,
    inner: Option<OutcomeStream>,
    fragments: usize,
}

impl StreamHandle {
    pub fn new(query: impl Into<String>, stream: OutcomeStream) -> Self {
        Self { query: query.into(), inner: Some(stream), fragments: 0 }
    }

    /// Number of fragments delivered so far.
    pub fn fragments_delivered(&self) -> usize {
        self.fragments
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Wait for the next outcome.
    ///
    /// Returns `None` once the terminal outcome has been delivered or the
    /// handle was closed.  A source that finishes without an explicit end
    /// yields a synthesized `Ended(Closed)`.  Cancel-safe.
    pub async fn next(&mut self) -> Option<StreamOutcome> {
        let stream = self.inner.as_mut()?;
        let end = match stream.next().await {
            Some(StreamOutcome::Fragment(text)) => {
                self.fragments += 1;
                return Some(StreamOutcome::Fragment(text));
            }
            Some(StreamOutcome::Ended(end)) => end,
            None => StreamEnd::Closed,
        };
        self.close();
        Some(StreamOutcome::Ended(end))
    }

    /// Release the underlying connection.
    ///
    /// Returns `true` if this call closed the stream and `false` if it was
    /// already closed.
    pub fn close(&mut self) -> bool {
        match self.inner.take() {
            Some(stream) => {
                drop(stream);
                debug!(query = %self.query, fragments = self.fragments, "answer stream closed");
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("query", &self.query)
            .field("closed", &self.is_closed())
            .field("fragments", &self.fragments)
            .finish()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;

    fn handle(items: Vec<StreamOutcome>) -> StreamHandle {
        StreamHandle::new("q", Box::pin(stream::iter(items)))
    }

    async fn drain(h: &mut StreamHandle) -> Vec<StreamOutcome> {
        let mut out = Vec::new();
        while let Some(o) = h.next().await {
            out.push(o);
        }
        out
    }

    #[tokio::test]
    async fn delivers_fragments_then_end() {
        let mut h = handle(vec![
            StreamOutcome::fragment("a"),
            StreamOutcome::fragment("b"),
            StreamOutcome::Ended(StreamEnd::Closed),
        ]);
        let out = drain(&mut h).await;
        assert_eq!(out.len(), 3);
        assert_eq!(out[2], StreamOutcome::Ended(StreamEnd::Closed));
        assert_eq!(h.fragments_delivered(), 2);
        assert!(h.is_closed());
    }

    #[tokio::test]
    async fn synthesizes_closed_when_source_ends_silently() {
        let mut h = handle(vec![StreamOutcome::fragment("only")]);
        let out = drain(&mut h).await;
        assert_eq!(out.last(), Some(&StreamOutcome::Ended(StreamEnd::Closed)));
    }

    #[tokio::test]
    async fn nothing_is_delivered_after_the_first_end() {
        let mut h = handle(vec![
            StreamOutcome::failed("boom"),
            StreamOutcome::fragment("late"),
            StreamOutcome::Ended(StreamEnd::Closed),
        ]);
        let out = drain(&mut h).await;
        assert_eq!(out, vec![StreamOutcome::failed("boom")]);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let mut h = handle(vec![StreamOutcome::fragment("x")]);
        assert!(h.close());
        assert!(!h.close());
        assert!(h.next().await.is_none());
    }

    #[tokio::test]
    async fn terminal_outcome_closes_so_explicit_close_is_noop() {
        let mut h = handle(vec![StreamOutcome::Ended(StreamEnd::Closed)]);
        assert!(matches!(h.next().await, Some(StreamOutcome::Ended(_))));
        assert!(!h.close());
    }

    #[tokio::test]
    async fn empty_source_still_ends_once() {
        let mut h = handle(vec![]);
        assert_eq!(drain(&mut h).await, vec![StreamOutcome::Ended(StreamEnd::Closed)]);
    }
}
