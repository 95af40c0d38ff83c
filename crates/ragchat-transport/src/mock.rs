// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::stream;

use crate::{
    transport::{QueryTransport, StreamHandle},
    StreamEnd, StreamOutcome,
};

/// A pre-scripted transport for tests.  Each call to `open_stream` pops the
/// next script from the front of the queue and replays it without network
/// access.  A script that does not end with `Ended` is closed cleanly by the
/// handle.
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Vec<StreamOutcome>>>,
    /// Every query passed to `open_stream`, in call order.
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    /// Build a transport from a list of scripts.
    /// The outer `Vec` is the ordered list of streams; the inner `Vec` is the
    /// sequence of outcomes delivered by that stream.
    pub fn new(scripts: Vec<Vec<StreamOutcome>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Convenience: one stream delivering `fragments` and closing cleanly.
    pub fn answer(fragments: &[&str]) -> Self {
        Self::new(vec![Self::script(fragments)])
    }

    /// Outcomes for `fragments` followed by a clean close.
    pub fn script(fragments: &[&str]) -> Vec<StreamOutcome> {
        fragments
            .iter()
            .map(|f| StreamOutcome::fragment(*f))
            .chain(std::iter::once(StreamOutcome::Ended(StreamEnd::Closed)))
            .collect()
    }

    /// Queries seen so far.
    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl QueryTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    fn open_stream(&self, query: &str) -> StreamHandle {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(query.to_string());
        }
        let outcomes = self
            .scripts
            .lock()
            .ok()
            .and_then(|mut scripts| scripts.pop_front())
            .unwrap_or_else(|| vec![StreamOutcome::failed("no more scripts")]);
        StreamHandle::new(query, Box::pin(stream::iter(outcomes)))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(mut h: StreamHandle) -> Vec<StreamOutcome> {
        let mut out = Vec::new();
        while let Some(o) = h.next().await {
            out.push(o);
        }
        out
    }

    #[tokio::test]
    async fn answer_replays_fragments_and_closes() {
        let t = ScriptedTransport::answer(&["X", "is"]);
        let out = collect(t.open_stream("What is X?")).await;
        assert_eq!(
            out,
            vec![
                StreamOutcome::fragment("X"),
                StreamOutcome::fragment("is"),
                StreamOutcome::Ended(StreamEnd::Closed),
            ]
        );
    }

    #[tokio::test]
    async fn records_requested_queries_in_order() {
        let t = ScriptedTransport::new(vec![vec![], vec![]]);
        let _ = t.open_stream("first");
        let _ = t.open_stream("second");
        assert_eq!(t.requested(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn exhausted_scripts_fail_the_stream() {
        let t = ScriptedTransport::new(vec![]);
        let out = collect(t.open_stream("q")).await;
        assert_eq!(out, vec![StreamOutcome::failed("no more scripts")]);
    }
}
