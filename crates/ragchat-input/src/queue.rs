// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::VecDeque;

/// Queries waiting for the current answer to finish.
/// Preserves FIFO ordering.
#[derive(Debug, Default)]
pub struct QueryQueue(VecDeque<String>);

impl QueryQueue {
    pub fn new() -> Self { Self(VecDeque::new()) }

    /// Enqueue `query`; returns its 1-based position in the queue.
    pub fn push(&mut self, query: impl Into<String>) -> usize {
        self.0.push_back(query.into());
        self.0.len()
    }

    pub fn pop(&mut self) -> Option<String> { self.0.pop_front() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn len(&self) -> usize { self.0.len() }

    /// Drop every pending query, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let n = self.0.len();
        self.0.clear();
        n
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
