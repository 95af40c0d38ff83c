// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod queue;
pub mod history;

pub use queue::QueryQueue;
pub use history::{
    HistoryError, HistoryStore, JsonFileHistoryStore, MemoryHistoryStore, DEFAULT_HISTORY_KEY,
};
