// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Persistent query history.
//!
//! History is an ordered list of raw query strings, oldest first.  It is read
//! once when a session starts and written back in full on every change.
//! Duplicates are kept: asking the same question twice records it twice.
//!
//! The on-disk layout is a single JSON object used as a small key-value
//! store; the history lives under one key (default `queryHistory`):
//!
//! ```json
//! { "queryHistory": ["What is X?", "What is Y?"] }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Default key holding the history array inside the state file.
pub const DEFAULT_HISTORY_KEY: &str = "queryHistory";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("encoding history: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("history store is unavailable")]
    Poisoned,
}

/// Durable storage for the query history.
pub trait HistoryStore: Send {
    /// Read the stored history.  A store that has never been written yields
    /// an empty list.
    fn load(&self) -> Result<Vec<String>, HistoryError>;

    /// Replace the stored history with `entries`.
    fn save(&self, entries: &[String]) -> Result<(), HistoryError>;
}

// ─── JSON file ───────────────────────────────────────────────────────────────

/// History kept in a JSON object file alongside any other keys.
#[derive(Debug, Clone)]
pub struct JsonFileHistoryStore {
    path: PathBuf,
    key: String,
}

impl JsonFileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_key(path, DEFAULT_HISTORY_KEY)
    }

    pub fn with_key(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self { path: path.into(), key: key.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> HistoryError {
        HistoryError::Io { path: self.path.clone(), source }
    }

    /// Existing state object, or an empty one if the file is missing or not
    /// a JSON object.
    fn read_state(&self) -> Result<Map<String, Value>, HistoryError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => {
                warn!(path = %self.path.display(), "state file is not a JSON object; ignoring it");
                Ok(Map::new())
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file is not valid JSON; ignoring it");
                Ok(Map::new())
            }
        }
    }
}

impl HistoryStore for JsonFileHistoryStore {
    fn load(&self) -> Result<Vec<String>, HistoryError> {
        let mut state = self.read_state()?;
        let entries = match state.remove(&self.key) {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => match serde_json::from_value::<Vec<String>>(value) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(key = %self.key, error = %e, "stored history has the wrong shape; starting empty");
                    Vec::new()
                }
            },
        };
        debug!(path = %self.path.display(), entries = entries.len(), "history loaded");
        Ok(entries)
    }

    fn save(&self, entries: &[String]) -> Result<(), HistoryError> {
        let mut state = self.read_state()?;
        state.insert(self.key.clone(), serde_json::to_value(entries)?);
        let content = serde_json::to_string_pretty(&Value::Object(state))?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, content).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;

        debug!(path = %self.path.display(), entries = entries.len(), "history saved");
        Ok(())
    }
}

// ─── In memory ───────────────────────────────────────────────────────────────

/// History held in memory.  Clones share the same backing list, so a test
/// can keep one clone to inspect what a session wrote through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    entries: Arc<Mutex<Vec<String>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { entries: Arc::new(Mutex::new(entries.into_iter().map(Into::into).collect())) }
    }

    /// Snapshot of the stored entries.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<Vec<String>, HistoryError> {
        self.entries.lock().map(|e| e.clone()).map_err(|_| HistoryError::Poisoned)
    }

    fn save(&self, entries: &[String]) -> Result<(), HistoryError> {
        let mut guard = self.entries.lock().map_err(|_| HistoryError::Poisoned)?;
        *guard = entries.to_vec();
        Ok(())
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
