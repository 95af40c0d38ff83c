// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

// ─── Server ──────────────────────────────────────────────────────────────────

/// Location of the RAG query service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Scheme, host and port of the service, without a trailing path.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the streaming query endpoint (`GET`, answers as SSE).
    #[serde(default = "default_query_path")]
    pub query_path: String,
    /// Name of the URL parameter that carries the query text.
    #[serde(default = "default_query_param")]
    pub query_param: String,
    /// Path of the document upload endpoint (`POST`, multipart).
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    /// Seconds allowed for establishing the TCP/TLS connection (0 = no limit).
    /// The answer stream itself is never timed out.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".into()
}
fn default_query_path() -> String {
    "/query".into()
}
fn default_query_param() -> String {
    "q".into()
}
fn default_upload_path() -> String {
    "/upload".into()
}
fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            query_path: default_query_path(),
            query_param: default_query_param(),
            upload_path: default_upload_path(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ServerConfig {
    /// Full URL of the query endpoint, without the query string.
    pub fn query_url(&self) -> String {
        join_url(&self.base_url, &self.query_path)
    }

    /// Full URL of the upload endpoint.
    pub fn upload_url(&self) -> String {
        join_url(&self.base_url, &self.upload_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

// ─── History ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// State file holding the query history.  `~` and `$VARS` are expanded.
    /// Defaults to `$XDG_DATA_HOME/ragchat/state.json`.
    #[serde(default)]
    pub path: Option<String>,
    /// Key under which the history array is stored inside the state file.
    #[serde(default = "default_history_key")]
    pub key: String,
}

fn default_history_key() -> String {
    "queryHistory".into()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { path: None, key: default_history_key() }
    }
}

impl HistoryConfig {
    /// Resolve the state file location, expanding `~` and environment
    /// variables in an explicit path.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(p) => PathBuf::from(shellexpand::full(p).map(|s| s.into_owned()).unwrap_or_else(|_| p.clone())),
            None => default_state_path(),
        }
    }
}

/// `$XDG_DATA_HOME/ragchat/state.json`, falling back to `~/.local/share`.
pub fn default_state_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".local")
                .join("share")
        })
        .join("ragchat")
        .join("state.json")
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// What happens to a query submitted while another answer is still streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Hold the query and start it as soon as the current answer finalizes.
    #[default]
    Queue,
    /// Drop the query.
    Reject,
}

impl std::fmt::Display for BusyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusyPolicy::Queue => write!(f, "queue"),
            BusyPolicy::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub busy_policy: BusyPolicy,
}

// ─── UI ──────────────────────────────────────────────────────────────────────

/// Marker style used when highlighting overlap with the previous message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HighlightStyle {
    /// `<span class="bg-yellow-200">…</span>`
    Html,
    /// Yellow background escape sequence.
    #[default]
    Ansi,
    /// No highlighting.
    Off,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub highlight: HighlightStyle,
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Defaults ─────────────────────────────────────────────────────────────

    #[test]
    fn default_server_points_at_local_service() {
        let c = Config::default();
        assert_eq!(c.server.base_url, "http://localhost:8080");
        assert_eq!(c.server.query_param, "q");
    }

    #[test]
    fn default_history_key_matches_state_layout() {
        let c = Config::default();
        assert_eq!(c.history.key, "queryHistory");
        assert!(c.history.path.is_none());
    }

    #[test]
    fn default_busy_policy_is_queue() {
        assert_eq!(Config::default().session.busy_policy, BusyPolicy::Queue);
    }

    #[test]
    fn default_highlight_is_ansi() {
        assert_eq!(Config::default().ui.highlight, HighlightStyle::Ansi);
    }

    // ── URL joining ──────────────────────────────────────────────────────────

    #[test]
    fn query_url_joins_without_double_slash() {
        let s = ServerConfig { base_url: "http://h:1/".into(), ..ServerConfig::default() };
        assert_eq!(s.query_url(), "http://h:1/query");
    }

    #[test]
    fn upload_url_accepts_path_without_leading_slash() {
        let s = ServerConfig { upload_path: "api/upload".into(), ..ServerConfig::default() };
        assert_eq!(s.upload_url(), "http://localhost:8080/api/upload");
    }

    // ── Serde ────────────────────────────────────────────────────────────────

    #[test]
    fn partial_toml_fills_in_defaults() {
        let c: Config = toml::from_str(
            r#"
[server]
base_url = "http://rag.internal:9000"

[session]
busy_policy = "reject"
"#,
        )
        .unwrap();
        assert_eq!(c.server.base_url, "http://rag.internal:9000");
        assert_eq!(c.server.query_path, "/query");
        assert_eq!(c.session.busy_policy, BusyPolicy::Reject);
        assert_eq!(c.ui.highlight, HighlightStyle::Ansi);
    }

    #[test]
    fn highlight_style_parses_lowercase() {
        let c: Config = toml::from_str("[ui]\nhighlight = \"html\"").unwrap();
        assert_eq!(c.ui.highlight, HighlightStyle::Html);
    }

    #[test]
    fn explicit_history_path_is_used_verbatim() {
        let h = HistoryConfig { path: Some("/tmp/ragchat-state.json".into()), ..HistoryConfig::default() };
        assert_eq!(h.resolved_path(), PathBuf::from("/tmp/ragchat-state.json"));
    }

    #[test]
    fn default_state_path_ends_in_ragchat_dir() {
        let p = default_state_path();
        assert!(p.ends_with("ragchat/state.json"));
    }
}
