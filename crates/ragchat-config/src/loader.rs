// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::Config;

/// Environment variable that overrides `server.base_url` after all files.
pub const SERVER_ENV: &str = "RAGCHAT_SERVER";

/// Ordered list of config file locations searched from lowest to highest priority.
/// Later files override earlier ones.
fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. System-wide default
    paths.push(PathBuf::from("/etc/ragchat/config.toml"));

    // 2. XDG / home
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".config/ragchat/config.toml"));
    }
    if let Some(cfg) = dirs::config_dir() {
        paths.push(cfg.join("ragchat/config.toml"));
    }

    // 3. Workspace-local
    paths.push(PathBuf::from(".ragchat/config.toml"));
    paths.push(PathBuf::from("ragchat.toml"));

    paths
}

/// Load configuration by merging all discovered TOML files.
/// The `extra` argument may provide an explicit path (e.g. `--config` CLI flag).
pub fn load(extra: Option<&Path>) -> anyhow::Result<Config> {
    let mut merged = toml::Value::Table(toml::map::Map::new());

    for path in config_search_paths() {
        if path.is_file() {
            debug!(path = %path.display(), "loading config layer");
            merge_toml(&mut merged, read_layer(&path)?);
        }
    }

    if let Some(p) = extra {
        debug!(path = %p.display(), "loading explicit config");
        merge_toml(&mut merged, read_layer(p)?);
    }

    let mut config: Config = merged.try_into().context("invalid configuration")?;
    apply_env_overrides(&mut config, std::env::var(SERVER_ENV).ok());
    Ok(config)
}

fn read_layer(path: &Path) -> anyhow::Result<toml::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn apply_env_overrides(config: &mut Config, server: Option<String>) {
    if let Some(url) = server.filter(|s| !s.trim().is_empty()) {
        debug!(%url, "server url overridden from environment");
        config.server.base_url = url;
    }
}

/// Deep-merge `src` into `dst`; src wins on scalar conflicts.
fn merge_toml(dst: &mut toml::Value, src: toml::Value) {
    match (dst, src) {
        (toml::Value::Table(d), toml::Value::Table(s)) => {
            for (k, v) in s {
                let entry = d.entry(k).or_insert(toml::Value::Table(toml::map::Map::new()));
                merge_toml(entry, v);
            }
        }
        (dst, src) => *dst = src,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BusyPolicy, HighlightStyle};

    fn val(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn merge_scalar_src_wins() {
        let mut dst = val(r#"x = 1"#);
        let src = val(r#"x = 2"#);
        merge_toml(&mut dst, src);
        assert_eq!(dst["x"].as_integer(), Some(2));
    }

    #[test]
    fn merge_nested_tables() {
        let mut dst = val(r#"[server]
base_url = "http://a:1"
query_path = "/ask""#);
        let src = val(r#"[server]
base_url = "http://b:2""#);
        merge_toml(&mut dst, src);
        assert_eq!(dst["server"]["base_url"].as_str(), Some("http://b:2"));
        assert_eq!(dst["server"]["query_path"].as_str(), Some("/ask"));
    }

    #[test]
    fn load_fails_for_missing_explicit_path() {
        let result = load(Some(Path::new("/tmp/ragchat_nonexistent_config_xyz.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn load_explicit_file_overrides_defaults() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, r#"[session]
busy_policy = "reject"

[ui]
highlight = "off""#).unwrap();
        let cfg = load(Some(f.path())).unwrap();
        assert_eq!(cfg.session.busy_policy, BusyPolicy::Reject);
        assert_eq!(cfg.ui.highlight, HighlightStyle::Off);
    }

    #[test]
    fn load_rejects_wrong_typed_values() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[server]\nconnect_timeout_secs = \"soon\"").unwrap();
        assert!(load(Some(f.path())).is_err());
    }

    #[test]
    fn env_override_replaces_base_url() {
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg, Some("http://10.0.0.5:8080".into()));
        assert_eq!(cfg.server.base_url, "http://10.0.0.5:8080");
    }

    #[test]
    fn blank_env_override_is_ignored() {
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg, Some("  ".into()));
        assert_eq!(cfg.server.base_url, "http://localhost:8080");
    }
}
