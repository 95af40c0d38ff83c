// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Word-overlap highlighting between an answer and a reference message.
//!
//! Every whitespace-separated word of the reference is applied as its own
//! pass over the text, in reference order.  Each pass wraps every
//! case-insensitive occurrence of the word (substrings included) in the
//! marker.  Passes see the output of earlier passes, so a later word can
//! match inside markers inserted earlier and a repeated word wraps the same
//! text twice.  Callers depend on this exact output.

use ragchat_config::HighlightStyle;
use regex::{Captures, Regex};
use tracing::warn;

/// Text inserted around each match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightMarker {
    pub open: &'static str,
    pub close: &'static str,
}

impl HighlightMarker {
    pub const HTML: HighlightMarker =
        HighlightMarker { open: "<span class=\"bg-yellow-200\">", close: "</span>" };

    /// Yellow background.
    pub const ANSI: HighlightMarker = HighlightMarker { open: "\x1b[43m", close: "\x1b[0m" };

    /// Marker for a configured style; `None` disables highlighting.
    pub fn for_style(style: HighlightStyle) -> Option<Self> {
        match style {
            HighlightStyle::Html => Some(Self::HTML),
            HighlightStyle::Ansi => Some(Self::ANSI),
            HighlightStyle::Off => None,
        }
    }
}

impl Default for HighlightMarker {
    fn default() -> Self {
        Self::HTML
    }
}

/// Highlight `candidate` against `reference` with the HTML marker.
pub fn highlight(candidate: &str, reference: Option<&str>) -> String {
    highlight_with(candidate, reference, &HighlightMarker::HTML)
}

/// Highlight `candidate` against `reference` with `marker`.
///
/// A missing or empty reference returns the candidate unchanged.
pub fn highlight_with(candidate: &str, reference: Option<&str>, marker: &HighlightMarker) -> String {
    let Some(reference) = reference.filter(|r| !r.is_empty()) else {
        return candidate.to_string();
    };

    let mut text = candidate.to_string();
    for word in reference.split_whitespace() {
        let pattern = match Regex::new(&format!("(?i){}", regex::escape(word))) {
            Ok(re) => re,
            Err(e) => {
                warn!(word, error = %e, "skipping unmatchable reference word");
                continue;
            }
        };
        text = pattern
            .replace_all(&text, |caps: &Captures| format!("{}{}{}", marker.open, &caps[0], marker.close))
            .into_owned();
    }
    text
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
