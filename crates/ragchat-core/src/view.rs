// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use crate::{
    highlight::{highlight_with, HighlightMarker},
    session::{Message, Sender},
};

/// One message as it should be displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub sender: Sender,
    pub text: String,
    /// `true` for the answer that is still streaming.
    pub live: bool,
}

/// Render the message log plus the live buffer.
///
/// The newest message, when it is a bot message, is highlighted against the
/// message two positions back.  A non-empty live buffer is highlighted
/// against the newest logged message.  Everything else renders as stored.
/// With `marker` set to `None` no highlighting is applied.
pub fn render_transcript(
    messages: &[Message],
    buffer: &str,
    marker: Option<&HighlightMarker>,
) -> Vec<RenderedMessage> {
    let len = messages.len();
    let mut out: Vec<RenderedMessage> = messages
        .iter()
        .enumerate()
        .map(|(i, msg)| {
            let reference = if i + 1 == len && msg.is_bot() && len >= 2 {
                Some(messages[len - 2].text.as_str())
            } else {
                None
            };
            RenderedMessage { sender: msg.sender, text: apply(&msg.text, reference, marker), live: false }
        })
        .collect();

    if !buffer.is_empty() {
        let reference = messages.last().map(|m| m.text.as_str());
        out.push(RenderedMessage { sender: Sender::Bot, text: render_live(buffer, reference, marker), live: true });
    }
    out
}

/// Render the streaming buffer against `reference`.
pub fn render_live(buffer: &str, reference: Option<&str>, marker: Option<&HighlightMarker>) -> String {
    apply(buffer, reference, marker)
}

fn apply(text: &str, reference: Option<&str>, marker: Option<&HighlightMarker>) -> String {
    match marker {
        Some(marker) => highlight_with(text, reference, marker),
        None => text.to_string(),
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
