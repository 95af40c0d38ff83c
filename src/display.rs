// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Line-oriented rendering of session events.

use std::io::{self, Write};

use ragchat_core::{highlight_with, render_live, HighlightMarker, Message, RenderedMessage, Sender, SessionEvent};

/// Writes a streaming answer as it grows.
///
/// The live buffer is re-rendered (with highlighting) on every fragment and
/// only the new suffix is written.  When highlighting rewrites text that was
/// already printed, the whole answer is printed again on a fresh line.
pub struct Printer<W: Write> {
    out: W,
    marker: Option<HighlightMarker>,
    /// The query whose answer is streaming; highlight reference.
    query: Option<String>,
    printed: String,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, marker: Option<HighlightMarker>) -> Self {
        Self { out, marker, query: None, printed: String::new() }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn handle(&mut self, event: &SessionEvent) -> io::Result<()> {
        match event {
            SessionEvent::Started(query) => {
                self.query = Some(query.clone());
                self.printed.clear();
            }
            SessionEvent::Queued { query, position } => {
                writeln!(self.out, "(queued #{position}: {query})")?;
            }
            SessionEvent::Rejected(query) => {
                writeln!(self.out, "(busy, dropped: {query})")?;
            }
            SessionEvent::Fragment { buffer, .. } => {
                let rendered = render_live(buffer, self.query.as_deref(), self.marker.as_ref());
                self.write_progress(rendered)?;
            }
            SessionEvent::Finalized { message, end } => {
                let rendered = self.apply(&message.text);
                if self.printed.trim_end() != rendered {
                    self.write_progress(rendered)?;
                }
                writeln!(self.out)?;
                if end.is_failure() {
                    writeln!(self.out, "(answer incomplete: {end})")?;
                }
                self.printed.clear();
                self.query = None;
            }
        }
        self.out.flush()
    }

    fn apply(&self, text: &str) -> String {
        match &self.marker {
            Some(marker) => highlight_with(text, self.query.as_deref(), marker),
            None => text.to_string(),
        }
    }

    fn write_progress(&mut self, rendered: String) -> io::Result<()> {
        match rendered.strip_prefix(self.printed.as_str()) {
            Some(suffix) => write!(self.out, "{suffix}")?,
            None => write!(self.out, "\n{rendered}")?,
        }
        self.printed = rendered;
        Ok(())
    }
}

/// Print a rendered transcript, one message per block.
pub fn write_transcript<W: Write>(out: &mut W, messages: &[RenderedMessage]) -> io::Result<()> {
    if messages.is_empty() {
        return writeln!(out, "(no messages yet)");
    }
    for m in messages {
        let who = match (m.sender, m.live) {
            (Sender::User, _) => "you",
            (Sender::Bot, false) => "bot",
            (Sender::Bot, true) => "bot…",
        };
        writeln!(out, "{who:>4}: {}", m.text)?;
    }
    Ok(())
}

/// Print history entries with the indices `replay` accepts.
/// `limit` keeps only the most recent entries.
pub fn write_history<W: Write>(out: &mut W, entries: &[String], limit: Option<usize>) -> io::Result<()> {
    if entries.is_empty() {
        return writeln!(out, "No queries in history.");
    }
    let skip = limit.map_or(0, |n| entries.len().saturating_sub(n));
    for (i, entry) in entries.iter().enumerate().skip(skip) {
        writeln!(out, "{i:>4}  {entry}")?;
    }
    Ok(())
}

/// JSON document for a finished one-shot exchange.
pub fn exchange_json(messages: &[Message]) -> serde_json::Value {
    serde_json::json!({ "messages": messages })
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use ragchat_transport::StreamEnd;

    use super::*;

    fn run(marker: Option<HighlightMarker>, events: &[SessionEvent]) -> String {
        let mut p = Printer::new(Vec::new(), marker);
        for e in events {
            p.handle(e).unwrap();
        }
        String::from_utf8(p.into_inner()).unwrap()
    }

    fn fragment(f: &str, buffer: &str) -> SessionEvent {
        SessionEvent::Fragment { fragment: f.into(), buffer: buffer.into() }
    }

    fn finalized(text: &str) -> SessionEvent {
        SessionEvent::Finalized { message: Message::bot(text), end: StreamEnd::Closed }
    }

    #[test]
    fn plain_stream_prints_incrementally() {
        let out = run(
            None,
            &[
                SessionEvent::Started("q".into()),
                fragment("X", "X "),
                fragment("is", "X is "),
                finalized("X is"),
            ],
        );
        assert_eq!(out, "X is \n");
    }

    #[test]
    fn highlighted_stream_marks_query_words() {
        let out = run(
            Some(HighlightMarker::HTML),
            &[SessionEvent::Started("is".into()), fragment("X", "X "), fragment("is", "X is "), finalized("X is")],
        );
        assert_eq!(out, "X <span class=\"bg-yellow-200\">is</span> \n");
    }

    #[test]
    fn empty_answer_prints_blank_line() {
        let out = run(None, &[SessionEvent::Started("q".into()), finalized("")]);
        assert_eq!(out, "\n");
    }

    #[test]
    fn failed_stream_is_noted() {
        let out = run(
            None,
            &[
                SessionEvent::Started("q".into()),
                fragment("half", "half "),
                SessionEvent::Finalized { message: Message::bot("half"), end: StreamEnd::Failed("HTTP 502".into()) },
            ],
        );
        assert_eq!(out, "half \n(answer incomplete: failed: HTTP 502)\n");
    }

    #[test]
    fn queue_notices_are_printed() {
        let out = run(None, &[SessionEvent::Queued { query: "next".into(), position: 1 }]);
        assert_eq!(out, "(queued #1: next)\n");
    }

    #[test]
    fn history_listing_respects_limit_and_keeps_indices() {
        let entries: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let mut out = Vec::new();
        write_history(&mut out, &entries, Some(2)).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "   1  b\n   2  c\n");
    }

    #[test]
    fn exchange_json_lists_messages() {
        let v = exchange_json(&[Message::user("q"), Message::bot("a")]);
        assert_eq!(v["messages"][1]["sender"], "bot");
        assert_eq!(v["messages"][1]["text"], "a");
    }
}
