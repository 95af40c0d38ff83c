// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Server-sent-events transport for the streaming query endpoint.
//!
//! The endpoint answers `GET <query_url>?<param>=<query>` with a
//! `text/event-stream` body in which every event's `data` payload is one
//! fragment of the answer.  There is no "done" event: the answer is over
//! when the server closes the connection.
//!
//! # Decoding
//! Lines end in `\r\n`, `\n` or a bare `\r`, and a leading UTF-8 byte order
//! mark is skipped.  `data:` lines are
//! accumulated, joined with `\n`, and dispatched on a blank line.  Comment
//! lines (`:`) and the `event`, `id` and `retry` fields are ignored.  A
//! trailing event that is not terminated by a blank line when the body ends
//! is discarded, matching browser `EventSource` behaviour.

use std::time::Duration;

use anyhow::Context;
use futures::{stream, StreamExt};
use ragchat_config::ServerConfig;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tracing::{debug, trace, warn};

use crate::{
    transport::{OutcomeStream, QueryTransport, StreamHandle},
    StreamEnd, StreamOutcome,
};

/// Streaming transport backed by `reqwest`.
pub struct SseTransport {
    client: reqwest::Client,
    /// Full query URL without the query string.
    query_url: String,
    /// URL parameter carrying the query text.
    query_param: String,
}

impl SseTransport {
    pub fn new(cfg: &ServerConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if cfg.connect_timeout_secs > 0 {
            builder = builder.connect_timeout(Duration::from_secs(cfg.connect_timeout_secs));
        }
        let client = builder.build().context("building HTTP client")?;
        Ok(Self {
            client,
            query_url: cfg.query_url(),
            query_param: cfg.query_param.clone(),
        })
    }

    pub fn query_url(&self) -> &str {
        &self.query_url
    }
}

impl QueryTransport for SseTransport {
    fn name(&self) -> &str {
        "sse"
    }

    fn open_stream(&self, query: &str) -> StreamHandle {
        debug!(url = %self.query_url, query_len = query.len(), "opening answer stream");

        let request = self
            .client
            .get(&self.query_url)
            .query(&[(self.query_param.as_str(), query)])
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");

        let outcomes = stream::once(request.send()).flat_map(|result| -> OutcomeStream {
            match result {
                Ok(resp) if resp.status().is_success() => event_outcomes(resp),
                Ok(resp) => {
                    let status = resp.status();
                    warn!(%status, "query endpoint returned an error status");
                    single(StreamOutcome::failed(format!("HTTP {status}")))
                }
                Err(e) => {
                    warn!(error = %e, "could not reach query endpoint");
                    single(StreamOutcome::failed(e.to_string()))
                }
            }
        });

        StreamHandle::new(query, Box::pin(outcomes))
    }
}

fn single(outcome: StreamOutcome) -> OutcomeStream {
    Box::pin(stream::iter([outcome]))
}

/// Decode a successful response body into fragments followed by an end signal.
///
/// A body error yields `Ended(Failed)`; [`StreamHandle`] stops at the first
/// end, so the trailing `Ended(Closed)` only surfaces on a clean close.
fn event_outcomes(resp: reqwest::Response) -> OutcomeStream {
    let decoded = resp
        .bytes_stream()
        .scan(SseDecoder::default(), |decoder, chunk| {
            let outcomes: Vec<StreamOutcome> = match chunk {
                Ok(bytes) => decoder.feed(&bytes).into_iter().map(StreamOutcome::Fragment).collect(),
                Err(e) => {
                    warn!(error = %e, "answer stream interrupted");
                    vec![StreamOutcome::failed(e.to_string())]
                }
            };
            std::future::ready(Some(outcomes))
        })
        .flat_map(stream::iter);

    Box::pin(decoded.chain(stream::once(std::future::ready(StreamOutcome::Ended(
        StreamEnd::Closed,
    )))))
}

/// Incremental SSE decoder producing the data payload of each event.
///
/// Bytes are buffered until a full line is available so that chunk
/// boundaries may fall inside a line or inside a multi-byte character.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    data: Option<String>,
    /// The previous byte was a `\r`, so a following `\n` ends nothing.
    after_cr: bool,
    /// The first line has been seen (and its BOM, if any, dropped).
    started: bool,
}

const BOM: &[u8] = b"\xEF\xBB\xBF";

impl SseDecoder {
    /// Feed one chunk of body bytes; returns the payloads of all events
    /// completed by this chunk, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut events = Vec::new();
        for &byte in chunk {
            let after_cr = std::mem::replace(&mut self.after_cr, byte == b'\r');
            match byte {
                b'\n' if after_cr => {}
                b'\n' | b'\r' => {
                    if let Some(payload) = self.end_line() {
                        events.push(payload);
                    }
                }
                _ => self.line.push(byte),
            }
        }
        events
    }

    fn end_line(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.line);
        let raw = if std::mem::replace(&mut self.started, true) {
            &raw[..]
        } else {
            raw.strip_prefix(BOM).unwrap_or(&raw)
        };
        let line = String::from_utf8_lossy(raw);
        self.process_line(&line)
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.data.take();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => match &mut self.data {
                Some(buf) => {
                    buf.push('\n');
                    buf.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            },
            other => trace!(field = other, "ignoring SSE field"),
        }
        None
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
