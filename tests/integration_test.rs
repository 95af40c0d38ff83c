// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
/// End-to-end tests: the query controller talks to a loopback HTTP server
/// that streams real server-sent events, with history in a temp state file.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ragchat_config::{BusyPolicy, ServerConfig};
use ragchat_core::{Message, QueryController, QueryState, Session, SessionEvent, Submission};
use ragchat_input::{HistoryStore, JsonFileHistoryStore};
use ragchat_transport::StreamEnd;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

// ── Loopback SSE server ───────────────────────────────────────────────────────

/// Serve one streamed answer per connection, in order.  Each inner list is
/// written as one event per fragment, then the connection is closed.
/// Returns the base URL and the request targets seen so far.
async fn sse_server(answers: Vec<Vec<&'static str>>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let targets = Arc::new(Mutex::new(Vec::new()));
    let seen = targets.clone();

    tokio::spawn(async move {
        for fragments in answers {
            let (stream, _) = listener.accept().await.expect("accept");
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);

            let mut request_line = String::new();
            reader.read_line(&mut request_line).await.unwrap();
            if let Some(target) = request_line.split(' ').nth(1) {
                seen.lock().unwrap().push(target.to_string());
            }
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).await.unwrap();
                if line.trim().is_empty() {
                    break;
                }
            }

            let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n";
            write_half.write_all(head.as_bytes()).await.unwrap();
            for f in fragments {
                write_half.write_all(format!("data: {f}\n\n").as_bytes()).await.unwrap();
                write_half.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            let _ = write_half.shutdown().await;
        }
    });

    (format!("http://127.0.0.1:{port}"), targets)
}

fn controller(base_url: &str, state: &std::path::Path, policy: BusyPolicy) -> QueryController {
    let server = ServerConfig { base_url: base_url.to_string(), ..ServerConfig::default() };
    let transport = ragchat_transport::from_config(&server).unwrap();
    let session = Session::init(Box::new(JsonFileHistoryStore::new(state)));
    QueryController::new(session, transport, policy)
}

async fn drive_to_end(controller: &mut QueryController) -> Vec<SessionEvent> {
    let (tx, mut rx) = mpsc::channel(64);
    controller.drive(tx).await;
    let mut events = Vec::new();
    while let Some(ev) = rx.recv().await {
        events.push(ev);
    }
    events
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn streamed_answer_is_finalized_and_history_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    let (url, targets) = sse_server(vec![vec!["X", "is", "a", "concept."]]).await;

    let mut c = controller(&url, &state, BusyPolicy::Queue);
    assert_eq!(c.submit_query("What is X?"), Submission::Started);
    let events = drive_to_end(&mut c).await;

    let buffers: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Fragment { buffer, .. } => Some(buffer.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(buffers, ["X ", "X is ", "X is a ", "X is a concept. "]);
    assert_eq!(c.messages(), [Message::user("What is X?"), Message::bot("X is a concept.")]);
    assert_eq!(c.state(), QueryState::Idle);
    assert_eq!(targets.lock().unwrap().as_slice(), ["/query?q=What+is+X%3F"]);

    c.teardown();
    let stored = JsonFileHistoryStore::new(&state).load().unwrap();
    assert_eq!(stored, ["What is X?"]);
}

#[tokio::test]
async fn queued_query_runs_on_its_own_connection() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    let (url, targets) = sse_server(vec![vec!["first"], vec!["second"]]).await;

    let mut c = controller(&url, &state, BusyPolicy::Queue);
    c.submit_query("one");
    assert_eq!(c.submit_query("two"), Submission::Queued { position: 1 });
    drive_to_end(&mut c).await;

    assert_eq!(
        c.messages(),
        [Message::user("one"), Message::bot("first"), Message::user("two"), Message::bot("second")]
    );
    assert_eq!(targets.lock().unwrap().len(), 2);
    assert_eq!(c.history().entries(), ["one", "two"]);
}

#[tokio::test]
async fn unreachable_server_finalizes_empty_answer() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let dir = tempfile::tempdir().unwrap();

    let mut c = controller(&url, &dir.path().join("state.json"), BusyPolicy::Queue);
    c.submit_query("anyone there?");
    let events = drive_to_end(&mut c).await;

    match events.last() {
        Some(SessionEvent::Finalized { message, end }) => {
            assert_eq!(message, &Message::bot(""));
            assert!(matches!(end, StreamEnd::Failed(_)));
        }
        other => panic!("expected finalized event, got {other:?}"),
    }
    assert_eq!(c.history().entries(), ["anyone there?"]);
}

#[tokio::test]
async fn history_survives_sessions_and_replay_appends_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    let (url, _targets) = sse_server(vec![vec!["answer"], vec!["answer again"]]).await;

    let mut first = controller(&url, &state, BusyPolicy::Queue);
    first.submit_query("prior query");
    drive_to_end(&mut first).await;
    first.teardown();

    let mut second = controller(&url, &state, BusyPolicy::Queue);
    assert_eq!(second.history().entries(), ["prior query"]);
    assert_eq!(second.replay(0), Submission::Started);
    drive_to_end(&mut second).await;

    assert_eq!(second.messages(), [Message::user("prior query"), Message::bot("answer again")]);
    assert_eq!(second.history().entries(), ["prior query", "prior query"]);
}
