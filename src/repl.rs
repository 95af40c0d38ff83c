// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Interactive session: one query per line, slash commands for the rest.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use futures::StreamExt;
use ragchat_core::{render_transcript, HighlightMarker, QueryController, SessionEvent, Submission};
use ragchat_transport::{UploadClient, UploadError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, warn};

use crate::display::{write_history, write_transcript, Printer};

const HELP: &str = "\
Type a question and press enter.
  /history        list past queries
  /replay N       ask history entry N again
  /upload PATH    add a .txt document to the knowledge base
  /show           print the conversation so far
  /help           this text
  /quit           leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Query(String),
    History,
    Replay(usize),
    Upload(PathBuf),
    Show,
    Help,
    Quit,
    Invalid(String),
}

impl ReplCommand {
    /// Interpret one input line.  Anything not starting with `/` is a query
    /// and is passed on verbatim.
    pub fn parse(line: &str) -> Self {
        let Some(rest) = line.trim().strip_prefix('/') else {
            return ReplCommand::Query(line.to_string());
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match name {
            "history" | "h" => ReplCommand::History,
            "replay" | "r" => match arg.parse() {
                Ok(index) => ReplCommand::Replay(index),
                Err(_) => ReplCommand::Invalid(format!("/replay needs a history index, got '{arg}'")),
            },
            "upload" | "u" if !arg.is_empty() => ReplCommand::Upload(PathBuf::from(arg)),
            "upload" | "u" => ReplCommand::Invalid("/upload needs a file path".into()),
            "show" => ReplCommand::Show,
            "help" | "?" => ReplCommand::Help,
            "quit" | "q" | "exit" => ReplCommand::Quit,
            other => ReplCommand::Invalid(format!("unknown command '/{other}' (try /help)")),
        }
    }
}

/// Result of one background upload.
type Uploaded = (PathBuf, Result<String, UploadError>);

/// Run the interactive loop until `/quit` or end of input.
///
/// User input, stream events and finished uploads are multiplexed on the
/// current task, so a new query can be typed while an answer is still
/// streaming.  Uploads run as separate tasks and never stall the answer.
/// At end of input the running answer, any queued queries and pending
/// uploads are finished first; `/quit` abandons pending uploads.
pub async fn run(
    mut controller: QueryController,
    uploader: UploadClient,
    marker: Option<HighlightMarker>,
) -> anyhow::Result<()> {
    let mut printer = Printer::new(io::stdout(), marker);
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let mut uploads: JoinSet<Uploaded> = JoinSet::new();

    println!("ragchat: {} past queries. /help for commands.", controller.history().len());

    let mut quit = false;
    while !quit {
        tokio::select! {
            event = controller.next_event(), if controller.is_active() => {
                if let Some(event) = event {
                    printer.handle(&event)?;
                }
            }
            Some(done) = uploads.join_next(), if !uploads.is_empty() => report_upload(&mut io::stdout(), done)?,
            line = lines.next() => {
                let Some(line) = line.transpose().context("reading stdin")? else {
                    debug!("end of input");
                    break;
                };
                quit = dispatch(&mut controller, &uploader, &mut uploads, &mut printer, marker.as_ref(), &line)?;
            }
        }
    }

    if !quit {
        while let Some(event) = controller.next_event().await {
            printer.handle(&event)?;
        }
        while let Some(done) = uploads.join_next().await {
            report_upload(&mut io::stdout(), done)?;
        }
    }
    controller.teardown();
    Ok(())
}

fn spawn_upload(uploads: &mut JoinSet<Uploaded>, uploader: &UploadClient, path: PathBuf) {
    let uploader = uploader.clone();
    uploads.spawn(async move {
        let result = uploader.upload(&path).await;
        (path, result)
    });
}

fn report_upload<W: Write>(out: &mut W, done: Result<Uploaded, tokio::task::JoinError>) -> io::Result<()> {
    match done {
        Ok((path, Ok(_))) => writeln!(out, "(uploaded {})", path.display())?,
        Ok((path, Err(e))) => writeln!(out, "(upload of {} failed: {e})", path.display())?,
        Err(e) => {
            warn!(error = %e, "upload task did not finish");
            writeln!(out, "(upload aborted)")?;
        }
    }
    out.flush()
}

/// Execute one input line.  Returns `true` when the session should end.
fn dispatch<W: Write>(
    controller: &mut QueryController,
    uploader: &UploadClient,
    uploads: &mut JoinSet<Uploaded>,
    printer: &mut Printer<W>,
    marker: Option<&HighlightMarker>,
    line: &str,
) -> anyhow::Result<bool> {
    let mut stdout = io::stdout();
    match ReplCommand::parse(line) {
        ReplCommand::Query(text) => {
            let submission = controller.submit_query(&text);
            if let Some(event) = SessionEvent::for_submission(&text, submission) {
                printer.handle(&event)?;
            }
        }
        ReplCommand::Replay(index) => {
            let text = controller.history().get(index).map(str::to_owned);
            let submission = controller.replay(index);
            match text {
                Some(text) if submission != Submission::Ignored => {
                    writeln!(stdout, "> {text}")?;
                    if let Some(event) = SessionEvent::for_submission(&text, submission) {
                        printer.handle(&event)?;
                    }
                }
                _ => writeln!(stdout, "(no history entry {index})")?,
            }
        }
        ReplCommand::History => write_history(&mut stdout, controller.history().entries(), None)?,
        ReplCommand::Upload(path) => {
            writeln!(stdout, "(uploading {} in the background)", path.display())?;
            spawn_upload(uploads, uploader, path);
        }
        ReplCommand::Show => {
            let rendered = render_transcript(controller.messages(), controller.buffer(), marker);
            write_transcript(&mut stdout, &rendered)?;
        }
        ReplCommand::Help => writeln!(stdout, "{HELP}")?,
        ReplCommand::Quit => return Ok(true),
        ReplCommand::Invalid(msg) => writeln!(stdout, "({msg})")?,
    }
    stdout.flush()?;
    Ok(false)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
