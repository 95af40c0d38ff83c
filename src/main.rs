// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;
mod display;
mod repl;

use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use display::{exchange_json, write_history, Printer};
use ragchat_config::Config;
use ragchat_core::{HighlightMarker, QueryController, Session, SessionEvent, Submission};
use ragchat_input::{HistoryStore, JsonFileHistoryStore};
use ragchat_transport::UploadClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Completions need no configuration
    if let Some(Commands::Completions { shell }) = &cli.command {
        cli::print_completions(*shell);
        return Ok(());
    }

    let config = effective_config(&cli)?;

    match &cli.command {
        Some(Commands::ShowConfig) => {
            print!("{}", toml::to_string_pretty(&config).context("rendering configuration")?);
            Ok(())
        }
        Some(Commands::History { limit }) => {
            let entries = history_store(&config).load()?;
            write_history(&mut io::stdout(), &entries, *limit)?;
            Ok(())
        }
        Some(Commands::Upload { file }) => upload(&config, file).await,
        Some(Commands::Ask { query, json }) => {
            let query = query.join(" ");
            ask(&config, *json, |c| (c.submit_query(&query), query.clone())).await
        }
        Some(Commands::Replay { index, json }) => {
            let index = *index;
            ask(&config, *json, |c| {
                let text = c.history().get(index).unwrap_or_default().to_string();
                (c.replay(index), text)
            })
            .await
        }
        Some(Commands::Completions { .. }) => Ok(()),
        None => {
            let controller = open_controller(&config)?;
            let uploader = UploadClient::new(&config.server)?;
            repl::run(controller, uploader, HighlightMarker::for_style(config.ui.highlight)).await
        }
    }
}

/// Configuration files plus command-line overrides.
fn effective_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = ragchat_config::load(cli.config.as_deref())?;
    if let Some(server) = &cli.server {
        config.server.base_url = server.clone();
    }
    if let Some(busy) = cli.busy {
        config.session.busy_policy = busy;
    }
    if let Some(style) = cli.highlight {
        config.ui.highlight = style;
    }
    if let Some(path) = &cli.history_file {
        config.history.path = Some(path.display().to_string());
    }
    Ok(config)
}

fn history_store(config: &Config) -> JsonFileHistoryStore {
    JsonFileHistoryStore::with_key(config.history.resolved_path(), config.history.key.clone())
}

fn open_controller(config: &Config) -> anyhow::Result<QueryController> {
    let transport = ragchat_transport::from_config(&config.server)?;
    let session = Session::init(Box::new(history_store(config)));
    Ok(QueryController::new(session, transport, config.session.busy_policy))
}

/// One-shot query: submit, stream to completion, print, exit.
async fn ask<F>(config: &Config, json: bool, submit: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut QueryController) -> (Submission, String),
{
    let mut controller = open_controller(config)?;
    let (submission, query) = submit(&mut controller);
    if submission != Submission::Started {
        controller.teardown();
        anyhow::bail!("nothing to ask: no query or no such history entry");
    }

    let (tx, mut rx) = mpsc::channel::<SessionEvent>(64);
    let marker = if json { None } else { HighlightMarker::for_style(config.ui.highlight) };
    let printer = tokio::spawn(async move {
        let mut printer = Printer::new(io::stdout(), marker);
        let mut failed = false;
        while let Some(event) = rx.recv().await {
            if let SessionEvent::Finalized { end, .. } = &event {
                failed = end.is_failure();
            }
            if !json {
                printer.handle(&event)?;
            }
        }
        Ok::<bool, io::Error>(failed)
    });

    let _ = tx.send(SessionEvent::Started(query)).await;
    controller.drive(tx).await;
    let failed = printer.await.context("output task panicked")??;

    let messages = controller.teardown();
    if json {
        let mut out = io::stdout();
        serde_json::to_writer_pretty(&mut out, &exchange_json(&messages))?;
        writeln!(out)?;
    }
    if failed {
        anyhow::bail!("answer stream ended with an error; the answer may be incomplete");
    }
    Ok(())
}

async fn upload(config: &Config, file: &Path) -> anyhow::Result<()> {
    let client = UploadClient::new(&config.server)?;
    let reply = client
        .upload(file)
        .await
        .with_context(|| format!("uploading {}", file.display()))?;
    info!(file = %file.display(), "upload complete");
    let reply = reply.trim();
    if reply.is_empty() {
        println!("Uploaded {}", file.display());
    } else {
        println!("{reply}");
    }
    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
