// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use ragchat_config::{BusyPolicy, HighlightStyle};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ragchat",
    about = "Ask questions against a retrieval-augmented answer service and watch the answers stream in",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config file (merged on top of auto-discovered files)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Base URL of the answer service, e.g. "http://localhost:8080"
    #[arg(long, short = 's', value_name = "URL")]
    pub server: Option<String>,

    /// What to do with a query typed while an answer is still streaming
    #[arg(long, value_enum)]
    pub busy: Option<BusyPolicy>,

    /// How overlap with the previous message is highlighted
    #[arg(long, value_enum)]
    pub highlight: Option<HighlightStyle>,

    /// State file holding the query history
    #[arg(long, value_name = "PATH")]
    pub history_file: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask one question, stream the answer to stdout and exit
    Ask {
        /// The question; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Print the finished exchange as JSON instead of streaming text
        #[arg(long)]
        json: bool,
    },
    /// Ask a question from history again (see `ragchat history` for indices)
    Replay {
        index: usize,
        /// Print the finished exchange as JSON instead of streaming text
        #[arg(long)]
        json: bool,
    },
    /// Add a plain-text (.txt) document to the knowledge base
    Upload {
        file: PathBuf,
    },
    /// List past queries, oldest first
    History {
        /// Show only the most recent N entries
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
    /// Print the effective configuration and exit
    ShowConfig,
    /// Generate shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "ragchat", &mut std::io::stdout());
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
