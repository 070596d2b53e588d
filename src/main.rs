//! # codescout CLI
//!
//! Runs the HTTP server, or drives the same pipelines directly from the
//! terminal.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `codescout serve` | Start the HTTP server on `PORT` |
//! | `codescout process <github-url>` | Fetch and index a repository |
//! | `codescout page <url>` | Scrape a web page and index it |
//! | `codescout indexes` | List indexes |
//! | `codescout ask <index> "<question>"` | One-shot answer from an index |
//! | `codescout chat --index <index>` | Interactive chat against a running server |
//!
//! ## Examples
//!
//! ```bash
//! PORT=3001 codescout serve
//! codescout process https://github.com/tokio-rs/axum/tree/main
//! codescout ask axum "How are extractors ordered?"
//! SERVER_URL=http://localhost:3001 codescout chat --index axum
//! ```

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use codescout::chat::{ChatSession, HttpAnswerBackend};
use codescout::traits::Services;
use codescout::{config, gateway, ingest, logging, server};

/// codescout: chat with a GitHub repository or web page.
///
/// Settings are read from an optional TOML file; credentials and `PORT`
/// always come from the environment.
#[derive(Parser)]
#[command(name = "codescout", version, about)]
struct Cli {
    /// Path to a configuration file (TOML). Optional.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Requires `PORT` (or `server.port`); exits with an error otherwise.
    Serve,

    /// Fetch every file of a GitHub repository and index it.
    ///
    /// Accepts `https://github.com/<owner>/<repo>[/tree/<branch>]`.
    Process {
        /// Repository URL.
        github_url: String,
    },

    /// Scrape a web page and index its text under its host name.
    Page {
        /// Page URL.
        url: String,
    },

    /// List indexes known to the index service.
    Indexes,

    /// Answer one question from an index.
    Ask {
        /// Index name (the repository name for processed repositories).
        index: String,
        /// The question.
        question: String,
    },

    /// Interactive chat against a running server (`SERVER_URL`).
    Chat {
        /// Index to ask questions about.
        #[arg(long)]
        index: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init();

    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Process { github_url } => {
            let services = Services::from_config(&cfg)?;
            let ingest = ingest::process_repository(&services, &github_url).await?;
            let failed_fetches = ingest
                .result
                .iter()
                .filter(|d| d.metadata.error.is_some())
                .count();
            println!("process {}", github_url);
            println!("  index: {}", ingest.index_name);
            println!("  files fetched: {}", ingest.result.len());
            println!("  fetch failures: {}", failed_fetches);
            println!("  documents indexed: {}", ingest.report.submitted);
            println!(
                "  batches: {} ({} failed)",
                ingest.report.batches, ingest.report.failed_batches
            );
        }
        Commands::Page { url } => {
            let services = Services::from_config(&cfg)?;
            let index_name = ingest::process_page(&services, &url).await?;
            println!("indexed {} as {}", url, index_name);
        }
        Commands::Indexes => {
            let services = Services::from_config(&cfg)?;
            for index in services.index.list_indexes().await? {
                println!("{}", index.index_name);
            }
        }
        Commands::Ask { index, question } => {
            let services = Services::from_config(&cfg)?;
            let answer = gateway::answer(&services, &question, &index).await?;
            println!("{}", answer);
        }
        Commands::Chat { index } => {
            run_chat(&cfg, index).await?;
        }
    }

    Ok(())
}

async fn run_chat(cfg: &config::Config, index: String) -> anyhow::Result<()> {
    let backend = HttpAnswerBackend::new(cfg.http.client()?, &cfg.public_url()?);
    let mut session = ChatSession::new(backend, index);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "/quit" || question == "/exit" {
            break;
        }

        let reply = session.send(question).await;
        println!("\n{}\n", reply.content);
        if let Some(err) = session.error() {
            eprintln!("{}", err);
        }
    }

    Ok(())
}
