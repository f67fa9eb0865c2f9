//! kiln - terminal chat client for local Ollama models

mod commands;
mod config;
mod ui;

use clap::Parser;
use std::io::Write;
use tokio::sync::mpsc;

use kiln_api::{GenerateEvent, OllamaClient};
use kiln_session::{ChatSession, SessionConfig, Submission, WorkerEvent, run_request};

/// kiln - chat with local models
#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Inference server base URL
    #[arg(short, long, default_value = "http://localhost:11434")]
    endpoint: String,

    /// Model identifier to use (e.g. llama2:7b)
    #[arg(short, long)]
    model: Option<String>,

    /// Stream responses for this run regardless of the saved setting
    #[arg(long, conflicts_with = "no_stream")]
    stream: bool,

    /// Disable streaming for this run regardless of the saved setting
    #[arg(long)]
    no_stream: bool,

    /// Run one prompt non-interactively and print the response
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("kiln=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let cfg = config::Config::load();
    let client = OllamaClient::new(&args.endpoint);

    let session_config = SessionConfig {
        endpoint: args.endpoint.clone(),
        model: args.model.clone().unwrap_or_default(),
        system_prompt: cfg.system_prompt.clone(),
        streaming: if args.no_stream {
            false
        } else {
            cfg.use_streaming || args.stream
        },
    };

    // Non-interactive mode
    if let Some(prompt) = args.command {
        return run_once(client, session_config, &prompt).await;
    }

    let session = ChatSession::new(session_config);
    ui::run_tui(client, session, cfg).await
}

/// One prompt in, one response out; chunks print as they arrive in
/// streaming mode.
async fn run_once(
    client: OllamaClient,
    session_config: SessionConfig,
    prompt: &str,
) -> anyhow::Result<()> {
    if session_config.model.is_empty() {
        anyhow::bail!("no model selected; pass --model <identifier>");
    }

    let mut session = ChatSession::new(session_config);
    let pending = match session.submit(prompt)? {
        Submission::Request(pending) => pending,
        Submission::Command(_) => anyhow::bail!("slash commands need the interactive session"),
        Submission::Empty => anyhow::bail!("nothing to send"),
    };

    let (tx, mut rx) = mpsc::channel::<WorkerEvent>(32);
    tokio::spawn(run_request(client, pending, tx));

    let mut streamed = false;
    while let Some(worker_event) = rx.recv().await {
        let event = worker_event.event.clone();
        session.apply(worker_event);
        match event {
            GenerateEvent::Chunk { delta } => {
                streamed = true;
                print!("{delta}");
                std::io::stdout().flush().ok();
            }
            GenerateEvent::Done { text } => {
                if streamed {
                    println!();
                } else {
                    println!("{text}");
                }
                break;
            }
            GenerateEvent::Error { message } => {
                anyhow::bail!("{message}");
            }
        }
    }

    Ok(())
}
