//! twinmem CLI — chat loop and operator views for the memory orchestrator.
//!
//! `chat` runs the per-turn policy against the configured backends.
//! `questions` gives the operator the ledger views and the answer-recording
//! operation. `tools` lists what each connected backend exposes.

mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::warn;
use twinmem_gateway::{BackendConfig, Gateway, RpcBackend, ADAPTER_GRAPH, ADAPTER_SIMILARITY};
use twinmem_ledger::{LedgerBackend, QuestionLedger};
use twinmem_ledger::store::{render_answered, render_unanswered};
use twinmem_policy::Policy;
use twinmem_types::config::TwinConfig;
use twinmem_types::question::AnswerStatus;

#[derive(Parser)]
#[command(name = "twinmem", about = "Conversational memory orchestrator", version)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an interactive chat session.
    Chat,
    /// Operator views over the question ledger.
    Questions {
        #[command(subcommand)]
        command: QuestionsCommand,
    },
    /// List the operations each connected backend exposes.
    Tools,
}

#[derive(Subcommand)]
enum QuestionsCommand {
    /// List questions with no official answer.
    List,
    /// List questions that have been answered.
    Answered,
    /// Record the official answer for a question.
    Answer {
        /// Question id.
        id: i64,
        /// The answer text.
        answer: String,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref());

    match cli.command {
        Command::Chat => chat(&config).await,
        Command::Questions { command } => questions(&config, command),
        Command::Tools => tools(&config).await,
    }
}

/// Open the ledger and connect whichever external backends come up.
/// A backend that fails to connect is skipped with a warning; its searches
/// will surface as degraded rather than aborting the session.
async fn build_gateway(config: &TwinConfig) -> Result<Gateway> {
    let ledger = QuestionLedger::open(&config::ledger_path(config))?;
    let mut gateway = Gateway::new();
    gateway.register(Box::new(LedgerBackend::new(ledger)));

    let launches = [
        (ADAPTER_GRAPH, &config.graph),
        (ADAPTER_SIMILARITY, &config.similarity),
    ];
    for (name, launch) in launches {
        let backend_config = BackendConfig::from_launch(name, launch, config.call_timeout_secs);
        match RpcBackend::connect(backend_config).await {
            Ok(backend) => gateway.register(Box::new(backend)),
            Err(e) => warn!(adapter = name, error = %e, "Backend unavailable"),
        }
    }

    Ok(gateway)
}

async fn chat(config: &TwinConfig) -> Result<()> {
    let gateway = build_gateway(config).await?;
    let policy = Policy::new(gateway, config.operator_name.clone());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    println!("twinmem chat — type 'exit' to quit");

    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let utterance = line.trim();
        if utterance.is_empty() {
            continue;
        }
        if utterance == "exit" || utterance == "quit" {
            break;
        }

        let outcome = policy.handle_turn(utterance).await;
        println!("{}", outcome.response);
    }

    Ok(())
}

fn questions(config: &TwinConfig, command: QuestionsCommand) -> Result<()> {
    let ledger = QuestionLedger::open(&config::ledger_path(config))?;
    match command {
        QuestionsCommand::List => {
            println!("{}", render_unanswered(&ledger.list_unanswered()?));
        }
        QuestionsCommand::Answered => {
            let rendered = render_answered(&ledger.list_answered()?);
            if rendered.is_empty() {
                println!("No answered questions found");
            } else {
                println!("{rendered}");
            }
        }
        QuestionsCommand::Answer { id, answer } => match ledger.record_answer(id, &answer)? {
            AnswerStatus::Recorded => println!("Recorded answer to question {id}"),
            AnswerStatus::NotFound => println!("No question with id {id}"),
        },
    }
    Ok(())
}

async fn tools(config: &TwinConfig) -> Result<()> {
    let gateway = build_gateway(config).await?;
    for adapter in gateway.adapter_names() {
        println!("{adapter}:");
        match gateway.list_capabilities(adapter).await {
            Ok(caps) => {
                for cap in caps {
                    println!("  - {}: {}", cap.name, cap.description);
                }
            }
            Err(e) => println!("  (discovery failed: {e})"),
        }
    }
    Ok(())
}
