// src/main.rs
// Draftsmith CLI - run AI actions against a scratch document

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use draftsmith::applier::InMemoryDocument;
use draftsmith::config::{AiConfig, ConfigFile, EnvOverrides};
use draftsmith::providers::default_registry;
use draftsmith::types::{ExecutionResult, Proposal, StreamEvent, TextRange};
use draftsmith::AiOrchestrator;
use futures::StreamExt;
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

const SECTION_ID: &str = "section-1";

#[derive(Parser)]
#[command(name = "draftsmith")]
#[command(about = "AI actions for documents: rewrite, translate, summarize, illustrate")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.draftsmith/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available actions
    Actions {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered providers and their capabilities
    Providers,

    /// Run an action and wait for the proposal
    Run(ActionArgs),

    /// Run an action, printing output as it streams
    Stream(ActionArgs),
}

#[derive(Args)]
struct ActionArgs {
    /// Action id (see `draftsmith actions`)
    action: String,

    /// Section text to work on
    #[arg(short, long)]
    text: String,

    /// Document title
    #[arg(long, default_value = "Untitled")]
    title: String,

    /// Selected character range, e.g. 0..12
    #[arg(short, long, value_parser = parse_range, conflicts_with = "select_all")]
    select: Option<TextRange>,

    /// Select the whole section
    #[arg(long)]
    select_all: bool,

    #[arg(short, long)]
    instruction: Option<String>,

    /// Target language (translate-selection)
    #[arg(short, long)]
    language: Option<String>,

    #[arg(long)]
    max_words: Option<u64>,

    /// Preferred provider id
    #[arg(long)]
    provider: Option<String>,

    /// Leave the document untouched
    #[arg(long)]
    no_apply: bool,
}

fn parse_range(raw: &str) -> std::result::Result<TextRange, String> {
    let (start, end) = raw
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got '{}'", raw))?;
    let start = start.trim().parse().map_err(|e| format!("bad start: {}", e))?;
    let end = end.trim().parse().map_err(|e| format!("bad end: {}", e))?;
    Ok(TextRange::new(start, end))
}

fn load_config(path: Option<&PathBuf>) -> AiConfig {
    let mut config = match path {
        Some(path) => ConfigFile::load_from(path).into_config(),
        None => ConfigFile::load().into_config(),
    };
    EnvOverrides::from_env().apply(&mut config);
    config
}

fn document_and_input(args: &ActionArgs) -> Result<(InMemoryDocument, draftsmith::actions::ActionInput)> {
    let document = InMemoryDocument::new("scratch", &args.title).with_section(SECTION_ID, "", &args.text);
    let mut input = document
        .input_for("cli", SECTION_ID)
        .ok_or_else(|| anyhow!("section {} missing", SECTION_ID))?;

    let selection = if args.select_all {
        Some(TextRange::new(0, args.text.chars().count()))
    } else {
        args.select
    };
    if let Some(range) = selection {
        input = input.with_selection(range);
    }
    if let Some(instruction) = &args.instruction {
        input = input.with_instruction(instruction);
    }
    if let Some(language) = &args.language {
        input = input.with_language(language);
    }
    if let Some(max_words) = args.max_words {
        input = input.with_option("max_words", Value::from(max_words));
    }
    if let Some(provider) = &args.provider {
        input = input.with_option("provider", Value::from(provider.as_str()));
    }
    Ok((document, input))
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
}

fn print_proposal(proposal: &Proposal) {
    println!();
    println!("Proposal {} ({})", proposal.id, proposal.label);
    println!("  provider: {}{}", proposal.provider_id, if proposal.was_fallback_used { " (fallback)" } else { "" });
    println!("  route:    {}", proposal.route_reason);
    println!("  changes:  {}", proposal.summary);
    if let Some(diff) = proposal.diff_preview() {
        println!();
        print!("{}", diff);
    }
}

async fn apply(orchestrator: &AiOrchestrator, proposal: &Proposal, mut document: InMemoryDocument) -> Result<()> {
    let report = orchestrator
        .applier()
        .apply(proposal, &mut document)
        .await
        .context("failed to apply proposal")?;
    info!(applied = report.applied, "Applied proposal");

    println!();
    println!("Result:");
    println!("{}", document.section_text(SECTION_ID).unwrap_or_default());
    if let Some(cover) = &document.cover {
        println!("[cover: {} ({})]", cover.artifact_id, cover.mime_type);
    }
    Ok(())
}

async fn run_action(orchestrator: &AiOrchestrator, args: ActionArgs) -> Result<()> {
    let (document, input) = document_and_input(&args)?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match orchestrator.execute(&args.action, &input, &cancel).await {
        ExecutionResult::Success(proposal) => {
            print_proposal(&proposal);
            if !args.no_apply {
                apply(orchestrator, &proposal, document).await?;
            }
            Ok(())
        }
        ExecutionResult::Blocked(r) => bail!("blocked [{}]: {}", r.code, r.message),
        ExecutionResult::Failed(r) => bail!("failed [{}]: {}", r.code, r.message),
        ExecutionResult::Cancelled => bail!("cancelled"),
    }
}

async fn stream_action(orchestrator: &AiOrchestrator, args: ActionArgs) -> Result<()> {
    let (document, input) = document_and_input(&args)?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let capability = orchestrator.streaming_capability(&args.action);
    info!(supported = capability.supported, reason = %capability.reason, "Streaming capability");

    let mut session = orchestrator.execute_streaming(&args.action, input, cancel);
    let mut stdout = std::io::stdout();
    let mut failure = None;

    while let Some(event) = session.events.next().await {
        match event {
            StreamEvent::Started => {}
            StreamEvent::TextDelta(delta) => {
                print!("{}", delta);
                stdout.flush()?;
            }
            StreamEvent::ImageDelta(id) => println!("[image {}]", id),
            StreamEvent::Completed => println!(),
            StreamEvent::Failed(f) => failure = Some(f),
        }
    }

    if let Some(f) = failure {
        bail!("stream failed [{}]: {}", f.code, f.message);
    }
    let proposal = session
        .completion
        .await
        .ok_or_else(|| anyhow!("stream completed without a proposal"))?;

    print_proposal(&proposal);
    if !args.no_apply {
        apply(orchestrator, &proposal, document).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Some(home) = dirs::home_dir() {
        let _ = dotenvy::from_path(home.join(".draftsmith/.env"));
    }

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let registry = default_registry(&config)?;
    let orchestrator = AiOrchestrator::builder(config).registry(registry).build();

    match cli.command {
        Commands::Actions { json } => {
            let actions = orchestrator.list_actions();
            if json {
                println!("{}", serde_json::to_string_pretty(&actions)?);
            } else {
                for action in actions {
                    let ready = if orchestrator.can_run(&action.id) { "" } else { " (unavailable)" };
                    println!("{:<22} {}{}", action.id, action.description, ready);
                }
            }
        }
        Commands::Providers => {
            for provider in orchestrator.registry().all() {
                let caps = provider.capabilities();
                let mut modalities = Vec::new();
                if caps.text {
                    modalities.push("text");
                }
                if caps.image {
                    modalities.push("image");
                }
                println!(
                    "{:<12} {:<28} {:<11} streaming={} billable={} available={}",
                    provider.id(),
                    provider.display_name(),
                    modalities.join(","),
                    caps.is_streaming(),
                    caps.billable,
                    provider.is_available()
                );
            }
        }
        Commands::Run(args) => run_action(&orchestrator, args).await?,
        Commands::Stream(args) => stream_action(&orchestrator, args).await?,
    }

    Ok(())
}
