use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use folio::domain::ArtifactKind;
use folio::history::HistoryStore;
use folio::iteration::IterationCoordinator;
use folio::llm::{AnthropicClient, AnthropicConfig, StreamChunk, create_stream_channel};
use folio::trace::DebugTrace;
use folio::vcs::{GitRepo, Untracked, VersionControl};

mod cli;
mod config;

use cli::Cli;
use cli::TerminalDecisions;
use cli::commands::Commands;
use config::Config;

fn setup_logging(default_filter: &str) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("folio")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("folio.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn parse_target(target: &str) -> Result<ArtifactKind> {
    ArtifactKind::from_str(target).map_err(|e| eyre!("{}", e))
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Iterate {
            target,
            feedback,
            project,
        } => handle_iterate_command(target, feedback, project, config).await,
        Commands::History { target, project } => handle_history_command(target, project, config),
    }
}

async fn handle_iterate_command(target: &str, feedback: &str, project: &Path, config: &Config) -> Result<()> {
    let kind = parse_target(target)?;
    if feedback.trim().is_empty() {
        return Err(eyre!("Feedback must not be empty"));
    }
    info!("Iterate {} in {}: {}", kind, project.display(), feedback);

    let client = AnthropicClient::new(AnthropicConfig {
        model: config.llm.model.clone(),
        max_tokens: config.llm.max_tokens,
        timeout: Duration::from_millis(config.llm.timeout_ms),
    })
    .context("Failed to create LLM client")?;

    let vcs: Arc<dyn VersionControl> = if config.git.enabled {
        let root = config.git.repo_root.clone().unwrap_or_else(|| project.to_path_buf());
        Arc::new(GitRepo::new(root))
    } else {
        Arc::new(Untracked)
    };

    let trace = if config.debug.trace_enabled {
        DebugTrace::new(config.debug.trace_dir.clone())
    } else {
        DebugTrace::disabled()
    };

    let (sink, mut handle) = create_stream_channel(64);
    let printer = tokio::spawn(async move {
        let mut stdout = std::io::stdout();
        while let Some(chunk) = handle.recv().await {
            match chunk {
                StreamChunk::Text(text) => {
                    let _ = write!(stdout, "{}", text.dimmed());
                    let _ = stdout.flush();
                }
                StreamChunk::Done => {
                    let _ = writeln!(stdout);
                }
                StreamChunk::Error(e) => {
                    let _ = writeln!(stdout, "\n{} {}", "Stream error:".red(), e);
                }
            }
        }
    });

    let mut coordinator = IterationCoordinator::builder(project, Arc::new(client))
        .settings(config.iteration_settings())
        .vcs(vcs)
        .trace(trace)
        .display(sink)
        .decisions(Box::new(TerminalDecisions::stdio()))
        .build()
        .context("Failed to set up iteration")?;

    println!("{} {}", "Iterating:".cyan().bold(), kind.label());
    let result = coordinator.iterate(kind, feedback).await;

    drop(coordinator);
    let _ = printer.await;

    if result.context(format!("Iteration on {} failed", kind.label()))? {
        println!("{} {} updated", "Accepted:".green().bold(), kind.label());
    } else {
        println!("{} {} unchanged", "Aborted:".yellow().bold(), kind.label());
    }
    Ok(())
}

fn handle_history_command(target: &str, project: &Path, config: &Config) -> Result<()> {
    let kind = parse_target(target)?;
    info!("History for {} in {}", kind, project.display());

    let history = HistoryStore::open(project, kind)
        .with_limits(config.iteration.summary_max_chars, config.iteration.preview_chars);
    println!("{} {}", "History:".cyan().bold(), kind.label());
    print!("{}", history.summary());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging with the configured level as the default filter
    setup_logging(config.log_filter()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
