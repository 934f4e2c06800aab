mod cli;
mod commands;
mod config;
mod terminal;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pdfchat_core::config::load_dotenv;
use pdfchat_core::{Config, UploadedFile};
use pdfchat_llm::catalog::PROVIDERS;
use pdfchat_rag::{ChatSession, ConfiguredBackends, ModelSelection};
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::commands::{Command, HELP};
use crate::config::CliConfig;
use crate::terminal::Terminal;

/// Outcome of one REPL command.
enum Flow {
    Continue,
    Quit,
}

/// Settings the REPL needs beyond the session itself.
struct ReplOptions {
    developer: bool,
    export_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let args = CliArgs::parse();
    let terminal = Terminal::new();

    if args.list_models {
        terminal.print_models(None)?;
        return Ok(());
    }

    let cli_config = CliConfig::load(args.config.as_deref())
        .context("failed to load CLI configuration")?;
    let config = Config::from_env();
    config.validate().context("invalid configuration")?;
    config.log_summary();

    // Resolve provider and model: CLI flag > config file > environment
    let provider = args
        .provider
        .clone()
        .or_else(|| cli_config.default_provider.clone())
        .unwrap_or_else(|| config.llm.provider.clone());
    let model = cli_config
        .resolve_model(&provider, args.model.as_deref())
        .or_else(|| {
            config
                .llm
                .model
                .clone()
                .filter(|_| provider.eq_ignore_ascii_case(&config.llm.provider))
        });
    let selection = ModelSelection::resolve(&provider, model.as_deref(), &config.ollama.model)
        .context("invalid provider or model")?;

    let mut backends = ConfiguredBackends::new(config.clone());
    for info in PROVIDERS {
        let cli_key = args
            .api_key
            .as_deref()
            .filter(|_| info.name == selection.provider);
        if let Some(key) = cli_config.resolve_api_key(info.name, cli_key) {
            backends = backends.with_api_key(info.name, key);
        }
    }

    let mut session = ChatSession::new(config, Box::new(backends), selection)
        .context("failed to start chat session")?;
    let options = ReplOptions {
        developer: args.developer || cli_config.developer,
        export_path: args.export_path.clone(),
    };

    terminal.print_banner(session.selection(), options.developer)?;

    if let Some(source) = session.base_corpus().map(|c| c.source().to_string()) {
        let message = format!("loading base corpus {source}...");
        let spinner = terminal.start_spinner(&message)?;
        let result = session.load_base_corpus().await;
        spinner.stop();
        match result {
            Ok(added) => terminal.print_info(&format!("Base corpus ready ({added} fragments embedded)"))?,
            Err(e) => terminal.print_error(&e.to_string())?,
        }
    }

    if !args.pdfs.is_empty() {
        upload(&terminal, &mut session, &args.pdfs).await?;
    }

    // REPL loop
    loop {
        let Some(line) = terminal.read_input()? else {
            break;
        };

        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                terminal.print_error(&e.to_string())?;
                continue;
            }
        };

        match execute(command, &terminal, &mut session, &options).await? {
            Flow::Continue => {}
            Flow::Quit => break,
        }
    }

    info!(session = %session.id(), turns = session.history().len(), "Session ended");
    terminal.print_info("Goodbye.")?;
    Ok(())
}

/// Run one command. Session errors are shown to the user and the REPL goes
/// on; only terminal I/O failures propagate.
async fn execute(
    command: Command,
    terminal: &Terminal,
    session: &mut ChatSession,
    options: &ReplOptions,
) -> Result<Flow> {
    match command {
        Command::Ask(question) => {
            let spinner = terminal.start_spinner("thinking...")?;
            let result = session.submit(&question).await;
            spinner.stop();
            match result {
                Ok(turn) => terminal.print_answer(&turn)?,
                Err(e) => terminal.print_error(&e.to_string())?,
            }
        }
        Command::Upload(paths) => upload(terminal, session, &paths).await?,
        Command::Reset => match session.reset() {
            Ok(()) => terminal.print_info(&format!(
                "Session reset. Model: {} / {}",
                session.selection().label(),
                session.selection().model
            ))?,
            Err(e) => terminal.print_error(&e.to_string())?,
        },
        Command::Clear => match session.clear_chat() {
            Ok(()) => terminal.print_info("Chat history and documents cleared.")?,
            Err(e) => terminal.print_error(&e.to_string())?,
        },
        Command::Undo => match session.undo() {
            Some(turn) => terminal.print_info(&format!("Removed: {}", turn.question))?,
            None => terminal.print_info("Nothing to undo.")?,
        },
        Command::Export(path) => {
            let path = path.unwrap_or_else(|| options.export_path.clone());
            match session.export_to(&path) {
                Ok(rows) => terminal.print_info(&format!(
                    "Exported {} row(s) to {}",
                    rows,
                    path.display()
                ))?,
                Err(e) => terminal.print_error(&e.to_string())?,
            }
        }
        Command::History => terminal.print_history(session.history())?,
        Command::Model { provider, model } => {
            let spinner = terminal.start_spinner("switching model...")?;
            let result = session.select_model(&provider, model.as_deref()).await;
            spinner.stop();
            match result {
                Ok(change) => {
                    terminal.print_info(&format!(
                        "Now using {} / {} (embeddings: {})",
                        change.selection.label(),
                        change.selection.model,
                        change.embedding_backend
                    ))?;
                    if let Some(report) = change.reindexed {
                        terminal.print_info("Documents re-indexed for the new embedding backend:")?;
                        terminal.print_index_report(&report)?;
                    }
                }
                Err(e) => terminal.print_error(&e.to_string())?,
            }
        }
        Command::Models => terminal.print_models(Some(session.selection()))?,
        Command::Files => terminal.print_files(session.documents())?,
        Command::Inspect(query) => {
            if !options.developer {
                terminal.print_error("/inspect is only available with --developer")?;
            } else {
                match session.inspect_previews(&query).await {
                    Ok(hits) => terminal.print_inspect(&hits)?,
                    Err(e) => terminal.print_error(&e.to_string())?,
                }
            }
        }
        Command::Help => terminal.print_info(HELP)?,
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// Read the given files from disk and index them as one submission.
/// Unreadable files are reported and left out.
async fn upload(terminal: &Terminal, session: &mut ChatSession, paths: &[PathBuf]) -> Result<()> {
    let files = read_files(terminal, paths)?;
    if files.is_empty() {
        terminal.print_error("no readable files to upload")?;
        return Ok(());
    }

    let spinner = terminal.start_spinner("indexing...")?;
    let result = session.upload(files).await;
    spinner.stop();
    match result {
        Ok(report) => terminal.print_index_report(&report)?,
        Err(e) => terminal.print_error(&e.to_string())?,
    }
    Ok(())
}

fn read_files(terminal: &Terminal, paths: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match UploadedFile::from_path(path) {
            Ok(file) => files.push(file),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read file");
                terminal.print_error(&format!("{}: {}", path.display(), e))?;
            }
        }
    }
    Ok(files)
}
