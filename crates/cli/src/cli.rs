use std::path::PathBuf;

use clap::Parser;

/// Chat with your PDF files.
///
/// Index one or more PDFs, then ask questions in a terminal REPL. Answers are
/// generated by a hosted or local LLM from the passages retrieved from the
/// PDFs.
#[derive(Parser, Debug)]
#[command(name = "pdfchat", version, about = "Chat with your PDF files")]
pub struct CliArgs {
    /// LLM provider: groq, gemini, openai or ollama
    /// (default: config file, then LLM_PROVIDER, then groq)
    #[arg(long)]
    pub provider: Option<String>,

    /// Model name (uses the provider's default if not set)
    #[arg(long)]
    pub model: Option<String>,

    /// API key for the selected provider (overrides env var and config file)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Path to config file (default: ~/.config/pdfchat/config.toml)
    #[arg(long)]
    pub config: Option<String>,

    /// PDF file to index at start-up (repeatable)
    #[arg(long = "pdf", value_name = "PATH")]
    pub pdfs: Vec<PathBuf>,

    /// Enable developer commands such as /inspect
    #[arg(long, env = "PDFCHAT_DEVELOPER")]
    pub developer: bool,

    /// Where /export writes the chat history
    #[arg(long, default_value = "chat_history.csv")]
    pub export_path: PathBuf,

    /// Print the available providers and models, then exit
    #[arg(long)]
    pub list_models: bool,
}
