//! REPL input parsing. Lines starting with `/` are commands; anything else is
//! a question for the loaded documents.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Index a new set of PDFs, replacing the current one.
    Upload(Vec<PathBuf>),
    Reset,
    Clear,
    Undo,
    /// Write history as CSV, optionally to a path other than the default.
    Export(Option<PathBuf>),
    History,
    Model {
        provider: String,
        model: Option<String>,
    },
    Models,
    Files,
    Inspect(String),
    Help,
    Quit,
    Ask(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command '/{0}' (type /help for a list)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("unterminated quote in arguments")]
    UnterminatedQuote,
}

pub const HELP: &str = "\
Commands:
  /upload <file.pdf> [more.pdf ...]  index PDFs (replaces the current set)
  /reset                             clear history, documents and model choice
  /clear                             clear history and documents, keep the model
  /undo                              remove the last question and answer
  /export [path]                     write the chat history as CSV
  /history                           show the chat history
  /model <provider> [model]          switch provider and model
  /models                            list providers and models
  /files                             list indexed PDFs
  /inspect <query>                   show the top matching chunks (developer mode)
  /help                              show this help
  /quit                              leave
Anything else is sent as a question about the indexed PDFs.";

/// Parse one line of REPL input. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line == "exit" || line == "quit" {
        return Ok(Some(Command::Quit));
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Ask(line.to_string())));
    };

    let (name, raw_args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name.to_lowercase().as_str() {
        "upload" => {
            let paths = split_args(raw_args)?;
            if paths.is_empty() {
                return Err(CommandError::Usage("/upload <file.pdf> [more.pdf ...]"));
            }
            Command::Upload(paths.into_iter().map(PathBuf::from).collect())
        }
        "reset" => Command::Reset,
        "clear" => Command::Clear,
        "undo" => Command::Undo,
        "export" => Command::Export(split_args(raw_args)?.into_iter().next().map(PathBuf::from)),
        "history" => Command::History,
        "model" => {
            let mut args = split_args(raw_args)?.into_iter();
            let provider = args
                .next()
                .ok_or(CommandError::Usage("/model <provider> [model]"))?;
            Command::Model {
                provider,
                model: args.next(),
            }
        }
        "models" => Command::Models,
        "files" => Command::Files,
        "inspect" => {
            if raw_args.is_empty() {
                return Err(CommandError::Usage("/inspect <query>"));
            }
            Command::Inspect(raw_args.to_string())
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// Split on whitespace, keeping double-quoted runs together so paths with
/// spaces survive.
fn split_args(input: &str) -> Result<Vec<String>, CommandError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if in_quotes {
        return Err(CommandError::UnterminatedQuote);
    }
    if has_token {
        args.push(current);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(line: &str) -> Command {
        parse(line).unwrap().unwrap()
    }

    #[test]
    fn blank_line_is_ignored() {
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn plain_text_is_a_question() {
        assert_eq!(
            cmd("  What color is the sky?  "),
            Command::Ask("What color is the sky?".into())
        );
    }

    #[test]
    fn upload_accepts_quoted_paths() {
        assert_eq!(
            cmd(r#"/upload a.pdf "my notes/b c.pdf""#),
            Command::Upload(vec![PathBuf::from("a.pdf"), PathBuf::from("my notes/b c.pdf")])
        );
        assert_eq!(parse("/upload").unwrap_err(), CommandError::Usage("/upload <file.pdf> [more.pdf ...]"));
        assert_eq!(parse(r#"/upload "open.pdf"#).unwrap_err(), CommandError::UnterminatedQuote);
    }

    #[test]
    fn model_with_and_without_name() {
        assert_eq!(
            cmd("/model groq llama3-70b-8192"),
            Command::Model {
                provider: "groq".into(),
                model: Some("llama3-70b-8192".into())
            }
        );
        assert_eq!(
            cmd("/model Gemini"),
            Command::Model {
                provider: "Gemini".into(),
                model: None
            }
        );
        assert!(matches!(parse("/model"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn export_path_is_optional() {
        assert_eq!(cmd("/export"), Command::Export(None));
        assert_eq!(cmd("/export out.csv"), Command::Export(Some(PathBuf::from("out.csv"))));
    }

    #[test]
    fn inspect_keeps_the_whole_query() {
        assert_eq!(cmd("/inspect  the sky is"), Command::Inspect("the sky is".into()));
        assert!(matches!(parse("/inspect"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn simple_commands() {
        assert_eq!(cmd("/reset"), Command::Reset);
        assert_eq!(cmd("/CLEAR"), Command::Clear);
        assert_eq!(cmd("/undo"), Command::Undo);
        assert_eq!(cmd("/history"), Command::History);
        assert_eq!(cmd("/models"), Command::Models);
        assert_eq!(cmd("/files"), Command::Files);
        assert_eq!(cmd("/help"), Command::Help);
        assert_eq!(cmd("/quit"), Command::Quit);
        assert_eq!(cmd("exit"), Command::Quit);
    }

    #[test]
    fn unknown_command() {
        assert_eq!(parse("/frobnicate").unwrap_err(), CommandError::Unknown("frobnicate".into()));
    }
}
