use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use pdfchat_llm::catalog::PROVIDERS;
use pdfchat_rag::index::IndexReport;
use pdfchat_rag::session::InspectHit;
use pdfchat_rag::{ModelSelection, Turn};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const USER_PROMPT: Color = Color::Green;
    const ANSWER: Color = Color::Cyan;
    const SOURCE: Color = Color::Yellow;
    const SUCCESS: Color = Color::DarkGreen;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
    const HEADER: Color = Color::Magenta;
}

/// Manages terminal I/O for the interactive REPL.
#[derive(Default)]
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }

    /// Print the startup banner.
    pub fn print_banner(&self, selection: &ModelSelection, developer: bool) -> Result<()> {
        let mut stdout = io::stdout();
        let mode = if developer { " | developer mode" } else { "" };
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("pdfchat"),
            ResetColor,
            Print(" - Chat with your PDF files\n"),
            SetForegroundColor(Colors::DIM),
            Print(format!(
                "Provider: {} | Model: {}{}\n",
                selection.label(),
                selection.model,
                mode
            )),
            Print("Upload PDFs with /upload, then ask a question. /help lists commands.\n"),
            Print("---\n"),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Read a line of user input with prompt.
    /// Returns None at end of input.
    pub fn read_input(&self) -> Result<Option<String>> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            Print("\n"),
            SetForegroundColor(Colors::USER_PROMPT),
            Print("you> "),
            ResetColor,
        )?;
        stdout.flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim().to_string()))
    }

    /// Print an answer followed by the files it was drawn from.
    pub fn print_answer(&self, turn: &Turn) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::ANSWER),
            Print(format!("{}\n", turn.answer)),
            ResetColor,
        )?;
        if !turn.sources.is_empty() {
            execute!(
                stdout,
                SetForegroundColor(Colors::SOURCE),
                Print(format!("sources: {}\n", turn.sources.join(", "))),
                ResetColor,
            )?;
        }
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("[{} / {}]\n", turn.provider, turn.model)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Summarise an indexing run, listing files that were skipped.
    pub fn print_index_report(&self, report: &IndexReport) -> Result<()> {
        let mut stdout = io::stdout();
        for doc in &report.documents {
            execute!(
                stdout,
                SetForegroundColor(Colors::SUCCESS),
                Print(format!(
                    "  indexed {} ({} pages, {} chunks)\n",
                    doc.filename, doc.pages, doc.chunks
                )),
                ResetColor,
            )?;
        }
        for failure in &report.failures {
            execute!(
                stdout,
                SetForegroundColor(Colors::ERROR),
                Print(format!("  skipped {}: {}\n", failure.filename, failure.error)),
                ResetColor,
            )?;
        }
        if report.base_chunks > 0 {
            execute!(
                stdout,
                SetForegroundColor(Colors::DIM),
                Print(format!("  base corpus: {} fragments embedded\n", report.base_chunks)),
                ResetColor,
            )?;
        }
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!(
                "{} chunks stored from {} file(s)\n",
                report.chunks_stored,
                report.documents.len()
            )),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Print the question/answer log, oldest first.
    pub fn print_history(&self, turns: &[Turn]) -> Result<()> {
        let mut stdout = io::stdout();
        if turns.is_empty() {
            return self.print_info("No questions asked yet.");
        }

        for (i, turn) in turns.iter().enumerate() {
            execute!(
                stdout,
                SetForegroundColor(Colors::DIM),
                Print(format!(
                    "#{} {} [{} / {}]\n",
                    i + 1,
                    turn.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    turn.provider,
                    turn.model
                )),
                SetForegroundColor(Colors::USER_PROMPT),
                Print(format!("Q: {}\n", turn.question)),
                SetForegroundColor(Colors::ANSWER),
                Print(format!("A: {}\n", turn.answer)),
                ResetColor,
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// List every provider and its models, marking the active selection.
    pub fn print_models(&self, current: Option<&ModelSelection>) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("Providers and models:\n"),
            ResetColor,
        )?;

        for provider in PROVIDERS {
            let key = match provider.api_key_env {
                Some(var) => format!("key: {var}"),
                None => "local, no key".to_string(),
            };
            execute!(
                stdout,
                Print(format!("{:<8} {:<8} ", provider.name, provider.label)),
                SetForegroundColor(Colors::DIM),
                Print(format!("({key}, {})\n", provider.playground)),
                ResetColor,
            )?;

            let active = current
                .filter(|s| s.provider == provider.name)
                .map(|s| s.model.as_str());
            if provider.models.is_empty() {
                let note = match active {
                    Some(model) => format!("    * {model} (any installed model)\n"),
                    None => "    (any installed model)\n".to_string(),
                };
                execute!(stdout, Print(note))?;
            }
            for model in provider.models {
                let marker = if active == Some(*model) { "*" } else { " " };
                execute!(stdout, Print(format!("  {marker} {model}\n")))?;
            }
        }
        stdout.flush()?;
        Ok(())
    }

    /// List the files backing the current index.
    pub fn print_files(&self, files: &[String]) -> Result<()> {
        if files.is_empty() {
            return self.print_info("No PDFs indexed.");
        }
        let mut stdout = io::stdout();
        for file in files {
            execute!(stdout, Print(format!("  {file}\n")))?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Show raw retrieval hits.
    pub fn print_inspect(&self, hits: &[InspectHit]) -> Result<()> {
        if hits.is_empty() {
            return self.print_info("No matching chunks.");
        }
        let mut stdout = io::stdout();
        for (i, hit) in hits.iter().enumerate() {
            let page = hit
                .page_number
                .map(|p| format!(", page {p}"))
                .unwrap_or_default();
            execute!(
                stdout,
                SetForegroundColor(Colors::SOURCE),
                Print(format!(
                    "[{}] {}{} (similarity {:.3})\n",
                    i + 1,
                    hit.source,
                    page,
                    hit.similarity
                )),
                SetForegroundColor(Colors::DIM),
                Print(format!("{}\n", hit.preview)),
                ResetColor,
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Show a spinner/waiting indicator. Returns a handle to stop it.
    pub fn start_spinner(&self, message: &str) -> Result<SpinnerHandle> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("{} ", message)),
            ResetColor,
        )?;
        stdout.flush()?;

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        let width = message.chars().count() + 2;

        let handle = std::thread::spawn(move || {
            let frames = ['|', '/', '-', '\\'];
            let mut i = 0;
            while running_clone.load(Ordering::SeqCst) {
                let mut stdout = io::stdout();
                execute!(
                    stdout,
                    SetForegroundColor(Colors::DIM),
                    Print(format!("\r{} {}", frames[i % frames.len()], " ")),
                    ResetColor,
                )
                .ok();
                stdout.flush().ok();
                i += 1;
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
            let mut stdout = io::stdout();
            execute!(stdout, Print(format!("\r{}\r", " ".repeat(width)))).ok();
            stdout.flush().ok();
        });

        Ok(SpinnerHandle {
            running,
            thread: Some(handle),
        })
    }

    /// Print an error message.
    pub fn print_error(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::ERROR),
            Print(format!("Error: {}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Print an info message.
    pub fn print_info(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }
}

/// Handle to a running spinner. Drop or call stop() to terminate it.
pub struct SpinnerHandle {
    running: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl SpinnerHandle {
    /// Stop the spinner and wait until its line is cleared.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            thread.join().ok();
        }
    }
}

impl Drop for SpinnerHandle {
    fn drop(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_stops_and_joins() {
        let term = Terminal::new();
        let spinner = term.start_spinner("thinking").unwrap();
        let running = spinner.running.clone();
        spinner.stop();
        assert!(!running.load(Ordering::SeqCst));
    }

    #[test]
    fn dropping_spinner_stops_it() {
        let term = Terminal::new();
        let running = {
            let spinner = term.start_spinner("indexing").unwrap();
            spinner.running.clone()
        };
        assert!(!running.load(Ordering::SeqCst));
    }
}
