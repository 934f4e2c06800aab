//! CSV export of the chat history.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use chrono::SecondsFormat;
use thiserror::Error;
use tracing::info;

use crate::history::Turn;

pub const HEADERS: [&str; 6] = [
    "Question",
    "Answer",
    "Model Provider",
    "Model Name",
    "PDF File(s)",
    "Timestamp",
];

/// Joins several source PDFs in one cell.
pub const SOURCE_DELIMITER: &str = "; ";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Write one header row and one row per turn, in the order given.
pub fn write_csv<W: Write>(turns: &[Turn], writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADERS)?;
    for turn in turns {
        let sources = turn.sources.join(SOURCE_DELIMITER);
        let timestamp = turn.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        wtr.write_record([
            turn.question.as_str(),
            turn.answer.as_str(),
            turn.provider.as_str(),
            turn.model.as_str(),
            sources.as_str(),
            timestamp.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_string(turns: &[Turn]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv(turns, &mut buf)?;
    String::from_utf8(buf).map_err(|e| ExportError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Export to a file, returning the number of rows written (header excluded).
pub fn export_to_path(turns: &[Turn], path: &Path) -> Result<usize, ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_csv(turns, file)?;
    info!(rows = turns.len(), "Exported chat history to {}", path.display());
    Ok(turns.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn turn(i: u32, sources: &[&str]) -> Turn {
        Turn {
            question: format!("Question {i}?"),
            answer: format!("Answer {i}, with a comma"),
            provider: "Gemini".to_string(),
            model: "gemini-1.5-flash".to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, i).unwrap(),
        }
    }

    fn read_rows(csv_text: &str) -> Vec<Vec<String>> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(false).from_reader(csv_text.as_bytes());
        rdr.records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn n_turns_give_n_rows_in_order() {
        let turns: Vec<Turn> = (0..3).map(|i| turn(i, &["a.pdf"])).collect();
        let rows = read_rows(&to_csv_string(&turns).unwrap());

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], HEADERS);
        for (i, row) in rows[1..].iter().enumerate() {
            assert_eq!(row.len(), 6);
            assert!(row.iter().all(|cell| !cell.is_empty()));
            assert_eq!(row[0], format!("Question {i}?"));
        }
        assert_eq!(rows[1][5], "2024-05-01T12:00:00Z");
        assert_eq!(rows[1][1], "Answer 0, with a comma");
    }

    #[test]
    fn multiple_sources_share_one_cell() {
        let rows = read_rows(&to_csv_string(&[turn(0, &["a.pdf", "b.pdf"])]).unwrap());
        assert_eq!(rows[1][4], "a.pdf; b.pdf");
    }

    #[test]
    fn empty_history_is_header_only() {
        let rows = read_rows(&to_csv_string(&[]).unwrap());
        assert_eq!(rows, vec![HEADERS.to_vec()]);
    }

    #[test]
    fn export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("chat_history.csv");
        let written = export_to_path(&[turn(0, &["a.pdf"]), turn(1, &["a.pdf"])], &path).unwrap();
        assert_eq!(written, 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(read_rows(&text).len(), 3);
    }
}
