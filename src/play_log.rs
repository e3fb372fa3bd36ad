use std::path::{Path, PathBuf};

const DELIMITER: char = ';';

/// One line of the now playing log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRecord {
    pub artist: String,
    pub title: String,
}

impl PlayRecord {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
        }
    }
}

impl std::fmt::Display for PlayRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlayLogError {
    #[error("Cannot open play log {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read the semicolon separated `artist;title` log (ISO-8859-1, no header).
pub fn read_play_log(path: &Path) -> Result<Vec<PlayRecord>, PlayLogError> {
    log::info!("Reading play log {}", path.display());
    let bytes = std::fs::read(path).map_err(|source| PlayLogError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_play_log(&decode_latin1(&bytes));
    log::debug!("Parsed {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Every byte of ISO-8859-1 is the code point of the same value.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

pub fn parse_play_log(contents: &str) -> Vec<PlayRecord> {
    let mut records = Vec::new();
    for (line_number, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match split_fields(line).as_slice() {
            [artist, title] => records.push(PlayRecord::new(artist.as_str(), title.as_str())),
            fields => log::warn!(
                "Skipping play log line {}: expected 2 fields, found {}",
                line_number + 1,
                fields.len()
            ),
        }
    }
    records
}

/// Split one line on the delimiter, honouring double quoted fields.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' if in_quotes => in_quotes = false,
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            DELIMITER if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}
