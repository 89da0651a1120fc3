use std::collections::HashSet;
use thiserror::Error;

/// Header of the column holding the words
pub const WORD_COLUMN: &str = "Word";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IngestError {
    #[error("CSV must contain a 'Word' column.")]
    MissingWordColumn,

    #[error("No words found in CSV.")]
    NoWords,

    #[error("Could not read CSV: {0}")]
    Malformed(String),
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        IngestError::Malformed(err.to_string())
    }
}

/// Extract the word list from an uploaded CSV.
///
/// Values are trimmed, blank cells skipped and repeated words dropped so that
/// each word appears once per job, in first-seen order.
pub fn read_words(source: &[u8]) -> Result<Vec<String>, IngestError> {
    let source = source.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(source);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let column = reader
        .headers()?
        .iter()
        .position(|h| h == WORD_COLUMN)
        .ok_or(IngestError::MissingWordColumn)?;

    let mut seen = HashSet::new();
    let mut words = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(word) = record.get(column) else {
            continue;
        };
        if word.is_empty() {
            continue;
        }
        if seen.insert(word.to_string()) {
            words.push(word.to_string());
        }
    }

    if words.is_empty() {
        return Err(IngestError::NoWords);
    }
    Ok(words)
}
