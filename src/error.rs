use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("duration must be one of 15, 30, 60, 120 seconds (got {0})")]
    InvalidDuration(u32),

    #[error("accuracy must be between 0 and 100 (got {0})")]
    InvalidAccuracy(u32),

    #[error("no snippets available for {language}")]
    NoSnippets { language: String },

    #[error("snippet corpus file not found: {path}")]
    MissingCorpus { path: PathBuf },

    #[error("snippet {id} is empty")]
    EmptySnippet { id: String },

    #[error("result sink disconnected")]
    SinkClosed,
}
