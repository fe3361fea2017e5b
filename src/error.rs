use std::path::PathBuf;

/// Errors surfaced by the chapter pipeline
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse PDF document: {0}")]
    DocumentParse(String),

    #[error("empty response from LLM while detecting chapters")]
    EmptyResponse,

    #[error("could not interpret LLM response as a chapter list ({reason}): {raw}")]
    MalformedJson { reason: String, raw: String },

    #[error("cannot compute page offset: {0}")]
    Calibration(String),

    #[error("LLM request failed: {0}")]
    Transport(String),

    #[error("LLM request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("LLM endpoint returned {status}: {body}")]
    Llm { status: u16, body: String },

    #[error("chapter store error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no text found on index pages {start}-{end}")]
    NoIndexText { start: u32, end: u32 },

    #[error("no chapters found in the extracted index text")]
    NoChapters,

    #[error("chapter '{0}' is not in the stored table of contents")]
    ChapterNotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Transient LLM failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) | Error::Timeout { .. } => true,
            Error::Llm { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
