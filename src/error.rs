use thiserror::Error;

/// Errors surfaced to callers of the library.
///
/// Expected attempt edge conditions (empty question list, double submission,
/// out-of-range navigation) are absorbed by the session and never end up here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("history database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("invalid question set: {0}")]
    InvalidQuestionSet(String),
}

pub type Result<T> = std::result::Result<T, Error>;
