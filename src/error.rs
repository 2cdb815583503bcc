use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqawkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Malformed row at line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Ambiguous reference: {0}")]
    AmbiguousReference(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for SqawkError {
    fn from(err: rusqlite::Error) -> Self {
        SqawkError::Engine(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SqawkError>;
