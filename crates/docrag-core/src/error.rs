use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("The corpus is empty; build the knowledge base first")]
    EmptyCorpus,

    #[error("No terms could be extracted for the index")]
    NoVocabulary,

    #[error("No supported documents found in {0}")]
    NoDocuments(String),

    #[error("Responder failed: {0}")]
    Responder(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// `NotFound` for a missing path, `Io` for anything else.
    pub fn from_io_at(err: std::io::Error, path: &std::path::Path) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.display().to_string())
        } else {
            Error::Io(err)
        }
    }
}
