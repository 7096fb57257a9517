use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unauthorized: {0}")]
    Auth(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("store failed: {0}")]
    Store(#[from] StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blocking task failed: {0}")]
    Task(String),
}

impl IngestError {
    pub fn kind(&self) -> IngestErrorKind {
        match self {
            Self::Auth(_) => IngestErrorKind::Auth,
            Self::Validation(_) | Self::InvalidChunkConfig(_) => IngestErrorKind::Validation,
            Self::Extraction(_) | Self::Io(_) | Self::Task(_) => IngestErrorKind::Extraction,
            Self::Embedding(_) => IngestErrorKind::Embedding,
            Self::Store(_) => IngestErrorKind::Store,
        }
    }
}

/// Failure category reported to callers of the ingestion entry point.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngestErrorKind {
    Auth,
    Validation,
    Extraction,
    Embedding,
    Store,
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("provider rejected credentials: {0}")]
    Auth(String),

    #[error("provider quota exhausted: {0}")]
    Quota(String),

    #[error("provider request timed out: {0}")]
    Timeout(String),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("malformed embedding response: {0}")]
    InvalidResponse(String),

    #[error("http error: {0}")]
    Http(reqwest::Error),

    #[error("invalid embedding config: {0}")]
    Config(String),
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else {
            Self::Http(error)
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("embedding dimension {actual} does not match store dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("store request failed: {0}")]
    Request(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
