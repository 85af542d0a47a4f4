use thiserror::Error;

/// Errors surfaced by the dataset, vectorizer and similarity index.
#[derive(Error, Debug)]
pub enum ScoutError {
    /// The population is missing required fields or is otherwise malformed.
    #[error("data error: {0}")]
    Data(String),

    /// A player id or name is absent from the population.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl ScoutError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScoutError::NotFound(_))
    }

    pub fn is_data(&self) -> bool {
        matches!(self, ScoutError::Data(_))
    }
}

/// Failures talking to the text generation backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited")]
    RateLimited,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("request timeout")]
    Timeout,

    #[error("no Gemini API key configured")]
    MissingApiKey,
}

pub type Result<T> = std::result::Result<T, ScoutError>;
