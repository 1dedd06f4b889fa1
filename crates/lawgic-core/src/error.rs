use thiserror::Error;

#[derive(Error, Debug)]
pub enum LawgicError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to initialize chat session: {0}")]
    SessionInit(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Attachment error: {name}: {message}")]
    Attachment { name: String, message: String },

    #[error("Invalid chat history: {0}")]
    History(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("A turn is already in flight")]
    TurnInFlight,

    #[error("Response exceeded {0} characters")]
    ResponseTooLarge(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl LawgicError {
    pub fn attachment(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Attachment {
            name: name.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LawgicError>;
