use thiserror::Error;

/// Errors surfaced by every remote call and local collaborator in llmdesk.
///
/// None of these are retried. A failed turn leaves conversation state untouched
/// and the user issues the action again.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network, DNS or connection failure before a response arrived
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success status from the provider, message kept verbatim
    #[error("API error ({status}): {message}")]
    RemoteService { status: u16, message: String },

    /// Success status but a body we could not interpret
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Missing or invalid input, reported before any request is made
    #[error("{0}")]
    Input(String),

    /// Local filesystem failure (cache, image or report files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache entry could not be encoded or decoded
    #[error("Cache error: {0}")]
    Cache(#[from] serde_json::Error),
}

impl LlmError {
    pub fn input(message: impl Into<String>) -> Self {
        LlmError::Input(message.into())
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
