use thiserror::Error;

/// Failure of a single completion request.
///
/// Every variant is shown to the user the same way; the distinction only
/// matters for [`CompletionError::is_credential_rejection`], which decides
/// whether the stored API key gets evicted.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gemini API error {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("API key rejected: {0}")]
    InvalidCredential(String),

    #[error("no API key configured (set GEMINI_API_KEY or run `aprende key set`)")]
    MissingCredential,

    #[error("response contained no text{}", .0.as_deref().map(|r| format!(" ({r})")).unwrap_or_default())]
    EmptyResponse(Option<String>),
}

impl CompletionError {
    pub fn is_credential_rejection(&self) -> bool {
        matches!(self, CompletionError::InvalidCredential(_))
    }
}
