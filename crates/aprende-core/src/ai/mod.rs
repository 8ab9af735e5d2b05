pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;

use crate::error::CompletionError;

/// A text-completion backend: one prompt in, one reply out.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, CompletionError>;
}
