use async_trait::async_trait;
use thiserror::Error;

/// Errors from a generation backend.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("backend returned an empty completion")]
    EmptyResponse,
}

/// One completion request: role instructions plus the contextual payload.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Stateless text-completion client. Each call is independent; the roles
/// re-send whatever context the next generation needs.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier, for logs and session transcripts.
    fn model(&self) -> &str;

    /// Send one completion request and return the raw response text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}
