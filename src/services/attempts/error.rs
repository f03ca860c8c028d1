use thiserror::Error;

/// Failure kinds surfaced by the attempt engine.
#[derive(Debug, Error)]
pub(crate) enum EngineError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl EngineError {
    /// Logs the store failure with context and hides it behind `Internal`.
    pub(crate) fn store(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    pub(crate) fn bad_request(message: &str) -> Self {
        Self::BadRequest(message.to_string())
    }
}
