use routebook_core::CoreError;
use routebook_store::engine::EngineError;
use routebook_store::store::StoreError;

use crate::response::Envelope;

/// Application-level error for the dispatcher.
///
/// Unlike a conventional REST surface there is no status-code mapping: every
/// failure renders as the tagged error envelope at HTTP 200 (see
/// [`Envelope`]). What varies is the wire-level error name.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The request path is not one of the four operations.
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Wire-level error name for the envelope.
    ///
    /// Anything outside the recognized taxonomy reports as the generic
    /// `"unknown error"`.
    pub fn error_name(&self) -> &'static str {
        match self {
            AppError::InvalidPath(_) => "InvalidPathError",
            AppError::Core(CoreError::Validation(_)) => "ValidationError",
            AppError::Store(StoreError::Decode(_)) => "DecodeError",
            AppError::Store(StoreError::Engine(EngineError::FileNotFound(_))) => "NotFoundError",
            _ => "unknown error",
        }
    }

    /// Log the failure and turn it into the wire envelope.
    pub fn into_envelope(self) -> Envelope {
        let name = self.error_name();
        if name == "unknown error" {
            tracing::error!(error = %self, "request failed unexpectedly");
        } else {
            tracing::debug!(error = %self, name, "request failed");
        }
        Envelope::error(name, self.to_string())
    }
}
