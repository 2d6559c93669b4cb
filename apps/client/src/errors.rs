use thiserror::Error;

use crate::auth::provider::AuthError;
use crate::gateway::ApiError;

/// Top-level error type for the CLI layer.
/// Each variant maps to one human-readable notice; `main` decides the
/// exit code and whether the failure already reset the session.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Sign-in failed: {0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True when the failure means the session was force-reset (401 policy)
    /// and the user is now signed out.
    pub fn is_session_reset(&self) -> bool {
        matches!(self, AppError::Api(ApiError::Unauthorized))
    }
}
