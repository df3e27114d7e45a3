//! Error types for reconciliation.

use thiserror::Error;

use crate::runtime::RuntimeError;
use crate::scope::StoreError;

/// Result type for reconciliation.
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors that end a reconciliation.
#[derive(Debug, Error)]
pub enum StateError {
    /// The scope has no engine connection.
    #[error("No Docker connection for scope '{namespace}'")]
    NoConnection { namespace: String },

    /// The create options name no image. Raised before any create call.
    #[error("Missing required create option 'Image'")]
    MissingImage,

    /// The pull response carried an error in its body.
    #[error("Failed to pull image '{image}': {message}")]
    PullFailed { image: String, message: String },

    /// Creation kept reporting a missing image after pulling it.
    #[error("Image '{image}' still missing after {passes} reconcile passes")]
    RetryLimitExceeded { image: String, passes: u32 },

    /// The ensure step could not converge the container.
    #[error("Could not ensure container '{id}': {reason}")]
    Ensure { id: String, reason: String },

    /// Engine errors pass through untouched.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl StateError {
    /// The underlying engine error, if this is one.
    pub fn runtime_error(&self) -> Option<&RuntimeError> {
        match self {
            StateError::Runtime(e) => Some(e),
            _ => None,
        }
    }

    /// Errno-style code of an underlying connectivity failure.
    pub fn code(&self) -> Option<&str> {
        self.runtime_error().and_then(RuntimeError::code)
    }

    /// Syscall of an underlying connectivity failure.
    pub fn syscall(&self) -> Option<&str> {
        self.runtime_error().and_then(RuntimeError::syscall)
    }
}
