//! Error types for drop dispatch.

use thiserror::Error;

use crate::scope::StoreError;
use crate::state::StateError;

/// Result type for dispatch.
pub type Result<T> = std::result::Result<T, PerformError>;

/// Errors raised while resolving, building, or running a drop.
#[derive(Debug, Error)]
pub enum PerformError {
    /// No factory is registered under the drop's name.
    #[error("Drop '{drop_name}' has no factory. No remote drop repository is configured.")]
    NoFactory { drop_name: String },

    /// The factory rejected its arguments or failed to build the drop.
    #[error("Failed to build drop '{drop_name}': {reason}")]
    Build { drop_name: String, reason: String },

    /// An action the drop does not define was invoked.
    #[error("Drop '{drop_name}' does not define {action}")]
    UndefinedAction { drop_name: String, action: String },

    /// A defined action failed for a reason of its own.
    #[error("Action '{action}' failed: {reason}")]
    Action { action: String, reason: String },

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}
