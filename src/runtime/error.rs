//! Error types for container engine calls.

use thiserror::Error;

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// What a not-found response referred to.
///
/// The engine answers 404 both for an unknown container (inspect) and for a
/// missing image (create); reconciliation recovers from each differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    Container,
    Image,
}

impl std::fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotFoundKind::Container => write!(f, "container"),
            NotFoundKind::Image => write!(f, "image"),
        }
    }
}

/// Errors reported by a `RuntimeClient`.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// The engine reported that the container or image does not exist.
    #[error("No such {kind}: {message}")]
    NotFound { kind: NotFoundKind, message: String },

    /// Transport failure before the engine could answer.
    ///
    /// `code` is the errno-style name (`ECONNREFUSED`) and `syscall` the
    /// operation that failed (`connect`). Callers match on both.
    #[error("{syscall} {code}: {message}")]
    Connectivity {
        code: String,
        syscall: String,
        message: String,
    },

    /// Any other failure reported by the engine.
    #[error("Docker engine error: {message}")]
    Remote { status: Option<u16>, message: String },
}

impl RuntimeError {
    /// Whether this is a not-found error of the given kind.
    pub fn is_not_found(&self, kind: NotFoundKind) -> bool {
        matches!(self, RuntimeError::NotFound { kind: k, .. } if *k == kind)
    }

    /// Errno-style code for connectivity failures.
    pub fn code(&self) -> Option<&str> {
        match self {
            RuntimeError::Connectivity { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Failing syscall for connectivity failures.
    pub fn syscall(&self) -> Option<&str> {
        match self {
            RuntimeError::Connectivity { syscall, .. } => Some(syscall),
            _ => None,
        }
    }

    /// Build a connectivity error from an I/O error, if its kind is a
    /// transport failure.
    pub fn from_io(err: &std::io::Error) -> Option<Self> {
        let (code, syscall) = io_error_code(err.kind())?;
        Some(RuntimeError::Connectivity {
            code: code.to_string(),
            syscall: syscall.to_string(),
            message: err.to_string(),
        })
    }

    /// Search an error's source chain for a transport-level I/O error.
    pub fn connectivity_in_chain(err: &(dyn std::error::Error + 'static)) -> Option<Self> {
        let mut current = Some(err);
        while let Some(e) = current {
            if let Some(io) = e.downcast_ref::<std::io::Error>()
                && let Some(found) = Self::from_io(io)
            {
                return Some(found);
            }
            current = e.source();
        }
        None
    }
}

/// Map an I/O error kind to its errno name and the syscall it came from.
fn io_error_code(kind: std::io::ErrorKind) -> Option<(&'static str, &'static str)> {
    use std::io::ErrorKind;

    match kind {
        ErrorKind::ConnectionRefused => Some(("ECONNREFUSED", "connect")),
        ErrorKind::NotFound => Some(("ENOENT", "connect")),
        ErrorKind::PermissionDenied => Some(("EACCES", "connect")),
        ErrorKind::TimedOut => Some(("ETIMEDOUT", "connect")),
        ErrorKind::AddrNotAvailable => Some(("EADDRNOTAVAIL", "connect")),
        ErrorKind::HostUnreachable => Some(("EHOSTUNREACH", "connect")),
        ErrorKind::NetworkUnreachable => Some(("ENETUNREACH", "connect")),
        ErrorKind::ConnectionReset => Some(("ECONNRESET", "read")),
        ErrorKind::ConnectionAborted => Some(("ECONNABORTED", "read")),
        ErrorKind::BrokenPipe => Some(("EPIPE", "write")),
        _ => None,
    }
}
