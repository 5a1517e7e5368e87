//! Unified error handling for gcpctl-core
//!
//! Every public operation returns [`Result`]. Remote failures are sorted into
//! a small taxonomy so callers can tell a request that never reached the
//! platform apart from an operation that was accepted and later failed.
//!
//! # Example
//!
//! ```rust
//! use gcpctl_core::CoreError;
//!
//! fn describe(err: &CoreError) -> &'static str {
//!     if err.is_not_found() {
//!         "resource is gone"
//!     } else if err.is_conflict() {
//!         "name already taken"
//!     } else if err.is_timeout() {
//!         "operation still running"
//!     } else {
//!         "failed"
//!     }
//! }
//!
//! let err = CoreError::NameConflict {
//!     name: "web-1".to_string(),
//!     message: "already exists".to_string(),
//! };
//! assert_eq!(describe(&err), "name already taken");
//! ```

use std::time::Duration;
use thiserror::Error;

use crate::compute::OperationErrorDetail;
use crate::config::ConfigError;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// The request could not be sent or no well-formed response came back
    /// (authentication failure, network failure, malformed payload)
    #[error("Transport error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The mutating call was accepted but the operation finished with an error
    #[error("Operation {operation} failed: {}", summarize(.errors))]
    RemoteOperationFailed {
        operation: String,
        errors: Vec<OperationErrorDetail>,
    },

    /// No matching remote object
    #[error("{kind} '{name}' not found")]
    ResourceNotFound { kind: String, name: String },

    /// A create targeted a name that already exists
    #[error("Resource '{name}' already exists: {message}")]
    NameConflict { name: String, message: String },

    /// Operation did not reach a terminal state within the polling budget
    #[error("Operation {operation} timed out after {elapsed:?} ({attempts} polls)")]
    Timeout {
        operation: String,
        elapsed: Duration,
        attempts: u32,
    },

    /// Local precondition failed before any remote call was made
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State store could not be read or written
    #[error("State error: {0}")]
    State(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

fn summarize(errors: &[OperationErrorDetail]) -> String {
    if errors.is_empty() {
        return "no error detail reported".to_string();
    }
    errors
        .iter()
        .map(|e| match &e.message {
            Some(message) => format!("[{}] {}", e.code, message),
            None => format!("[{}]", e.code),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl CoreError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        CoreError::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub(crate) fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        CoreError::ResourceNotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// HTTP status of a transport failure, if one was received
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            CoreError::Transport { status, .. } => *status,
            CoreError::ResourceNotFound { .. } => Some(404),
            CoreError::NameConflict { .. } => Some(409),
            _ => None,
        }
    }

    /// Returns true if this is a "not found" error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::ResourceNotFound { .. })
    }

    /// Returns true if a create hit an existing name
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, CoreError::NameConflict { .. })
    }

    /// Returns true if an operation ran past its polling budget
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, CoreError::Timeout { .. })
    }

    /// Returns true if this is an authentication/authorization error (401/403)
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// Returns true if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(500..=599))
    }

    /// Returns true if the caller may reasonably try again.
    ///
    /// Advisory only: nothing in this crate retries on its own.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Transport { status, .. } => {
                matches!(status, None | Some(429) | Some(500..=599))
            }
            CoreError::Timeout { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(code: &str, message: &str) -> OperationErrorDetail {
        OperationErrorDetail {
            code: code.to_string(),
            message: Some(message.to_string()),
            location: None,
        }
    }

    #[test]
    fn test_transport_helpers() {
        let err = CoreError::Transport {
            status: Some(401),
            message: "Invalid Credentials".to_string(),
        };
        assert!(err.is_unauthorized());
        assert!(!err.is_retryable());
        assert!(!err.is_not_found());

        let err = CoreError::Transport {
            status: Some(503),
            message: "backend unavailable".to_string(),
        };
        assert!(err.is_server_error());
        assert!(err.is_retryable());

        let err = CoreError::transport("connection refused");
        assert!(err.is_retryable());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_remote_operation_failed_is_terminal() {
        let err = CoreError::RemoteOperationFailed {
            operation: "operation-123".to_string(),
            errors: vec![detail("400", "resource in use")],
        };
        assert!(!err.is_retryable());
        assert!(!err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Operation operation-123 failed: [400] resource in use"
        );
    }

    #[test]
    fn test_remote_operation_failed_joins_details() {
        let err = CoreError::RemoteOperationFailed {
            operation: "op".to_string(),
            errors: vec![
                detail("QUOTA_EXCEEDED", "CPUS quota exceeded"),
                OperationErrorDetail {
                    code: "RESOURCE_IN_USE".to_string(),
                    message: None,
                    location: None,
                },
            ],
        };
        assert!(
            err.to_string()
                .ends_with("[QUOTA_EXCEEDED] CPUS quota exceeded; [RESOURCE_IN_USE]")
        );
    }

    #[test]
    fn test_timeout() {
        let err = CoreError::Timeout {
            operation: "op".to_string(),
            elapsed: Duration::from_secs(60),
            attempts: 60,
        };
        assert!(err.is_timeout());
        assert!(err.is_retryable());
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_not_found_and_conflict() {
        let err = CoreError::not_found("instance", "web-1");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "instance 'web-1' not found");

        let err = CoreError::NameConflict {
            name: "web-1".to_string(),
            message: "already exists".to_string(),
        };
        assert!(err.is_conflict());
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn test_transport_display() {
        let err = CoreError::Transport {
            status: Some(500),
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Transport error (HTTP 500): boom");
        assert_eq!(
            CoreError::transport("dns").to_string(),
            "Transport error: dns"
        );
    }
}
