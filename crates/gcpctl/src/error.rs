//! Error types for gcpctl
//!
//! Core errors are sorted into user-facing categories, each with a list of
//! suggestions printed under the message.

use colored::Colorize;
use gcpctl_core::{ConfigError, CoreError};
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// ```text
/// error: Profile 'prod' not found
///
///   tip: List available profiles: gcpctl profile list
/// ```
pub struct CliDiagnostic {
    message: String,
    tips: Vec<String>,
}

impl CliDiagnostic {
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            tips: Vec::new(),
        }
    }

    pub fn tip(mut self, description: &str) -> Self {
        self.tips.push(description.to_string());
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        for tip in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", tip);
        }
    }
}

/// Main error type for the gcpctl application
#[derive(Error, Debug)]
pub enum GcpCtlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("No profile configured. Use 'gcpctl profile set' to configure a profile.")]
    NoProfileConfigured,

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    #[error("{message}")]
    AlreadyExists { name: String, message: String },

    #[error("{message}")]
    OperationFailed { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("API error: {message}")]
    ApiError { message: String },

    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("State file error: {message}")]
    State { message: String },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for gcpctl operations
pub type Result<T> = std::result::Result<T, GcpCtlError>;

impl GcpCtlError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            GcpCtlError::ProfileNotFound { name } => vec![
                "List available profiles: gcpctl profile list".to_string(),
                format!(
                    "Create profile '{}': gcpctl profile set {} --project <project> --zone <zone>",
                    name, name
                ),
            ],
            GcpCtlError::NoProfileConfigured => vec![
                "Create a profile: gcpctl profile set dev --project <project> --zone <zone> --access-token <token>".to_string(),
                "Or set GCPCTL_PROJECT, GCPCTL_ZONE and GCP_ACCESS_TOKEN".to_string(),
            ],
            GcpCtlError::AuthenticationFailed { .. } => vec![
                "Refresh the access token, e.g. gcloud auth print-access-token".to_string(),
                "Check the profile credentials: gcpctl profile show <profile>".to_string(),
            ],
            GcpCtlError::NotFound { .. } => vec![
                "List tracked resources: gcpctl state list".to_string(),
                "Check that you're using the correct profile and zone".to_string(),
            ],
            GcpCtlError::AlreadyExists { name, .. } => vec![
                format!("Pick a different name, or delete the existing one: gcpctl delete {}", name),
            ],
            GcpCtlError::Timeout { .. } => vec![
                "The operation may still finish; wait on it: gcpctl operation wait <operation>".to_string(),
                "Raise the limit with --wait-timeout <seconds>".to_string(),
            ],
            GcpCtlError::ConnectionError { .. } => vec![
                "Check network connectivity".to_string(),
                "Verify the API URL: gcpctl profile show <profile>".to_string(),
            ],
            GcpCtlError::InvalidInput { .. } => vec![
                "Check the command syntax: gcpctl <command> --help".to_string(),
            ],
            GcpCtlError::State { .. } => vec![
                "Show the state file location: gcpctl state path".to_string(),
                "A backup of the previous version is kept next to it as .backup".to_string(),
            ],
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&self.to_string());

        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion);
        }

        diag.print();
    }
}

impl From<ConfigError> for GcpCtlError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => GcpCtlError::ProfileNotFound { name },
            ConfigError::NoProfiles => GcpCtlError::NoProfileConfigured,
            other => GcpCtlError::Config(other.to_string()),
        }
    }
}

impl From<CoreError> for GcpCtlError {
    fn from(err: CoreError) -> Self {
        if err.is_unauthorized() {
            return GcpCtlError::AuthenticationFailed {
                message: err.to_string(),
            };
        }

        match err {
            CoreError::ResourceNotFound { kind, name } => GcpCtlError::NotFound { kind, name },
            CoreError::NameConflict { ref name, .. } => GcpCtlError::AlreadyExists {
                name: name.clone(),
                message: err.to_string(),
            },
            CoreError::RemoteOperationFailed { .. } => GcpCtlError::OperationFailed {
                message: err.to_string(),
            },
            CoreError::Timeout { .. } => GcpCtlError::Timeout {
                message: err.to_string(),
            },
            CoreError::Transport { status: None, .. } => GcpCtlError::ConnectionError {
                message: err.to_string(),
            },
            CoreError::Transport { .. } => GcpCtlError::ApiError {
                message: err.to_string(),
            },
            CoreError::Validation(message) => GcpCtlError::InvalidInput { message },
            CoreError::Config(config_err) => GcpCtlError::from(config_err),
            CoreError::State(message) => GcpCtlError::State { message },
        }
    }
}

impl From<serde_json::Error> for GcpCtlError {
    fn from(err: serde_json::Error) -> Self {
        GcpCtlError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<std::io::Error> for GcpCtlError {
    fn from(err: std::io::Error) -> Self {
        GcpCtlError::OutputError {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<anyhow::Error> for GcpCtlError {
    fn from(err: anyhow::Error) -> Self {
        GcpCtlError::Config(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_core_error_mapping() {
        let err: GcpCtlError = CoreError::Transport {
            status: Some(403),
            message: "forbidden".to_string(),
        }
        .into();
        assert!(matches!(err, GcpCtlError::AuthenticationFailed { .. }));

        let err: GcpCtlError = CoreError::Timeout {
            operation: "op".to_string(),
            elapsed: Duration::from_secs(600),
            attempts: 600,
        }
        .into();
        assert!(matches!(err, GcpCtlError::Timeout { .. }));
        assert!(!err.suggestions().is_empty());

        let err: GcpCtlError = CoreError::Transport {
            status: None,
            message: "connection refused".to_string(),
        }
        .into();
        assert!(matches!(err, GcpCtlError::ConnectionError { .. }));

        let err: GcpCtlError = CoreError::Config(ConfigError::NoProfiles).into();
        assert!(matches!(err, GcpCtlError::NoProfileConfigured));
    }

    #[test]
    fn test_conflict_suggests_delete() {
        let err: GcpCtlError = CoreError::NameConflict {
            name: "web-1".to_string(),
            message: "already exists".to_string(),
        }
        .into();
        assert!(err.to_string().contains("web-1"));
        assert!(err.suggestions()[0].contains("gcpctl delete web-1"));
    }
}
