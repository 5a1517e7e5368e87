//! Configuration errors

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("No profiles configured. Use 'gcpctl profile set' to create one.")]
    NoProfiles,

    #[error("profile '{profile}' has an empty '{field}'")]
    MissingField { profile: String, field: &'static str },

    #[error("credential unavailable: {0}")]
    CredentialError(String),

    #[cfg(feature = "secure-storage")]
    #[error("OS keyring: {0}")]
    KeyringError(String),

    #[error("no home directory to place the gcpctl config in")]
    NoConfigDir,
}

pub type Result<T> = std::result::Result<T, ConfigError>;
