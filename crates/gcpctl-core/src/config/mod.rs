//! Configuration and profile management
//!
// A profile module named `config` inside `config` is intentional
#![allow(clippy::module_inception)]
//!
//! Profiles bind a project, a default zone, a credential, and polling
//! defaults under one name. They live in a TOML file in the platform config
//! directory:
//!
//! ```toml
//! default_profile = "dev"
//!
//! [profiles.dev]
//! project = "my-project"
//! zone = "us-central1-a"
//! access_token = "${GCP_ACCESS_TOKEN}"
//! poll_timeout_secs = 300
//!
//! [profiles.ci]
//! project = "ci-project"
//! zone = "europe-west1-b"
//! token_file = "~/.config/gcpctl/ci-token.json"
//! ```

pub mod config;
pub mod credential;
pub mod error;

pub use config::{Config, Profile, ProfileCredentials};
pub use credential::{CredentialStorage, CredentialStore};
pub use error::{ConfigError, Result};
