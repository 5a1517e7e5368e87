//! Configuration management for gcpctl
//!
//! Handles configuration loading from files and environment variables.
//! Configuration is stored in TOML format with support for multiple named profiles.

#[cfg(target_os = "macos")]
use directories::BaseDirs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{ConfigError, Result};
use crate::compute::DEFAULT_API_URL;
use crate::progress::PollConfig;

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Profile used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Override for the state file location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<String>,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// Individual profile configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Profile {
    /// Project that owns every resource managed through this profile
    pub project: String,
    /// Default zone for instances and disks
    pub zone: String,
    /// How to obtain an access token (flattened into the profile)
    #[serde(flatten)]
    pub credentials: ProfileCredentials,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Upper bound on waiting for one operation
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

/// Where the access token for a profile comes from
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ProfileCredentials {
    /// A ready-made bearer token; may be a `keyring:` reference
    AccessToken { access_token: String },
    /// An oauth2 token cache file written by another tool
    TokenFile { token_file: String },
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_poll_timeout_secs() -> u64 {
    600
}

fn default_poll_interval_secs() -> u64 {
    1
}

impl Profile {
    /// Profile with an inline token and default endpoint and polling settings
    pub fn with_access_token(
        project: impl Into<String>,
        zone: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            zone: zone.into(),
            credentials: ProfileCredentials::AccessToken {
                access_token: access_token.into(),
            },
            api_url: default_api_url(),
            poll_timeout_secs: default_poll_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }

    /// Polling discipline for operations started through this profile
    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(Duration::from_secs(self.poll_timeout_secs))
            .with_interval(Duration::from_secs(self.poll_interval_secs.max(1)))
    }

    /// Returns the configured access token value, if this profile uses one
    pub fn access_token(&self) -> Option<&str> {
        match &self.credentials {
            ProfileCredentials::AccessToken { access_token } => Some(access_token.as_str()),
            ProfileCredentials::TokenFile { .. } => None,
        }
    }

    /// Returns the token file path with `~` and env vars expanded
    pub fn token_file(&self) -> Option<PathBuf> {
        match &self.credentials {
            ProfileCredentials::TokenFile { token_file } => {
                Some(PathBuf::from(shellexpand::tilde(token_file).into_owned()))
            }
            ProfileCredentials::AccessToken { .. } => None,
        }
    }

    /// Check the fields a client cannot work without
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.project.trim().is_empty() {
            return Err(ConfigError::MissingField {
                profile: name.to_string(),
                field: "project",
            });
        }
        if self.zone.trim().is_empty() {
            return Err(ConfigError::MissingField {
                profile: name.to_string(),
                field: "zone",
            });
        }
        Ok(())
    }
}

impl Config {
    /// Pick the profile name to use: explicit, then default, then the first by name
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<String> {
        if let Some(name) = explicit_profile {
            if self.profiles.contains_key(name) {
                return Ok(name.to_string());
            }
            return Err(ConfigError::ProfileNotFound {
                name: name.to_string(),
            });
        }

        if let Some(default) = &self.default_profile {
            return Ok(default.clone());
        }

        self.list_profiles()
            .first()
            .map(|(name, _)| (*name).clone())
            .ok_or(ConfigError::NoProfiles)
    }

    /// Look up a profile by name
    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path; a missing file is an empty config
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Read {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        let expanded_content = Self::expand_env_vars(&content);
        let config: Config = toml::from_str(&expanded_content)?;

        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::Write {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile, clearing the default if it pointed there
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// Profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    /// Get the path to the configuration file
    ///
    /// On macOS an existing `~/.config/gcpctl` directory takes precedence over
    /// `~/Library/Application Support`.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Default location of the resource state file, next to the config file
    pub fn default_state_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("state.json"))
    }

    /// State file location, honoring the `state_file` setting
    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.state_file {
            Some(path) => Ok(PathBuf::from(shellexpand::tilde(path).into_owned())),
            None => Self::default_state_path(),
        }
    }

    fn config_dir() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(base_dirs) = BaseDirs::new() {
                let linux_style = base_dirs.home_dir().join(".config").join("gcpctl");
                if linux_style.exists() {
                    return Ok(linux_style);
                }
            }
        }

        let proj_dirs =
            ProjectDirs::from("com", "gcpctl", "gcpctl").ok_or(ConfigError::NoConfigDir)?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Expand `${VAR}` and `${VAR:-default}` references
    ///
    /// Unset variables are left as-is so profiles that are not in use do not
    /// have to be satisfiable.
    fn expand_env_vars(content: &str) -> String {
        shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dev_profile() -> Profile {
        Profile::with_access_token("dev-project", "us-central1-a", "ya29.dev")
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.set_profile("dev".to_string(), dev_profile());
        config.default_profile = Some("dev".to_string());

        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(deserialized.default_profile.as_deref(), Some("dev"));
        assert_eq!(deserialized.profiles["dev"], dev_profile());
    }

    #[test]
    fn test_profile_defaults() {
        let toml = r#"
            [profiles.dev]
            project = "dev-project"
            zone = "us-central1-a"
            access_token = "ya29.dev"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let profile = &config.profiles["dev"];

        assert_eq!(profile.api_url, DEFAULT_API_URL);
        assert_eq!(profile.poll_timeout_secs, 600);
        assert_eq!(profile.poll_interval_secs, 1);
        assert_eq!(profile.access_token(), Some("ya29.dev"));
        assert!(profile.token_file().is_none());

        let poll = profile.poll_config();
        assert_eq!(poll.timeout, Duration::from_secs(600));
        assert_eq!(poll.interval, Duration::from_secs(1));
    }

    #[test]
    fn test_token_file_profile() {
        let toml = r#"
            [profiles.ci]
            project = "ci-project"
            zone = "europe-west1-b"
            token_file = "/var/run/gcp-token.json"
            poll_timeout_secs = 120
            poll_interval_secs = 5
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let profile = &config.profiles["ci"];

        assert_eq!(
            profile.credentials,
            ProfileCredentials::TokenFile {
                token_file: "/var/run/gcp-token.json".to_string()
            }
        );
        assert_eq!(
            profile.token_file(),
            Some(PathBuf::from("/var/run/gcp-token.json"))
        );
        assert_eq!(profile.poll_config().interval, Duration::from_secs(5));
    }

    #[test]
    fn test_profile_resolution() {
        let mut config = Config::default();
        assert!(matches!(
            config.resolve_profile(None),
            Err(ConfigError::NoProfiles)
        ));

        config.set_profile("zeta".to_string(), dev_profile());
        config.set_profile("alpha".to_string(), dev_profile());

        assert_eq!(config.resolve_profile(None).unwrap(), "alpha");
        assert_eq!(config.resolve_profile(Some("zeta")).unwrap(), "zeta");
        assert!(matches!(
            config.resolve_profile(Some("missing")),
            Err(ConfigError::ProfileNotFound { .. })
        ));

        config.default_profile = Some("zeta".to_string());
        assert_eq!(config.resolve_profile(None).unwrap(), "zeta");
    }

    #[test]
    fn test_remove_default_profile_clears_default() {
        let mut config = Config::default();
        config.set_profile("dev".to_string(), dev_profile());
        config.default_profile = Some("dev".to_string());

        assert!(config.remove_profile("dev").is_some());
        assert!(config.default_profile.is_none());
        assert!(config.remove_profile("dev").is_none());
    }

    #[test]
    fn test_validate_requires_project_and_zone() {
        let mut profile = dev_profile();
        assert!(profile.validate("dev").is_ok());

        profile.zone = " ".to_string();
        let err = profile.validate("dev").unwrap_err();
        assert_eq!(err.to_string(), "profile 'dev' has an empty 'zone'");
    }

    #[test]
    #[serial_test::serial]
    fn test_env_var_expansion() {
        unsafe {
            std::env::set_var("GCPCTL_TEST_TOKEN_EXPAND", "ya29.from-env");
        }

        let content = r#"
            [profiles.dev]
            project = "${GCPCTL_TEST_PROJECT_UNSET:-fallback-project}"
            zone = "us-central1-a"
            access_token = "${GCPCTL_TEST_TOKEN_EXPAND}"
        "#;
        let expanded = Config::expand_env_vars(content);
        let config: Config = toml::from_str(&expanded).unwrap();
        let profile = &config.profiles["dev"];

        assert_eq!(profile.project, "fallback-project");
        assert_eq!(profile.access_token(), Some("ya29.from-env"));

        unsafe {
            std::env::remove_var("GCPCTL_TEST_TOKEN_EXPAND");
        }
    }

    #[test]
    fn test_unset_vars_left_verbatim() {
        let content = "access_token = \"${GCPCTL_TEST_DEFINITELY_UNSET}\"";
        assert_eq!(Config::expand_env_vars(content), content);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set_profile("dev".to_string(), dev_profile());
        config.state_file = Some("/tmp/gcpctl-state.json".to_string());
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.profiles["dev"], dev_profile());
        assert_eq!(
            loaded.state_path().unwrap(),
            PathBuf::from("/tmp/gcpctl-state.json")
        );
    }

    #[test]
    fn test_missing_file_is_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_path(&dir.path().join("absent.toml")).unwrap();
        assert!(config.profiles.is_empty());
    }
}
