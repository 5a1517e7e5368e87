//! Connection management: profile resolution and authenticated clients

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use gcpctl_core::{
    Authenticator, ComputeClient, Config, ConfigError, FileStateStore, Lifecycle, PollConfig,
    Profile, ProfileAuthenticator,
};
use tracing::{debug, info, trace};

use crate::error::Result as CliResult;

const PROJECT_ENV: &str = "GCPCTL_PROJECT";
const ZONE_ENV: &str = "GCPCTL_ZONE";
const ACCESS_TOKEN_ENV: &str = gcpctl_core::session::ACCESS_TOKEN_ENV;

/// Connection manager for creating authenticated clients
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    state_file: Option<PathBuf>,
    wait_timeout: Option<u64>,
    wait_interval: Option<u64>,
}

impl ConnectionManager {
    /// Create a new connection manager with a custom config path
    pub fn with_config_path(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
            state_file: None,
            wait_timeout: None,
            wait_interval: None,
        }
    }

    pub fn with_state_file(mut self, state_file: Option<PathBuf>) -> Self {
        self.state_file = state_file;
        self
    }

    /// Command-line overrides for the profile's polling settings
    pub fn with_wait_overrides(mut self, timeout: Option<u64>, interval: Option<u64>) -> Self {
        self.wait_timeout = timeout;
        self.wait_interval = interval;
        self
    }

    /// Save `config` to --config-file if given, else the standard location
    pub fn save_config(&self, config: &Config) -> CliResult<PathBuf> {
        let path = self.config_file()?;
        config
            .save_to_path(&path)
            .context("Failed to save configuration")?;
        Ok(path)
    }

    /// Where the configuration lives
    pub fn config_file(&self) -> CliResult<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::config_path()?),
        }
    }

    /// Environment variables are ignored when --config-file is given explicitly
    fn use_env_vars(&self) -> bool {
        self.config_path.is_none()
    }

    fn env(&self, var: &str) -> Option<String> {
        if !self.use_env_vars() {
            return None;
        }
        std::env::var(var).ok().filter(|v| !v.is_empty())
    }

    /// Resolve the profile to use, applying environment overrides
    ///
    /// With no profiles configured, `GCPCTL_PROJECT`, `GCPCTL_ZONE` and
    /// `GCP_ACCESS_TOKEN` together form an ad-hoc profile.
    pub fn resolve_profile(&self, profile_name: Option<&str>) -> CliResult<(String, Profile)> {
        trace!("Profile name: {:?}", profile_name);
        let env_project = self.env(PROJECT_ENV);
        let env_zone = self.env(ZONE_ENV);

        let (name, mut profile) = match self.config.resolve_profile(profile_name) {
            Ok(name) => {
                let profile = self.config.profile(&name)?.clone();
                (name, profile)
            }
            Err(ConfigError::NoProfiles) => {
                match (&env_project, &env_zone, self.env(ACCESS_TOKEN_ENV)) {
                    (Some(project), Some(zone), Some(token)) => {
                        info!("Using project, zone and token from environment variables");
                        let profile = Profile::with_access_token(project, zone, token);
                        ("<environment>".to_string(), profile)
                    }
                    _ => return Err(ConfigError::NoProfiles.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(project) = env_project {
            debug!("Overriding project from {}", PROJECT_ENV);
            profile.project = project;
        }
        if let Some(zone) = env_zone {
            debug!("Overriding zone from {}", ZONE_ENV);
            profile.zone = zone;
        }
        profile.validate(&name)?;

        info!("Using profile: {}", name);
        Ok((name, profile))
    }

    /// Authenticate with the resolved profile and build a client
    pub async fn create_client(
        &self,
        profile_name: Option<&str>,
    ) -> CliResult<(ComputeClient, Profile)> {
        let (_, profile) = self.resolve_profile(profile_name)?;

        let authenticator = if self.use_env_vars() {
            ProfileAuthenticator::new()
        } else {
            info!("--config-file specified explicitly, ignoring environment variables");
            ProfileAuthenticator::new().without_env()
        };
        let session = authenticator.authenticate(&profile).await?;

        debug!(
            "Creating compute client for project {} at {}",
            profile.project, profile.api_url
        );
        let client = ComputeClient::with_base_url(session, &profile.project, &profile.api_url)?;
        Ok((client, profile))
    }

    /// Polling discipline: profile defaults with command-line overrides
    pub fn poll_config(&self, profile: &Profile) -> PollConfig {
        let mut poll = profile.poll_config();
        if let Some(timeout) = self.wait_timeout {
            poll.timeout = Duration::from_secs(timeout);
        }
        if let Some(interval) = self.wait_interval {
            poll.interval = Duration::from_secs(interval.max(1));
        }
        poll
    }

    pub fn state_path(&self) -> CliResult<PathBuf> {
        match &self.state_file {
            Some(path) => Ok(path.clone()),
            None => Ok(self.config.state_path()?),
        }
    }

    pub fn state_store(&self) -> CliResult<FileStateStore> {
        let path = self.state_path()?;
        debug!("Using state file {}", path.display());
        Ok(FileStateStore::new(path))
    }

    /// Orchestrator for the resolved profile, backed by the state file
    pub async fn lifecycle(
        &self,
        profile_name: Option<&str>,
    ) -> CliResult<Lifecycle<FileStateStore>> {
        let (client, profile) = self.create_client(profile_name).await?;
        let poll = self.poll_config(&profile);
        Ok(Lifecycle::new(client, profile.zone, self.state_store()?, poll))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn config_with(name: &str) -> Config {
        let mut config = Config::default();
        config.set_profile(
            name.to_string(),
            Profile::with_access_token("cfg-project", "us-central1-a", "ya29.cfg"),
        );
        config
    }

    #[test]
    #[serial]
    fn test_env_overrides_project_and_zone() {
        unsafe {
            std::env::set_var(PROJECT_ENV, "env-project");
            std::env::remove_var(ZONE_ENV);
        }

        let mgr = ConnectionManager::with_config_path(config_with("dev"), None);
        let (name, profile) = mgr.resolve_profile(None).unwrap();
        assert_eq!(name, "dev");
        assert_eq!(profile.project, "env-project");
        assert_eq!(profile.zone, "us-central1-a");

        let explicit = ConnectionManager::with_config_path(
            config_with("dev"),
            Some(PathBuf::from("/tmp/gcpctl-test.toml")),
        );
        let (_, profile) = explicit.resolve_profile(None).unwrap();
        assert_eq!(profile.project, "cfg-project");

        unsafe {
            std::env::remove_var(PROJECT_ENV);
        }
    }

    #[test]
    #[serial]
    fn test_env_only_profile() {
        unsafe {
            std::env::set_var(PROJECT_ENV, "env-project");
            std::env::set_var(ZONE_ENV, "europe-west1-b");
            std::env::set_var(ACCESS_TOKEN_ENV, "ya29.env");
        }

        let mgr = ConnectionManager::with_config_path(Config::default(), None);
        let (_, profile) = mgr.resolve_profile(None).unwrap();
        assert_eq!(profile.zone, "europe-west1-b");
        assert_eq!(profile.access_token(), Some("ya29.env"));

        unsafe {
            std::env::remove_var(PROJECT_ENV);
            std::env::remove_var(ZONE_ENV);
            std::env::remove_var(ACCESS_TOKEN_ENV);
        }
    }

    #[test]
    #[serial]
    fn test_no_profiles_without_env() {
        unsafe {
            std::env::remove_var(PROJECT_ENV);
        }
        let mgr = ConnectionManager::with_config_path(Config::default(), None);
        assert!(matches!(
            mgr.resolve_profile(None),
            Err(crate::error::GcpCtlError::NoProfileConfigured)
        ));
    }

    #[test]
    fn test_wait_overrides() {
        let mgr = ConnectionManager::with_config_path(config_with("dev"), None)
            .with_wait_overrides(Some(30), Some(5));
        let profile = Profile::with_access_token("p", "z", "t");
        let poll = mgr.poll_config(&profile);
        assert_eq!(poll.timeout, Duration::from_secs(30));
        assert_eq!(poll.interval, Duration::from_secs(5));
    }

    #[test]
    fn test_explicit_state_file() {
        let mgr = ConnectionManager::with_config_path(Config::default(), None)
            .with_state_file(Some(PathBuf::from("/tmp/state.json")));
        assert_eq!(mgr.state_path().unwrap(), PathBuf::from("/tmp/state.json"));
    }
}
