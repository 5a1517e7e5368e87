//! Authenticated sessions
//!
//! A [`Session`] is an access token plus its expiry. It is created once by an
//! [`Authenticator`] and handed to [`ComputeClient::new`](crate::ComputeClient::new);
//! nothing in the crate keeps a process-wide session.
//!
//! [`ProfileAuthenticator`] resolves the token a profile points at. It does
//! not run OAuth flows: the token is either configured directly (inline,
//! environment variable, OS keyring) or read from an oauth2 token cache file
//! maintained by another tool.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::config::{ConfigError, CredentialStore, Profile, ProfileCredentials};
use crate::error::{CoreError, Result};

/// Environment variable that overrides a profile's access token
pub const ACCESS_TOKEN_ENV: &str = "GCP_ACCESS_TOKEN";

/// Bearer credentials for the compute API
#[derive(Clone)]
pub struct Session {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Session from a token with unknown expiry
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: Some(expires_at),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Exchanges profile credentials for a session
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, profile: &Profile) -> Result<Session>;
}

/// Resolves the token configured in a profile
#[derive(Debug, Clone)]
pub struct ProfileAuthenticator {
    store: CredentialStore,
    use_env: bool,
}

impl Default for ProfileAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileAuthenticator {
    pub fn new() -> Self {
        Self {
            store: CredentialStore::new(),
            use_env: true,
        }
    }

    /// Ignore `GCP_ACCESS_TOKEN`; used when a config file is given explicitly
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    pub fn with_store(mut self, store: CredentialStore) -> Self {
        self.store = store;
        self
    }
}

#[async_trait]
impl Authenticator for ProfileAuthenticator {
    async fn authenticate(&self, profile: &Profile) -> Result<Session> {
        let env_var = self.use_env.then_some(ACCESS_TOKEN_ENV);

        match &profile.credentials {
            ProfileCredentials::AccessToken { access_token } => {
                let token = self.store.get_credential(access_token, env_var)?;
                if token.trim().is_empty() {
                    return Err(ConfigError::CredentialError(
                        "access token is empty".to_string(),
                    )
                    .into());
                }
                debug!("Using configured access token");
                Ok(Session::new(token))
            }
            ProfileCredentials::TokenFile { .. } => {
                if let Some(var) = env_var
                    && let Ok(token) = std::env::var(var)
                {
                    debug!("Using access token from {}", var);
                    return Ok(Session::new(token));
                }
                let path = profile.token_file().ok_or_else(|| {
                    ConfigError::CredentialError("profile has no token file".to_string())
                })?;
                read_token_file(&path).await
            }
        }
    }
}

/// oauth2 token cache layout
#[derive(Debug, Deserialize)]
struct TokenCache {
    access_token: String,
    #[serde(default)]
    token_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    invalid: bool,
}

async fn read_token_file(path: &Path) -> Result<Session> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        ConfigError::CredentialError(format!(
            "failed to read token file {}: {}",
            path.display(),
            e
        ))
    })?;
    let cache: TokenCache = serde_json::from_str(&content).map_err(|e| {
        ConfigError::CredentialError(format!(
            "malformed token file {}: {}",
            path.display(),
            e
        ))
    })?;

    if cache.invalid {
        return Err(CoreError::Transport {
            status: Some(401),
            message: format!("token in {} has been revoked", path.display()),
        });
    }

    let session = match cache.token_expiry {
        Some(expiry) => Session::with_expiry(cache.access_token, expiry),
        None => Session::new(cache.access_token),
    };
    if session.is_expired() {
        return Err(CoreError::Transport {
            status: Some(401),
            message: format!(
                "token in {} expired; refresh it and retry",
                path.display()
            ),
        });
    }

    debug!("Loaded access token from {}", path.display());
    Ok(session)
}
