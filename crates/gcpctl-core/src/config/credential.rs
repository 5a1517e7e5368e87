//! Access token storage with optional keyring support
//!
//! A configured token value resolves as follows: an allowed environment
//! variable wins, then a `keyring:<key>` reference is looked up in the OS
//! keyring (only with the `secure-storage` feature), otherwise the value is
//! used literally.

use super::error::{ConfigError, Result};
use std::env;

const KEYRING_PREFIX: &str = "keyring:";

#[cfg(feature = "secure-storage")]
const SERVICE_NAME: &str = "gcpctl";

/// Where new tokens are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStorage {
    #[cfg(feature = "secure-storage")]
    Keyring,
    Plaintext,
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    storage: CredentialStorage,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "secure-storage")]
fn entry(key: &str) -> Result<keyring::Entry> {
    keyring::Entry::new(SERVICE_NAME, key).map_err(|e| ConfigError::KeyringError(e.to_string()))
}

impl CredentialStore {
    /// Keyring-backed when compiled in and reachable, plaintext otherwise
    pub fn new() -> Self {
        #[cfg(feature = "secure-storage")]
        {
            if let Ok(probe) = entry("__probe__") {
                let _ = probe.get_password();
                return Self {
                    storage: CredentialStorage::Keyring,
                };
            }
        }
        Self::plaintext()
    }

    pub fn plaintext() -> Self {
        Self {
            storage: CredentialStorage::Plaintext,
        }
    }

    /// Persist `value` under `key`; returns what the config file should hold
    pub fn store_credential(&self, key: &str, value: &str) -> Result<String> {
        match self.storage {
            #[cfg(feature = "secure-storage")]
            CredentialStorage::Keyring => {
                entry(key)?.set_password(value).map_err(|e| {
                    ConfigError::KeyringError(format!("cannot save '{key}': {e}"))
                })?;
                Ok(format!("{KEYRING_PREFIX}{key}"))
            }
            CredentialStorage::Plaintext => {
                tracing::trace!("keeping '{}' in the config file", key);
                Ok(value.to_string())
            }
        }
    }

    pub fn get_credential(&self, value: &str, env_var: Option<&str>) -> Result<String> {
        if let Some(found) = env_var.and_then(|var| env::var(var).ok()) {
            return Ok(found);
        }

        let Some(key) = value.strip_prefix(KEYRING_PREFIX) else {
            return Ok(value.to_string());
        };

        #[cfg(feature = "secure-storage")]
        {
            entry(key)?
                .get_password()
                .map_err(|e| ConfigError::KeyringError(format!("cannot load '{key}': {e}")))
        }
        #[cfg(not(feature = "secure-storage"))]
        {
            Err(ConfigError::CredentialError(format!(
                "'{key}' lives in the OS keyring; rebuild with --features secure-storage"
            )))
        }
    }

    /// Drop a keyring entry; plain values and absent entries are a no-op
    pub fn delete_credential(&self, value: &str) -> Result<()> {
        let Some(key) = value.strip_prefix(KEYRING_PREFIX) else {
            return Ok(());
        };

        #[cfg(feature = "secure-storage")]
        {
            match entry(key)?.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(ConfigError::KeyringError(format!("cannot remove '{key}': {e}"))),
            }
        }
        #[cfg(not(feature = "secure-storage"))]
        {
            let _ = key;
            Ok(())
        }
    }

    pub fn is_keyring_reference(value: &str) -> bool {
        value.starts_with(KEYRING_PREFIX)
    }

    pub fn storage_backend(&self) -> &'static str {
        match self.storage {
            #[cfg(feature = "secure-storage")]
            CredentialStorage::Keyring => "keyring",
            CredentialStorage::Plaintext => "plaintext",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn plaintext_passes_values_through() {
        let store = CredentialStore::plaintext();
        assert_eq!(store.store_credential("dev", "ya29.token").unwrap(), "ya29.token");
        assert_eq!(store.get_credential("ya29.token", None).unwrap(), "ya29.token");
        assert_eq!(store.storage_backend(), "plaintext");
        assert!(store.delete_credential("ya29.token").is_ok());
    }

    #[test]
    #[serial]
    fn env_var_beats_configured_value() {
        unsafe {
            env::set_var("GCPCTL_TEST_TOKEN", "from-env");
        }
        let got = CredentialStore::plaintext()
            .get_credential("from-config", Some("GCPCTL_TEST_TOKEN"))
            .unwrap();
        unsafe {
            env::remove_var("GCPCTL_TEST_TOKEN");
        }
        assert_eq!(got, "from-env");
    }

    #[test]
    #[serial]
    fn unset_env_var_falls_back() {
        unsafe {
            env::remove_var("GCPCTL_TEST_UNSET");
        }
        let got = CredentialStore::plaintext()
            .get_credential("from-config", Some("GCPCTL_TEST_UNSET"))
            .unwrap();
        assert_eq!(got, "from-config");
    }

    #[test]
    fn keyring_reference_detection() {
        assert!(CredentialStore::is_keyring_reference("keyring:prod"));
        assert!(!CredentialStore::is_keyring_reference("ya29.token"));
        assert!(!CredentialStore::is_keyring_reference(""));
    }

    #[cfg(not(feature = "secure-storage"))]
    #[test]
    fn keyring_reference_needs_feature() {
        let store = CredentialStore::plaintext();
        let err = store.get_credential("keyring:prod", None).unwrap_err();
        assert!(matches!(err, ConfigError::CredentialError(_)));
        assert!(store.delete_credential("keyring:prod").is_ok());
    }

    #[cfg(feature = "secure-storage")]
    #[test]
    #[ignore = "needs a reachable OS keyring"]
    fn keyring_store_load_delete() {
        let store = CredentialStore::new();
        let reference = store.store_credential("gcpctl-test", "ya29.secret").unwrap();
        assert!(CredentialStore::is_keyring_reference(&reference));
        assert_eq!(store.get_credential(&reference, None).unwrap(), "ya29.secret");
        store.delete_credential(&reference).unwrap();
    }
}
