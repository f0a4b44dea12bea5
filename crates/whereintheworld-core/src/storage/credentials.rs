//! API keys, kept in the OS keyring.
//!
//! Environment variables override the keyring, which is how headless
//! machines without a secret service supply keys.

use tracing::warn;

use crate::error::CredentialError;

/// Which API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKey {
    Google,
    Slack,
}

impl CredentialKey {
    pub fn keyring_name(&self) -> &'static str {
        match self {
            CredentialKey::Google => "google_api_key",
            CredentialKey::Slack => "slack_api_key",
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            CredentialKey::Google => "WHEREINTHEWORLD_GOOGLE_API_KEY",
            CredentialKey::Slack => "WHEREINTHEWORLD_SLACK_API_KEY",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub google_api_key: String,
    pub slack_api_key: String,
}

impl Credentials {
    /// Read both keys. Keyring failures are logged and read as empty,
    /// which the pipeline reports as a missing credential.
    pub fn load() -> Self {
        Self {
            google_api_key: lookup(CredentialKey::Google),
            slack_api_key: lookup(CredentialKey::Slack),
        }
    }
}

fn lookup(key: CredentialKey) -> String {
    if let Ok(value) = std::env::var(key.env_var()) {
        if !value.trim().is_empty() {
            return value;
        }
    }
    match keyring_store::get(key.keyring_name()) {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            warn!(key = key.keyring_name(), error = %e, "failed to read credential");
            String::new()
        }
    }
}

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    use crate::error::CredentialError;

    const SERVICE: &str = "whereintheworld";

    fn entry(key: &str) -> Result<keyring::Entry, CredentialError> {
        keyring::Entry::new(SERVICE, key).map_err(|source| CredentialError::Keyring {
            key: key.to_string(),
            source,
        })
    }

    pub fn get(key: &str) -> Result<Option<String>, CredentialError> {
        match entry(key)?.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(source) => Err(CredentialError::Keyring {
                key: key.to_string(),
                source,
            }),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), CredentialError> {
        entry(key)?
            .set_password(value)
            .map_err(|source| CredentialError::Keyring {
                key: key.to_string(),
                source,
            })
    }

    pub fn delete(key: &str) -> Result<(), CredentialError> {
        match entry(key)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(source) => Err(CredentialError::Keyring {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Store a key in the keyring.
pub fn store(key: CredentialKey, value: &str) -> Result<(), CredentialError> {
    keyring_store::set(key.keyring_name(), value)
}

/// Remove a key from the keyring.
pub fn forget(key: CredentialKey) -> Result<(), CredentialError> {
    keyring_store::delete(key.keyring_name())
}
