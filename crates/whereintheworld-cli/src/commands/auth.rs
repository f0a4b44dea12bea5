use clap::{Subcommand, ValueEnum};
use whereintheworld_core::storage::credentials;
use whereintheworld_core::{CredentialKey, Credentials};

#[derive(Clone, Copy, ValueEnum)]
pub enum Service {
    Google,
    Slack,
}

impl From<Service> for CredentialKey {
    fn from(service: Service) -> Self {
        match service {
            Service::Google => CredentialKey::Google,
            Service::Slack => CredentialKey::Slack,
        }
    }
}

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store an API key in the OS keyring
    Set {
        service: Service,
        /// Google Maps API key or Slack user token (xoxp-...)
        key: String,
    },
    /// Remove a stored API key
    Clear { service: Service },
    /// Show whether a key is configured
    Show { service: Service },
}

pub fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AuthAction::Set { service, key } => {
            let key = key.trim();
            if key.is_empty() {
                return Err("key must not be empty".into());
            }
            credentials::store(service.into(), key)?;
            println!("ok");
        }
        AuthAction::Clear { service } => {
            credentials::forget(service.into())?;
            println!("ok");
        }
        AuthAction::Show { service } => {
            let key: CredentialKey = service.into();
            let creds = Credentials::load();
            let value = match key {
                CredentialKey::Google => creds.google_api_key,
                CredentialKey::Slack => creds.slack_api_key,
            };
            if value.is_empty() {
                println!("not configured");
            } else {
                let from_env = std::env::var(key.env_var()).is_ok_and(|v| !v.trim().is_empty());
                let source = if from_env { key.env_var() } else { "keyring" };
                println!("configured ({}, from {source})", mask(&value));
            }
        }
    }
    Ok(())
}

/// Keep the first four characters, hide the rest.
fn mask(secret: &str) -> String {
    let shown: String = secret.chars().take(4).collect();
    format!("{shown}****")
}
