use std::sync::Arc;

use chrono::Utc;
use clap::Subcommand;
use whereintheworld_core::settings::ManualStatusItem;
use whereintheworld_core::{
    compose, Config, Credentials, ManualStatus, PresencePublisher, SlackPresence, StatusContribution,
};

#[derive(Subcommand)]
pub enum StatusAction {
    /// List saved manual statuses
    List,
    /// Save a manual status for later use
    Add {
        text: String,
        #[arg(long)]
        icon: Option<String>,
        /// Seconds until Slack clears the status (0 = never)
        #[arg(long, default_value_t = 0)]
        expires: i64,
    },
    /// Set a manual status now, by saved index or free text
    Set {
        /// Index from `status list`, or the status text
        status: String,
        /// Icon; overrides the saved one when setting by index
        #[arg(long)]
        icon: Option<String>,
        /// Seconds until Slack clears the status; overrides the saved value
        #[arg(long)]
        expires: Option<i64>,
    },
    /// Clear the Slack status
    Clear,
}

pub async fn run(action: StatusAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        StatusAction::List => {
            let config = Config::load()?;
            if config.manual_status_items.is_empty() {
                println!("no saved statuses");
            }
            for (i, item) in config.manual_status_items.iter().enumerate() {
                let icon = item.icon.as_deref().unwrap_or("");
                let expiry = match item.expiration_seconds {
                    0 => String::new(),
                    secs => format!(" (expires after {secs}s)"),
                };
                println!("{i:>3}  {icon} {}{expiry}", item.text);
            }
        }
        StatusAction::Add {
            text,
            icon,
            expires,
        } => {
            if text.trim().is_empty() {
                return Err("status text must not be empty".into());
            }
            let mut config = Config::load()?;
            config.manual_status_items.push(ManualStatusItem {
                text,
                icon,
                expiration_seconds: expires.max(0),
            });
            config.save()?;
            println!("ok");
        }
        StatusAction::Set {
            status,
            icon,
            expires,
        } => {
            let config = Config::load()?;
            let contribution =
                manual_contribution(&config.manual_status_items, status, icon, expires)?;

            let settings = config.snapshot(&Credentials::load());
            let now = Utc::now();
            let composed = compose(
                None,
                &settings.permanent_contributions(),
                &[ManualStatus::activate(contribution, now)],
                now,
            );

            let slack = SlackPresence::new(config.tracking.request_timeout())?;
            let mut publisher = PresencePublisher::new(Arc::new(slack), settings.slack_api_key);
            publisher.publish(&composed).await?;
            println!("{} {}", composed.icon, composed.text);
        }
        StatusAction::Clear => {
            let config = Config::load()?;
            let credentials = Credentials::load();
            let slack = SlackPresence::new(config.tracking.request_timeout())?;
            let mut publisher = PresencePublisher::new(Arc::new(slack), credentials.slack_api_key);
            publisher.clear_status().await?;
            println!("status cleared");
        }
    }
    Ok(())
}

/// A saved item by index, or free text. `icon` and `expires` override the
/// saved values when given.
fn manual_contribution(
    items: &[ManualStatusItem],
    status: String,
    icon: Option<String>,
    expires: Option<i64>,
) -> Result<StatusContribution, String> {
    let mut contribution = match status.parse::<usize>() {
        Ok(index) => items
            .get(index)
            .map(ManualStatusItem::contribution)
            .ok_or_else(|| format!("no saved status at index {index}"))?,
        Err(_) => StatusContribution::manual(status, "", 0),
    };
    if let Some(icon) = icon {
        contribution.icon = icon;
    }
    if let Some(expires) = expires {
        contribution.expiration_seconds = expires.max(0);
    }
    Ok(contribution)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved() -> Vec<ManualStatusItem> {
        vec![ManualStatusItem {
            text: "In a meeting".into(),
            icon: Some(":calendar:".into()),
            expiration_seconds: 1800,
        }]
    }

    #[test]
    fn index_uses_saved_item() {
        let c = manual_contribution(&saved(), "0".into(), None, None).unwrap();
        assert_eq!(c.text, "In a meeting");
        assert_eq!(c.icon, ":calendar:");
        assert_eq!(c.expiration_seconds, 1800);
    }

    #[test]
    fn flags_override_saved_item() {
        let c = manual_contribution(&saved(), "0".into(), Some(":phone:".into()), Some(600)).unwrap();
        assert_eq!(c.text, "In a meeting");
        assert_eq!(c.icon, ":phone:");
        assert_eq!(c.expiration_seconds, 600);
    }

    #[test]
    fn free_text_with_flags() {
        let c = manual_contribution(&saved(), "Lunch".into(), None, Some(-5)).unwrap();
        assert_eq!(c.text, "Lunch");
        assert_eq!(c.icon, "");
        assert_eq!(c.expiration_seconds, 0);
    }

    #[test]
    fn missing_index_is_an_error() {
        assert!(manual_contribution(&saved(), "3".into(), None, None).is_err());
    }
}
