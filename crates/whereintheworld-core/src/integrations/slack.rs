//! Slack integration -- set the user's profile status.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use url::Url;

use crate::error::{CoreError, PublishError};
use crate::integrations::traits::PresenceService;
use crate::status::ComposedStatus;
use crate::{http_client, BoxFuture};

const DEFAULT_BASE_URL: &str = "https://slack.com/";
const PROFILE_SET_PATH: &str = "api/users.profile.set";

#[derive(Debug, Clone)]
pub struct SlackPresence {
    client: Client,
    base_url: Url,
}

impl SlackPresence {
    pub fn new(timeout: Duration) -> Result<Self, CoreError> {
        let base_url = Url::parse(DEFAULT_BASE_URL).expect("static URL is valid");
        Ok(Self::with_base_url(http_client(timeout)?, base_url))
    }

    pub fn with_base_url(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Set the Slack user profile status.
    async fn set_profile_status(
        &self,
        status: &ComposedStatus,
        token: &str,
    ) -> Result<(), PublishError> {
        let endpoint = self
            .base_url
            .join(PROFILE_SET_PATH)
            .map_err(|e| PublishError::Unavailable(e.to_string()))?;
        let body = json!({
            "profile": {
                "status_text": status.text,
                "status_emoji": status.icon,
                "status_expiration": status.expiration,
            }
        });

        let resp = self
            .client
            .post(endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(PublishError::Unavailable(format!(
                "users.profile.set returned HTTP {status}"
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| PublishError::Unavailable(format!("unreadable response: {e}")))?;

        if body.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let err = body
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            return Err(PublishError::Unavailable(err.to_string()));
        }
        Ok(())
    }
}

impl PresenceService for SlackPresence {
    fn name(&self) -> &str {
        "slack"
    }

    fn display_name(&self) -> &str {
        "Slack"
    }

    fn set_status<'a>(
        &'a self,
        status: &'a ComposedStatus,
        api_key: &'a str,
    ) -> BoxFuture<'a, Result<(), PublishError>> {
        Box::pin(self.set_profile_status(status, api_key))
    }
}
