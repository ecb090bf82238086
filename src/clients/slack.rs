//! Slack Web API client.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatClient, ChatMessage};
use crate::config::settings::{with_trailing_slash, SlackSettings};
use crate::{SwarmbotError, SwarmbotResult};

/// Slack wraps every response in `{ "ok": bool, "error": "..." }`
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Empty {}

#[derive(Debug, Deserialize)]
struct ProfileBody {
    profile: Profile,
}

#[derive(Debug, Deserialize)]
struct Profile {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    attachments: [&'a ChatMessage; 1],
}

impl<T> ApiEnvelope<T> {
    fn into_result(self, method: &str) -> Result<Option<T>, String> {
        if self.ok {
            Ok(self.body)
        } else {
            Err(format!(
                "{} returned {}",
                method,
                self.error.unwrap_or_else(|| "unknown_error".to_string())
            ))
        }
    }
}

pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl SlackClient {
    pub fn new(http: reqwest::Client, settings: &SlackSettings) -> Self {
        Self {
            http,
            api_base: with_trailing_slash(&settings.api_base),
            bot_token: settings.bot_token.clone(),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}{}", self.api_base, method)
    }

    async fn read_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
        method: &str,
    ) -> Result<Option<T>, String> {
        let envelope: ApiEnvelope<T> = response
            .error_for_status()
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())?;
        envelope.into_result(method)
    }
}

#[async_trait]
impl ChatClient for SlackClient {
    async fn post_message(&self, channel: &str, message: &ChatMessage) -> SwarmbotResult<()> {
        let request = PostMessageRequest {
            channel,
            attachments: [message],
        };

        let response = self
            .http
            .post(self.url("chat.postMessage"))
            .bearer_auth(&self.bot_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| SwarmbotError::notification(channel, e.to_string()))?;

        Self::read_envelope::<Empty>(response, "chat.postMessage")
            .await
            .map_err(|e| SwarmbotError::notification(channel, e))?;

        debug!(channel, "Posted message");
        Ok(())
    }

    async fn user_email(&self, user_id: &str) -> SwarmbotResult<String> {
        let lookup_failed = |e: String| {
            SwarmbotError::user_resolution(format!("Slack profile for {} unavailable: {}", user_id, e))
        };

        let response = self
            .http
            .get(self.url("users.profile.get"))
            .bearer_auth(&self.bot_token)
            .query(&[("user", user_id)])
            .send()
            .await
            .map_err(|e| lookup_failed(e.to_string()))?;

        let body: Option<ProfileBody> = Self::read_envelope(response, "users.profile.get")
            .await
            .map_err(lookup_failed)?;

        body.and_then(|b| b.profile.email)
            .filter(|email| !email.is_empty())
            .ok_or_else(|| lookup_failed("profile has no email".to_string()))
    }
}
