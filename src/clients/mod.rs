//! Backend clients.
//!
//! Each external API sits behind a trait so the monitor and the command
//! handlers can run against fakes. The production implementations are thin
//! `reqwest` wrappers over the PagerDuty, Jira and Slack REST APIs.

pub mod jira;
pub mod pagerduty;
pub mod slack;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::settings::{HttpSettings, Settings};
use crate::{SwarmbotError, SwarmbotResult};

pub use jira::JiraClient;
pub use pagerduty::PagerDutyClient;
pub use slack::SlackClient;

/// A PagerDuty user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingUser {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    /// Reference objects (on-call entries) carry only a summary
    #[serde(default)]
    pub summary: String,
}

impl PagingUser {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.summary
        } else {
            &self.name
        }
    }
}

/// A Jira user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerUser {
    pub name: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub display_name: String,
}

/// One chat post: a single attachment with optional pretext and text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ChatMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            pretext: None,
            text: Some(text.into()),
        }
    }

    pub fn pretext(pretext: impl Into<String>) -> Self {
        Self {
            pretext: Some(pretext.into()),
            text: None,
        }
    }

    pub fn with_pretext(mut self, pretext: impl Into<String>) -> Self {
        self.pretext = Some(pretext.into());
        self
    }
}

/// Paging system (PagerDuty)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PagingClient: Send + Sync {
    /// Current primary on-call for the configured schedule and escalation policy
    async fn primary_on_call(&self) -> SwarmbotResult<PagingUser>;

    /// Ids of the incidents assigned to a user
    async fn incidents_for_user(&self, user_id: &str) -> SwarmbotResult<Vec<String>>;

    async fn find_user_by_email(&self, email: &str) -> SwarmbotResult<PagingUser>;

    async fn assign_incident(&self, incident_id: &str, assignee: &PagingUser) -> SwarmbotResult<()>;
}

/// Issue tracker (Jira)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// Keys of the issues matching a JQL query
    async fn search_issues(&self, query: &str) -> SwarmbotResult<Vec<String>>;

    async fn find_user_by_username(&self, username: &str) -> SwarmbotResult<TrackerUser>;

    async fn assign_issue(&self, issue_key: &str, assignee: &TrackerUser) -> SwarmbotResult<()>;
}

/// Chat platform (Slack)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn post_message(&self, channel: &str, message: &ChatMessage) -> SwarmbotResult<()>;

    /// Email address on the user's chat profile
    async fn user_email(&self, user_id: &str) -> SwarmbotResult<String>;
}

/// The three collaborators every handler needs
#[derive(Clone)]
pub struct Backends {
    pub paging: Arc<dyn PagingClient>,
    pub tracker: Arc<dyn TrackerClient>,
    pub chat: Arc<dyn ChatClient>,
}

impl Backends {
    pub fn new(
        paging: Arc<dyn PagingClient>,
        tracker: Arc<dyn TrackerClient>,
        chat: Arc<dyn ChatClient>,
    ) -> Self {
        Self {
            paging,
            tracker,
            chat,
        }
    }

    /// Build the REST clients, sharing one connection pool
    pub fn from_settings(settings: &Settings) -> SwarmbotResult<Self> {
        let http = build_http_client(&settings.http)?;

        Ok(Self {
            paging: Arc::new(PagerDutyClient::new(http.clone(), &settings.pagerduty)),
            tracker: Arc::new(JiraClient::new(http.clone(), &settings.jira)),
            chat: Arc::new(SlackClient::new(http, &settings.slack)),
        })
    }
}

/// HTTP client with a per-request timeout, so a hung backend cannot stall a poll
pub fn build_http_client(settings: &HttpSettings) -> SwarmbotResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(settings.request_timeout())
        .user_agent(concat!("swarmbot/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SwarmbotError::configuration(format!("Failed to build HTTP client: {}", e)))
}
