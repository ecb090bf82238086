//! Jira REST API v2 client using a personal access token.

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{TrackerClient, TrackerUser};
use crate::config::settings::{with_trailing_slash, JiraSettings};
use crate::models::IncidentSource;
use crate::{ResultExt, SwarmbotError, SwarmbotResult};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    issues: Vec<IssueSummary>,
}

#[derive(Debug, Deserialize)]
struct IssueSummary {
    key: String,
}

pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    max_results: u32,
}

impl JiraClient {
    pub fn new(http: reqwest::Client, settings: &JiraSettings) -> Self {
        Self {
            http,
            base_url: with_trailing_slash(&settings.base_url),
            token: settings.token.clone(),
            max_results: settings.max_results,
        }
    }

    /// `{base}rest/api/2/` followed by `segments`, each percent-encoded as a
    /// single path segment
    fn endpoint(&self, segments: &[&str]) -> SwarmbotResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .and_then(|base| base.join("rest/api/2/"))
            .map_err(|e| SwarmbotError::configuration(format!("invalid Jira base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SwarmbotError::configuration("Jira base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.token)
    }
}

#[async_trait]
impl TrackerClient for JiraClient {
    async fn search_issues(&self, query: &str) -> SwarmbotResult<Vec<String>> {
        let max_results = self.max_results.to_string();
        let response: SearchResponse = self
            .request(Method::GET, self.endpoint(&["search"])?)
            .query(&[
                ("jql", query),
                ("startAt", "0"),
                ("maxResults", max_results.as_str()),
                ("fields", "key"),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_fetch_context(IncidentSource::IssueTracker)?
            .json()
            .await
            .with_fetch_context(IncidentSource::IssueTracker)?;

        Ok(response.issues.into_iter().map(|issue| issue.key).collect())
    }

    async fn find_user_by_username(&self, username: &str) -> SwarmbotResult<TrackerUser> {
        let lookup_failed = |e: reqwest::Error| {
            SwarmbotError::user_resolution(format!("Jira lookup for {} failed: {}", username, e))
        };

        let users: Vec<TrackerUser> = self
            .request(Method::GET, self.endpoint(&["user", "search"])?)
            .query(&[("username", username)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(lookup_failed)?
            .json()
            .await
            .map_err(lookup_failed)?;

        users
            .into_iter()
            .next()
            .ok_or_else(|| SwarmbotError::user_resolution(format!("no Jira user matching {}", username)))
    }

    async fn assign_issue(&self, issue_key: &str, assignee: &TrackerUser) -> SwarmbotResult<()> {
        let url = self.endpoint(&["issue", issue_key, "assignee"])?;
        let response = self
            .request(Method::PUT, url)
            .json(&json!({ "name": assignee.name }))
            .send()
            .await
            .map_err(|e| {
                SwarmbotError::backend_assign(IncidentSource::IssueTracker, issue_key, e.to_string())
            })?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(SwarmbotError::backend_assign(
                IncidentSource::IssueTracker,
                issue_key,
                format!("received status {}: {}", status.as_u16(), body.trim()),
            ));
        }

        debug!(issue_key, assignee = %assignee.name, "Assigned Jira issue");
        Ok(())
    }
}
