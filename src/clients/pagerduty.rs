//! PagerDuty REST API v2 client.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{PagingClient, PagingUser};
use crate::config::settings::{with_trailing_slash, PagerDutySettings};
use crate::models::IncidentSource;
use crate::{ResultExt, SwarmbotError, SwarmbotResult};

const PAGERDUTY_ACCEPT: &str = "application/vnd.pagerduty+json;version=2";

#[derive(Debug, Deserialize)]
struct OnCallsResponse {
    oncalls: Vec<OnCall>,
}

#[derive(Debug, Deserialize)]
struct OnCall {
    user: PagingUser,
}

#[derive(Debug, Deserialize)]
struct IncidentsResponse {
    incidents: Vec<IncidentSummary>,
}

#[derive(Debug, Deserialize)]
struct IncidentSummary {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    users: Vec<PagingUser>,
}

pub struct PagerDutyClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    schedule_id: String,
    escalation_policy_id: String,
}

impl PagerDutyClient {
    pub fn new(http: reqwest::Client, settings: &PagerDutySettings) -> Self {
        Self {
            http,
            api_base: with_trailing_slash(&settings.api_base),
            token: settings.token.clone(),
            schedule_id: settings.schedule_id.clone(),
            escalation_policy_id: settings.escalation_policy_id.clone(),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_base, path))
            .header(AUTHORIZATION, format!("Token token={}", self.token))
            .header(ACCEPT, PAGERDUTY_ACCEPT)
    }
}

#[async_trait]
impl PagingClient for PagerDutyClient {
    async fn primary_on_call(&self) -> SwarmbotResult<PagingUser> {
        let response: OnCallsResponse = self
            .request(Method::GET, "oncalls")
            .query(&[
                ("escalation_policy_ids[]", self.escalation_policy_id.as_str()),
                ("schedule_ids[]", self.schedule_id.as_str()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_fetch_context(IncidentSource::PagingSystem)?
            .json()
            .await
            .with_fetch_context(IncidentSource::PagingSystem)?;

        let primary = response
            .oncalls
            .into_iter()
            .next()
            .map(|oncall| oncall.user)
            .ok_or_else(|| {
                SwarmbotError::backend_fetch(
                    IncidentSource::PagingSystem,
                    format!("no one is on call for schedule {}", self.schedule_id),
                )
            })?;

        debug!(user_id = %primary.id, "Resolved primary on-call");
        Ok(primary)
    }

    async fn incidents_for_user(&self, user_id: &str) -> SwarmbotResult<Vec<String>> {
        let response: IncidentsResponse = self
            .request(Method::GET, "incidents")
            .query(&[("user_ids[]", user_id)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_fetch_context(IncidentSource::PagingSystem)?
            .json()
            .await
            .with_fetch_context(IncidentSource::PagingSystem)?;

        Ok(response.incidents.into_iter().map(|inc| inc.id).collect())
    }

    async fn find_user_by_email(&self, email: &str) -> SwarmbotResult<PagingUser> {
        let lookup_failed =
            |e: reqwest::Error| SwarmbotError::user_resolution(format!("PagerDuty lookup for {} failed: {}", email, e));

        let response: UsersResponse = self
            .request(Method::GET, "users")
            .query(&[("query", email)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(lookup_failed)?
            .json()
            .await
            .map_err(lookup_failed)?;

        response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| SwarmbotError::user_resolution(format!("no PagerDuty user with email {}", email)))
    }

    async fn assign_incident(&self, incident_id: &str, assignee: &PagingUser) -> SwarmbotResult<()> {
        let body = json!({
            "incidents": [{
                "id": incident_id,
                "type": "incident_reference",
                "assignments": [{
                    "assignee": { "id": assignee.id, "type": "user_reference" }
                }]
            }]
        });

        self.request(Method::PUT, "incidents")
            .header("From", assignee.email.as_str())
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                SwarmbotError::backend_assign(IncidentSource::PagingSystem, incident_id, e.to_string())
            })?;

        debug!(incident_id, assignee = %assignee.id, "Assigned PagerDuty incident");
        Ok(())
    }
}
