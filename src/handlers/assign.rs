//! `/assign`: hand an incident to the person who asked for it.
//!
//! The requester is matched across systems by email: Slack profile first,
//! then the PagerDuty or Jira account with the same address.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::clients::{Backends, ChatMessage};
use crate::config::Settings;
use crate::models::{IncidentRef, IncidentSource};
use crate::SwarmbotResult;

/// Who asked for the assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub user_id: String,
    pub user_name: String,
}

impl Requester {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
        }
    }
}

pub fn assignment_confirmation(incident: &IncidentRef, requester: &Requester) -> String {
    format!(
        "Incident {} Assigned, thank you <@{}>!",
        incident.id, requester.user_name
    )
}

/// Handler for `/assign`
#[derive(Clone)]
pub struct AssignHandler {
    backends: Backends,
    settings: Arc<Settings>,
}

impl AssignHandler {
    pub fn new(backends: Backends, settings: Arc<Settings>) -> Self {
        Self { backends, settings }
    }

    /// Parse free text with the configured marker, then assign
    pub async fn assign_from_text(
        &self,
        channel: &str,
        requester: &Requester,
        text: &str,
    ) -> SwarmbotResult<IncidentRef> {
        let incident = IncidentRef::parse(text, &self.settings.jira.issue_marker)?;
        self.assign_incident(channel, requester, &incident).await?;
        Ok(incident)
    }

    /// Assign an incident to the requester and confirm in the channel.
    ///
    /// Stops at the first failing stage; nothing is posted unless every
    /// stage succeeds.
    #[instrument(skip(self), fields(source = %incident.source, incident = %incident.id))]
    pub async fn assign_incident(
        &self,
        channel: &str,
        requester: &Requester,
        incident: &IncidentRef,
    ) -> SwarmbotResult<()> {
        let email = self.backends.chat.user_email(&requester.user_id).await?;
        debug!(requester = %requester.user_id, "Resolved requester email");

        match incident.source {
            IncidentSource::PagingSystem => {
                let user = self.backends.paging.find_user_by_email(&email).await?;
                self.backends.paging.assign_incident(&incident.id, &user).await?;
            }
            IncidentSource::IssueTracker => {
                let user = self.backends.tracker.find_user_by_username(&email).await?;
                self.backends.tracker.assign_issue(&incident.id, &user).await?;
            }
        }

        self.backends
            .chat
            .post_message(
                channel,
                &ChatMessage::text(assignment_confirmation(incident, requester)),
            )
            .await?;

        info!(requester = %requester.user_name, "Incident assigned");
        Ok(())
    }
}
