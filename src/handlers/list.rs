//! `/list-incs`: post links to every open incident.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::clients::{Backends, ChatMessage};
use crate::config::Settings;
use crate::models::{IncidentSource, ListOutcome};
use crate::SwarmbotResult;

pub const NO_INCIDENTS: &str = "No incidents to address";
pub const LIST_PRETEXT: &str = "Here are a list of incidents needing review still:";

/// Turn ids into clickable links, one per paragraph
pub fn format_incident_list(ids: &[String], link_base: &str) -> String {
    ids.iter()
        .map(|id| format!("{}{}", link_base, id))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Open work in both backends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenIncidents {
    pub paging: Vec<String>,
    pub tracker: Vec<String>,
}

impl OpenIncidents {
    pub fn total(&self) -> usize {
        self.paging.len() + self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Handler for `/list-incs` and the courtesy list posted during a swarm
#[derive(Clone)]
pub struct ListHandler {
    backends: Backends,
    settings: Arc<Settings>,
}

impl ListHandler {
    pub fn new(backends: Backends, settings: Arc<Settings>) -> Self {
        Self { backends, settings }
    }

    /// Read the open incidents from both backends. Any failure is fatal.
    pub async fn open_incidents(&self) -> SwarmbotResult<OpenIncidents> {
        let primary = self.backends.paging.primary_on_call().await?;
        debug!(user_id = %primary.id, "Listing incidents for primary on-call");

        let (paging, tracker) = tokio::join!(
            self.backends.paging.incidents_for_user(&primary.id),
            self.backends.tracker.search_issues(&self.settings.jira.jql_query),
        );

        Ok(OpenIncidents {
            paging: paging?,
            tracker: tracker?,
        })
    }

    /// Build the listing text without posting it
    pub async fn render(&self) -> SwarmbotResult<ListOutcome> {
        let open = self.open_incidents().await?;
        Ok(self.format(&open))
    }

    pub fn format(&self, open: &OpenIncidents) -> ListOutcome {
        if open.is_empty() {
            return ListOutcome {
                open_count: 0,
                text: NO_INCIDENTS.to_string(),
            };
        }

        let paging = format_incident_list(
            &open.paging,
            &self.settings.link_base(IncidentSource::PagingSystem),
        );
        let tracker = format_incident_list(
            &open.tracker,
            &self.settings.link_base(IncidentSource::IssueTracker),
        );

        ListOutcome {
            open_count: open.total(),
            text: format!("{}\n{}", paging, tracker),
        }
    }

    /// Handle the list operation for a channel
    #[instrument(skip(self))]
    pub async fn handle_list(&self, channel: &str) -> SwarmbotResult<ListOutcome> {
        let outcome = self.render().await?;

        let message = if outcome.open_count == 0 {
            ChatMessage::text(NO_INCIDENTS)
        } else {
            ChatMessage::text(outcome.text.as_str()).with_pretext(LIST_PRETEXT)
        };

        self.backends
            .chat
            .post_message(channel, &message)
            .await?;

        info!(channel, open_count = outcome.open_count, "Posted incident list");
        Ok(outcome)
    }
}
