//! Swarm workflow shared by `/swarm-init` and automatic triggers.
//!
//! Announce, post the courtesy list, then ping the on-call pair. Only the
//! two chat posts of its own can fail the swarm.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::list::ListHandler;
use crate::clients::{Backends, ChatMessage};
use crate::config::settings::SwarmSettings;
use crate::config::Settings;
use crate::models::{CourtesyList, SwarmEvent, SwarmReport};
use crate::SwarmbotResult;

pub fn announcement(settings: &SwarmSettings) -> String {
    format!(
        "Swarm Initiated! -- <@{}>, please help on-call engineers work the queue",
        settings.escalation_group
    )
}

pub fn on_call_ping(settings: &SwarmSettings) -> String {
    format!(
        "<@{}> <@{}>, what incident are you working on?",
        settings.primary_handle, settings.secondary_handle
    )
}

/// Runs the swarm: announce, post the courtesy list, ping on-call
#[derive(Clone)]
pub struct SwarmHandler {
    backends: Backends,
    settings: Arc<Settings>,
    list: ListHandler,
}

impl SwarmHandler {
    pub fn new(backends: Backends, settings: Arc<Settings>) -> Self {
        let list = ListHandler::new(backends.clone(), settings.clone());
        Self {
            backends,
            settings,
            list,
        }
    }

    #[instrument(skip(self), fields(trigger = event.label(), channel = event.channel()))]
    pub async fn trigger_swarm(&self, event: &SwarmEvent) -> SwarmbotResult<SwarmReport> {
        let channel = event.channel();
        info!("Starting swarm");

        self.backends
            .chat
            .post_message(channel, &ChatMessage::pretext(announcement(&self.settings.swarm)))
            .await?;

        let courtesy_list = match self.list.handle_list(channel).await {
            Ok(outcome) => CourtesyList::Posted {
                open_count: outcome.open_count,
            },
            Err(e) => {
                warn!(error = %e, "Courtesy incident list failed, continuing swarm");
                CourtesyList::Failed {
                    reason: e.to_string(),
                }
            }
        };

        self.backends
            .chat
            .post_message(channel, &ChatMessage::text(on_call_ping(&self.settings.swarm)))
            .await?;

        info!("Swarm complete");
        Ok(SwarmReport {
            event: event.clone(),
            courtesy_list,
        })
    }
}
