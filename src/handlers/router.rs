//! Maps slash-command names to their handlers.

use std::sync::Arc;
use tracing::{debug, info};

use super::assign::{AssignHandler, Requester};
use super::list::ListHandler;
use super::swarm::SwarmHandler;
use crate::clients::Backends;
use crate::config::Settings;
use crate::models::{
    CommandKind, IncidentRef, ListOutcome, SlashCommand, SwarmEvent, SwarmReport,
};
use crate::{SwarmbotError, SwarmbotResult};

/// What handling one command produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Swarm(SwarmReport),
    Assigned(IncidentRef),
    Listed(ListOutcome),
    /// Not one of ours
    Ignored,
}

/// Maps slash commands onto the swarm, assign and list operations
#[derive(Clone)]
pub struct CommandRouter {
    swarm: SwarmHandler,
    assign: AssignHandler,
    list: ListHandler,
}

impl CommandRouter {
    pub fn new(backends: Backends, settings: Arc<Settings>) -> Self {
        Self {
            swarm: SwarmHandler::new(backends.clone(), settings.clone()),
            assign: AssignHandler::new(backends.clone(), settings.clone()),
            list: ListHandler::new(backends, settings),
        }
    }

    pub fn swarm(&self) -> &SwarmHandler {
        &self.swarm
    }

    pub async fn dispatch(&self, command: &SlashCommand) -> SwarmbotResult<CommandOutcome> {
        let Some(kind) = command.kind() else {
            let err = SwarmbotError::UnrecognizedCommand(command.command.clone());
            debug!(command = %command.command, "{}", err);
            return Ok(CommandOutcome::Ignored);
        };

        info!(command = kind.name(), channel = %command.channel_id, user = %command.user_id, "Handling command");

        match kind {
            CommandKind::SwarmInit => {
                let event = SwarmEvent::Manual {
                    channel: command.channel_id.clone(),
                };
                self.swarm.trigger_swarm(&event).await.map(CommandOutcome::Swarm)
            }
            CommandKind::Assign => {
                let requester = Requester::new(&command.user_id, &command.user_name);
                self.assign
                    .assign_from_text(&command.channel_id, &requester, &command.text)
                    .await
                    .map(CommandOutcome::Assigned)
            }
            CommandKind::ListIncidents => self
                .list
                .handle_list(&command.channel_id)
                .await
                .map(CommandOutcome::Listed),
        }
    }
}
