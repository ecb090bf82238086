//! Event consumption.
//!
//! One task owns both inbound queues and handles one event at a time.
//! A failing handler never stops the loop.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::transport::InboundCommand;
use crate::clients::{ChatClient, ChatMessage};
use crate::handlers::{CommandOutcome, CommandRouter};
use crate::models::SwarmEvent;
use crate::SwarmbotError;

pub fn failure_message(command: &str, error: &SwarmbotError) -> String {
    format!(":warning: {} failed: {}", command, error.user_message())
}

pub struct Dispatcher {
    router: CommandRouter,
    chat: Arc<dyn ChatClient>,
    commands: mpsc::Receiver<InboundCommand>,
    triggers: mpsc::Receiver<SwarmEvent>,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        router: CommandRouter,
        chat: Arc<dyn ChatClient>,
        commands: mpsc::Receiver<InboundCommand>,
        triggers: mpsc::Receiver<SwarmEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            router,
            chat,
            commands,
            triggers,
            cancel,
        }
    }

    /// Process events until cancelled or both queues close.
    ///
    /// Automatic triggers are polled before commands, so a busy command queue
    /// cannot hold back an automatic swarm.
    pub async fn run(mut self) {
        info!("Dispatcher started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                Some(event) = self.triggers.recv() => self.handle_trigger(event).await,
                Some(inbound) = self.commands.recv() => self.handle_command(inbound).await,
                else => {
                    warn!("All event queues closed");
                    break;
                }
            }
        }

        info!("Dispatcher stopped");
    }

    #[instrument(skip_all, fields(id = %inbound.id, command = %inbound.command.command))]
    async fn handle_command(&self, inbound: InboundCommand) {
        let result = self.router.dispatch(&inbound.command).await;

        let handled = match result {
            Ok(CommandOutcome::Ignored) => {
                debug!("Command ignored");
                false
            }
            Ok(outcome) => {
                debug!(?outcome, "Command handled");
                true
            }
            Err(e) => {
                error!(error = %e, "Command failed");
                self.report_failure(&inbound.command.channel_id, &inbound.command.command, &e)
                    .await;
                false
            }
        };

        inbound.acknowledge(handled);
    }

    #[instrument(skip_all, fields(trigger = event.label(), channel = event.channel()))]
    async fn handle_trigger(&self, event: SwarmEvent) {
        match self.router.swarm().trigger_swarm(&event).await {
            Ok(report) => debug!(?report, "Automatic swarm finished"),
            Err(e) => {
                error!(error = %e, "Automatic swarm failed");
                self.report_failure(event.channel(), "swarm", &e).await;
            }
        }
    }

    /// Best effort: a failed post is only logged
    async fn report_failure(&self, channel: &str, command: &str, error: &SwarmbotError) {
        if !error.is_reportable() {
            return;
        }
        let message = ChatMessage::text(failure_message(command, error));
        if let Err(e) = self.chat.post_message(channel, &message).await {
            warn!(channel, error = %e, "Could not report failure to channel");
        }
    }
}
