use serde::{Deserialize, Serialize};

pub const SWARM_INIT: &str = "/swarm-init";
pub const ASSIGN: &str = "/assign";
pub const LIST_INCIDENTS: &str = "/list-incs";

/// Inbound slash command as delivered by Slack (form-encoded)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashCommand {
    pub command: String,
    pub channel_id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub text: String,
}

/// Commands the bot understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    SwarmInit,
    Assign,
    ListIncidents,
}

impl CommandKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            SWARM_INIT => Some(CommandKind::SwarmInit),
            ASSIGN => Some(CommandKind::Assign),
            LIST_INCIDENTS => Some(CommandKind::ListIncidents),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::SwarmInit => SWARM_INIT,
            CommandKind::Assign => ASSIGN,
            CommandKind::ListIncidents => LIST_INCIDENTS,
        }
    }
}

impl SlashCommand {
    pub fn new(command: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            channel_id: channel_id.into(),
            user_id: String::new(),
            user_name: String::new(),
            text: String::new(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self.user_name = user_name.into();
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn kind(&self) -> Option<CommandKind> {
        CommandKind::from_name(&self.command)
    }
}
