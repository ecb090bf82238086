use serde::{Deserialize, Serialize};

/// A request to run the swarm workflow in a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum SwarmEvent {
    /// Someone ran `/swarm-init`
    Manual { channel: String },
    /// The monitor saw pressure
    Automatic { channel: String },
}

impl SwarmEvent {
    pub fn channel(&self) -> &str {
        match self {
            SwarmEvent::Manual { channel } | SwarmEvent::Automatic { channel } => channel,
        }
    }

    pub fn is_automatic(&self) -> bool {
        matches!(self, SwarmEvent::Automatic { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            SwarmEvent::Manual { .. } => "manual",
            SwarmEvent::Automatic { .. } => "automatic",
        }
    }
}

/// Result of the courtesy incident list posted during a swarm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CourtesyList {
    Posted { open_count: usize },
    Failed { reason: String },
}

/// What a completed swarm did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmReport {
    pub event: SwarmEvent,
    pub courtesy_list: CourtesyList,
}

/// Formatted incident listing for one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOutcome {
    pub open_count: usize,
    pub text: String,
}
