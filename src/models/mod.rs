// Public exports for data models

pub mod command;
pub mod incident;
pub mod swarm;

pub use command::{CommandKind, SlashCommand};
pub use incident::{IncidentRef, IncidentSource, DEFAULT_TRACKER_MARKER};
pub use swarm::{CourtesyList, ListOutcome, SwarmEvent, SwarmReport};
