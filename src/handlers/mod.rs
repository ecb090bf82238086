// Command and swarm handlers

pub mod assign;
pub mod list;
pub mod router;
pub mod swarm;

pub use assign::{AssignHandler, Requester};
pub use list::{format_incident_list, ListHandler, OpenIncidents};
pub use router::{CommandOutcome, CommandRouter};
pub use swarm::SwarmHandler;
