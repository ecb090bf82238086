//! Swarmbot
//!
//! On-call coordination bot. Watches the PagerDuty and Jira queues for
//! pressure, swarms the support channel when the queue backs up, and serves
//! the `/swarm-init`, `/assign` and `/list-incs` slash commands.

use anyhow::Result;

pub mod cli;
pub mod clients;
pub mod config;
pub mod handlers;
pub mod models;
pub mod monitor;
pub mod server;

use models::IncidentSource;

/// Application-wide error types with context preservation
#[derive(Debug, thiserror::Error)]
pub enum SwarmbotError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to fetch from {backend}: {message}")]
    BackendFetch {
        backend: IncidentSource,
        message: String,
    },

    #[error("Failed to assign {incident} in {backend}: {message}")]
    BackendAssign {
        backend: IncidentSource,
        incident: String,
        message: String,
    },

    #[error("User resolution failed: {message}")]
    UserResolution { message: String },

    #[error("Failed to post message to {channel}: {message}")]
    Notification { channel: String, message: String },

    #[error("Unrecognized command: {0}")]
    UnrecognizedCommand(String),

    #[error("Invalid incident reference: {0}")]
    InvalidIncidentRef(String),

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("HTTP error: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl SwarmbotError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a fetch error for one backend
    pub fn backend_fetch(backend: IncidentSource, message: impl Into<String>) -> Self {
        Self::BackendFetch {
            backend,
            message: message.into(),
        }
    }

    /// Create an assignment error for one backend
    pub fn backend_assign(
        backend: IncidentSource,
        incident: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::BackendAssign {
            backend,
            incident: incident.into(),
            message: message.into(),
        }
    }

    pub fn user_resolution(message: impl Into<String>) -> Self {
        Self::UserResolution {
            message: message.into(),
        }
    }

    /// Create a chat notification error for a channel
    pub fn notification(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Notification {
            channel: channel.into(),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Whether the failure should be surfaced to the requester in chat.
    /// A failed post cannot be reported through the same channel.
    pub fn is_reportable(&self) -> bool {
        !matches!(
            self,
            SwarmbotError::Notification { .. } | SwarmbotError::UnrecognizedCommand(_)
        )
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            SwarmbotError::Configuration { message } => {
                format!("Configuration issue: {}", message)
            }
            SwarmbotError::BackendFetch { backend, message } => {
                format!("Could not read the {} queue: {}", backend, message)
            }
            SwarmbotError::BackendAssign {
                backend,
                incident,
                message,
            } => {
                format!("Could not assign {} in {}: {}", incident, backend, message)
            }
            SwarmbotError::UserResolution { message } => {
                format!("Could not find your account: {}", message)
            }
            SwarmbotError::Notification { channel, message } => {
                format!("Could not post to {}: {}", channel, message)
            }
            SwarmbotError::UnrecognizedCommand(command) => {
                format!("Unknown command: {}", command)
            }
            SwarmbotError::InvalidIncidentRef(text) => {
                if text.is_empty() {
                    "Please provide an incident id, e.g. `/assign OHSS-102`".to_string()
                } else {
                    format!("Not a valid incident reference: {}", text)
                }
            }
            SwarmbotError::Transport { message } => {
                format!("Communication error: {}", message)
            }
            SwarmbotError::Http { source } => {
                format!("Backend request failed: {}", source)
            }
            SwarmbotError::Io { source } => {
                format!("File system error: {}", source)
            }
            SwarmbotError::Serialization { source } => {
                format!("Data format error: {}", source)
            }
        }
    }
}

/// Convenience type alias for Results
pub type SwarmbotResult<T> = Result<T, SwarmbotError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    fn with_fetch_context(self, backend: IncidentSource) -> SwarmbotResult<T>;
    fn with_notification_context(self, channel: &str) -> SwarmbotResult<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn with_fetch_context(self, backend: IncidentSource) -> SwarmbotResult<T> {
        self.map_err(|e| SwarmbotError::backend_fetch(backend, format!("{:#}", e.into())))
    }

    fn with_notification_context(self, channel: &str) -> SwarmbotResult<T> {
        self.map_err(|e| SwarmbotError::notification(channel, format!("{:#}", e.into())))
    }
}
