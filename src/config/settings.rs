use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

use crate::models::{IncidentSource, DEFAULT_TRACKER_MARKER};

/// Bot-wide configuration loaded from config.toml and environment variables.
/// Built once at startup and shared read-only by every task.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    #[validate(nested)]
    pub slack: SlackSettings,
    #[validate(nested)]
    pub pagerduty: PagerDutySettings,
    #[validate(nested)]
    pub jira: JiraSettings,
    #[validate(nested)]
    pub monitor: MonitorSettings,
    #[validate(nested)]
    pub swarm: SwarmSettings,
    #[validate(nested)]
    pub server: ServerSettings,
    #[validate(nested)]
    pub http: HttpSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SlackSettings {
    #[validate(url)]
    pub api_base: String,
    #[serde(skip_serializing)]
    pub bot_token: String,
    /// Verifies inbound slash-command requests when set
    #[serde(skip_serializing)]
    pub signing_secret: Option<String>,
    /// Channel the monitor swarms when pressure trips
    pub channel_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PagerDutySettings {
    #[validate(url)]
    pub api_base: String,
    #[serde(skip_serializing)]
    pub token: String,
    #[validate(length(min = 1, message = "schedule_id cannot be empty"))]
    pub schedule_id: String,
    #[validate(length(min = 1, message = "escalation_policy_id cannot be empty"))]
    pub escalation_policy_id: String,
    /// Prefix for clickable incident links
    #[validate(url)]
    pub incident_url_base: String,
    /// Open incidents above this count trip pressure
    pub pressure: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct JiraSettings {
    #[validate(url)]
    pub base_url: String,
    #[serde(skip_serializing)]
    pub token: String,
    #[validate(length(min = 1, message = "jql_query cannot be empty"))]
    pub jql_query: String,
    #[validate(range(min = 1, max = 1000))]
    pub max_results: u32,
    pub pressure: usize,
    /// Substring that marks free-text `/assign` input as a Jira key
    pub issue_marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MonitorSettings {
    pub enabled: bool,
    #[validate(range(min = 1, message = "poll_interval_secs must be greater than 0"))]
    pub poll_interval_secs: u64,
    #[validate(range(min = 1, message = "cooldown_secs must be greater than 0"))]
    pub cooldown_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SwarmSettings {
    #[validate(length(min = 1))]
    pub escalation_group: String,
    #[validate(length(min = 1))]
    pub primary_handle: String,
    #[validate(length(min = 1))]
    pub secondary_handle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerSettings {
    #[validate(length(min = 1))]
    pub listen_addr: String,
    /// How long the endpoint waits for the dispatcher before answering Slack
    #[validate(range(min = 1))]
    pub ack_timeout_ms: u64,
    #[validate(range(min = 1))]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HttpSettings {
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
}

impl Default for SlackSettings {
    fn default() -> Self {
        Self {
            api_base: "https://slack.com/api/".to_string(),
            bot_token: String::new(),
            signing_secret: None,
            channel_id: String::new(),
        }
    }
}

impl Default for PagerDutySettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.pagerduty.com/".to_string(),
            token: String::new(),
            schedule_id: "P5LOJUX".to_string(),
            escalation_policy_id: "PA9G4O0".to_string(),
            incident_url_base: "https://pdotest.pagerduty.com/incidents/".to_string(),
            pressure: 3,
        }
    }
}

impl Default for JiraSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            token: String::new(),
            jql_query: "project = 'OpenShift Hosted Support' AND status = 'To Do' OR status = 'In Progress' AND priority >= 'High'".to_string(),
            max_results: 100,
            pressure: 3,
            issue_marker: DEFAULT_TRACKER_MARKER.to_string(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 60,
            cooldown_secs: 60 * 60,
        }
    }
}

impl Default for SwarmSettings {
    fn default() -> Self {
        Self {
            escalation_group: "sd-sre-nasa".to_string(),
            primary_handle: "sre-platform-primary".to_string(),
            secondary_handle: "sre-platform-secondary".to_string(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            ack_timeout_ms: 2500,
            queue_capacity: 64,
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

impl MonitorSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl ServerSettings {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

impl HttpSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl JiraSettings {
    /// Link prefix for issues, `{base_url}browse/`
    pub fn browse_url_base(&self) -> String {
        format!("{}browse/", with_trailing_slash(&self.base_url))
    }
}

impl Settings {
    /// Load settings with precedence: defaults < config file < environment.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Self::from_file(path)?
            }
            None => {
                let default_path = Self::config_path();
                if default_path.exists() {
                    tracing::info!("Using default config file: {}", default_path.display());
                    Self::from_file(&default_path)?
                } else {
                    tracing::info!(
                        "No config file found at {}, using defaults",
                        default_path.display()
                    );
                    Self::default()
                }
            }
        };

        settings.apply_env_overrides();
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a key lookup (environment variables in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("SLACK_AUTH_TOKEN") {
            self.slack.bot_token = val;
        }
        if let Some(val) = lookup("SLACK_SIGNING_SECRET") {
            self.slack.signing_secret = Some(val).filter(|s| !s.is_empty());
        }
        if let Some(val) = lookup("SLACK_CHANNEL_ID") {
            self.slack.channel_id = val;
        }
        if let Some(val) = lookup("PAGERDUTY_TOKEN") {
            self.pagerduty.token = val;
        }
        if let Some(val) = lookup("PAGERDUTY_SCHEDULE_ID") {
            self.pagerduty.schedule_id = val;
        }
        if let Some(val) = lookup("PAGERDUTY_ESCALATION_POLICY") {
            self.pagerduty.escalation_policy_id = val;
        }
        if let Some(val) = lookup("JIRA_PAT_TOKEN") {
            self.jira.token = val;
        }
        if let Some(val) = lookup("JIRA_BASE_URL") {
            self.jira.base_url = val;
        }
        if let Some(val) = lookup("JIRA_JQL_QUERY") {
            self.jira.jql_query = val;
        }
        if let Some(val) = lookup("SWARMBOT_LISTEN_ADDR") {
            self.server.listen_addr = val;
        }
        if let Some(val) = lookup("SWARMBOT_PD_PRESSURE") {
            match val.parse() {
                Ok(pressure) => self.pagerduty.pressure = pressure,
                Err(_) => tracing::warn!("Ignoring invalid SWARMBOT_PD_PRESSURE: {}", val),
            }
        }
        if let Some(val) = lookup("SWARMBOT_JIRA_PRESSURE") {
            match val.parse() {
                Ok(pressure) => self.jira.pressure = pressure,
                Err(_) => tracing::warn!("Ignoring invalid SWARMBOT_JIRA_PRESSURE: {}", val),
            }
        }
    }

    pub fn config_path() -> PathBuf {
        if let Ok(custom_path) = std::env::var("SWARMBOT_CONFIG_PATH") {
            PathBuf::from(custom_path)
        } else {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("swarmbot")
                .join("config.toml")
        }
    }

    /// Per-backend pressure thresholds
    pub fn thresholds(&self) -> HashMap<IncidentSource, usize> {
        HashMap::from([
            (IncidentSource::PagingSystem, self.pagerduty.pressure),
            (IncidentSource::IssueTracker, self.jira.pressure),
        ])
    }

    /// Link prefix used when listing incidents from `source`
    pub fn link_base(&self, source: IncidentSource) -> String {
        match source {
            IncidentSource::PagingSystem => self.pagerduty.incident_url_base.clone(),
            IncidentSource::IssueTracker => self.jira.browse_url_base(),
        }
    }
}

pub(crate) fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_constants() {
        let settings = Settings::default();
        assert_eq!(settings.pagerduty.pressure, 3);
        assert_eq!(settings.jira.pressure, 3);
        assert_eq!(settings.monitor.poll_interval(), Duration::from_secs(60));
        assert_eq!(settings.monitor.cooldown(), Duration::from_secs(3600));
        assert_eq!(settings.jira.browse_url_base(), "http://localhost:8080/browse/");
        assert_eq!(settings.jira.issue_marker, "OHSS");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [pagerduty]
            pressure = 5

            [monitor]
            poll_interval_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(settings.pagerduty.pressure, 5);
        assert_eq!(settings.pagerduty.schedule_id, "P5LOJUX");
        assert_eq!(settings.monitor.poll_interval_secs, 30);
        assert_eq!(settings.monitor.cooldown_secs, 3600);
        assert!(settings.monitor.enabled);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut settings = Settings::default();
        let env: HashMap<&str, &str> = HashMap::from([
            ("SLACK_AUTH_TOKEN", "xoxb-test"),
            ("SLACK_CHANNEL_ID", "C0123"),
            ("SWARMBOT_PD_PRESSURE", "7"),
            ("SWARMBOT_JIRA_PRESSURE", "not-a-number"),
            ("SLACK_SIGNING_SECRET", ""),
        ]);

        settings.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.slack.bot_token, "xoxb-test");
        assert_eq!(settings.slack.channel_id, "C0123");
        assert_eq!(settings.pagerduty.pressure, 7);
        assert_eq!(settings.jira.pressure, 3);
        assert!(settings.slack.signing_secret.is_none());
    }

    #[test]
    fn test_secrets_not_serialized() {
        let mut settings = Settings::default();
        settings.slack.bot_token = "xoxb-secret".to_string();
        settings.jira.token = "jira-secret".to_string();

        let rendered = toml::to_string_pretty(&settings).unwrap();
        assert!(!rendered.contains("xoxb-secret"));
        assert!(!rendered.contains("jira-secret"));
        assert!(rendered.contains("[pagerduty]"));
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[slack]\nchannel_id = \"C999\"\n[jira]\nbase_url = \"https://issues.example.com\"").unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.slack.channel_id, "C999");
        assert_eq!(
            settings.link_base(IncidentSource::IssueTracker),
            "https://issues.example.com/browse/"
        );
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let result = Settings::load(Some(Path::new("/nonexistent/swarmbot.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_thresholds_cover_both_backends() {
        let thresholds = Settings::default().thresholds();
        assert_eq!(thresholds.len(), 2);
        assert_eq!(thresholds[&IncidentSource::PagingSystem], 3);
    }
}
