//! Configuration validation for the swarmbot service

use anyhow::Result;
use std::net::SocketAddr;
use tracing::{error, info, warn};
use validator::Validate;

use crate::config::settings::{MonitorSettings, Settings};

/// Comprehensive configuration validator
pub struct ConfigurationValidator {
    /// Whether to perform strict validation (fails on warnings)
    strict_mode: bool,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl ConfigurationValidator {
    pub fn new(strict_mode: bool) -> Self {
        Self {
            strict_mode,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Validate complete configuration
    pub fn validate_settings(&mut self, settings: &Settings) -> Result<()> {
        info!("Starting configuration validation");

        // Field-level rules declared on the settings structs
        if let Err(validation_errors) = settings.validate() {
            for line in validation_errors.to_string().lines() {
                let line = line.trim();
                if !line.is_empty() {
                    self.errors.push(line.to_string());
                }
            }
        }

        self.validate_credentials(settings);
        self.validate_monitor_config(&settings.monitor);
        self.validate_server_config(settings);

        self.print_validation_summary();

        if !self.errors.is_empty() {
            return Err(anyhow::anyhow!(
                "Configuration validation failed with {} errors",
                self.errors.len()
            ));
        }

        if self.strict_mode && !self.warnings.is_empty() {
            return Err(anyhow::anyhow!(
                "Configuration validation failed in strict mode with {} warnings",
                self.warnings.len()
            ));
        }

        info!("Configuration validation passed");
        Ok(())
    }

    fn validate_credentials(&mut self, settings: &Settings) {
        if settings.slack.bot_token.is_empty() {
            self.errors
                .push("Slack bot token is missing (set SLACK_AUTH_TOKEN)".to_string());
        } else if !settings.slack.bot_token.starts_with("xoxb-") {
            self.warnings
                .push("Slack bot token format may be invalid (should start with 'xoxb-')".to_string());
        }

        if settings.pagerduty.token.is_empty() {
            self.errors
                .push("PagerDuty token is missing (set PAGERDUTY_TOKEN)".to_string());
        }

        if settings.jira.token.is_empty() {
            self.errors
                .push("Jira personal access token is missing (set JIRA_PAT_TOKEN)".to_string());
        }

        if settings.slack.signing_secret.is_none() {
            self.warnings.push(
                "No Slack signing secret configured. Inbound commands will not be verified"
                    .to_string(),
            );
        }
    }

    fn validate_monitor_config(&mut self, monitor: &MonitorSettings) {
        if !monitor.enabled {
            self.warnings
                .push("Pressure monitor is disabled. Swarms will only start manually".to_string());
            return;
        }

        if monitor.cooldown_secs < monitor.poll_interval_secs {
            self.warnings.push(format!(
                "cooldown_secs ({}) is shorter than poll_interval_secs ({}). Automatic swarms may repeat every poll",
                monitor.cooldown_secs, monitor.poll_interval_secs
            ));
        }

        if monitor.poll_interval_secs > 0 && monitor.poll_interval_secs < 10 {
            self.warnings.push(
                "poll_interval_secs is very short (< 10s). Backends may rate limit the bot".to_string(),
            );
        }
    }

    fn validate_server_config(&mut self, settings: &Settings) {
        if settings.monitor.enabled && settings.slack.channel_id.is_empty() {
            self.errors.push(
                "Slack channel id is required for automatic swarms (set SLACK_CHANNEL_ID)"
                    .to_string(),
            );
        }

        if settings.server.listen_addr.parse::<SocketAddr>().is_err() {
            self.errors.push(format!(
                "listen_addr is not a valid socket address: {}",
                settings.server.listen_addr
            ));
        }

        if settings.server.ack_timeout_ms >= 3000 {
            self.warnings.push(
                "ack_timeout_ms is 3s or more. Slack gives up on slash commands after 3s".to_string(),
            );
        }
    }

    fn print_validation_summary(&self) {
        if !self.warnings.is_empty() {
            warn!("Configuration warnings ({}):", self.warnings.len());
            for (i, warning) in self.warnings.iter().enumerate() {
                warn!("  {}: {}", i + 1, warning);
            }
        }

        if !self.errors.is_empty() {
            error!("Configuration errors ({}):", self.errors.len());
            for (i, error) in self.errors.iter().enumerate() {
                error!("  {}: {}", i + 1, error);
            }
        }

        if self.warnings.is_empty() && self.errors.is_empty() {
            info!("Configuration validation completed successfully with no issues");
        } else {
            info!(
                "Configuration validation completed with {} warnings and {} errors",
                self.warnings.len(),
                self.errors.len()
            );
        }
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

/// Quick validation function for use in main application
pub fn validate_configuration(settings: &Settings, strict: bool) -> Result<()> {
    let mut validator = ConfigurationValidator::new(strict);
    validator.validate_settings(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_settings() -> Settings {
        let mut settings = Settings::default();
        settings.slack.bot_token = "xoxb-1234".to_string();
        settings.slack.signing_secret = Some("8f742231b10e8888abcd99yyyzzz85a5".to_string());
        settings.slack.channel_id = "C024BE91L".to_string();
        settings.pagerduty.token = "pd-token".to_string();
        settings.jira.token = "jira-pat".to_string();
        settings
    }

    #[test]
    fn test_valid_configuration() {
        let settings = create_test_settings();
        let mut validator = ConfigurationValidator::new(false);

        let result = validator.validate_settings(&settings);
        assert!(result.is_ok(), "Valid configuration should pass validation");
        assert!(validator.errors().is_empty());
    }

    #[test]
    fn test_missing_tokens() {
        let mut settings = create_test_settings();
        settings.pagerduty.token.clear();
        settings.jira.token.clear();

        let mut validator = ConfigurationValidator::new(false);
        assert!(validator.validate_settings(&settings).is_err());
        assert_eq!(validator.errors().len(), 2);
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut settings = create_test_settings();
        settings.monitor.poll_interval_secs = 0;

        let mut validator = ConfigurationValidator::new(false);
        assert!(validator.validate_settings(&settings).is_err());
        assert!(validator
            .errors()
            .iter()
            .any(|e| e.contains("poll_interval_secs")));
    }

    #[test]
    fn test_malformed_url_rejected() {
        let mut settings = create_test_settings();
        settings.jira.base_url = "not a url".to_string();

        let mut validator = ConfigurationValidator::new(false);
        assert!(validator.validate_settings(&settings).is_err());
    }

    #[test]
    fn test_channel_required_only_when_monitoring() {
        let mut settings = create_test_settings();
        settings.slack.channel_id.clear();

        let mut validator = ConfigurationValidator::new(false);
        assert!(validator.validate_settings(&settings).is_err());

        settings.monitor.enabled = false;
        let mut validator = ConfigurationValidator::new(false);
        assert!(validator.validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_strict_mode_warnings() {
        let mut settings = create_test_settings();
        settings.slack.signing_secret = None;

        let mut validator = ConfigurationValidator::new(true);
        let result = validator.validate_settings(&settings);

        assert!(result.is_err(), "Warnings in strict mode should fail validation");
        assert!(!validator.warnings().is_empty());
    }

    #[test]
    fn test_lenient_mode_warnings() {
        let mut settings = create_test_settings();
        settings.monitor.cooldown_secs = 30;

        let mut validator = ConfigurationValidator::new(false);
        let result = validator.validate_settings(&settings);

        assert!(result.is_ok(), "Warnings in lenient mode should pass validation");
        assert!(!validator.warnings().is_empty());
    }
}
