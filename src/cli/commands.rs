//! CLI command implementations.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use super::utils::{load_settings, target_config_path};
use crate::clients::Backends;
use crate::config::{validate_configuration, Settings};
use crate::handlers::ListHandler;
use crate::monitor::PressureProbe;
use crate::server::start_server;

/// Start the monitor and the slash command endpoint
pub async fn serve(config_path: Option<PathBuf>, listen: Option<String>) -> Result<()> {
    info!("Loading configuration...");
    let mut settings = load_settings(config_path)?;
    if let Some(listen) = listen {
        info!("Listening address overridden: {}", listen);
        settings.server.listen_addr = listen;
    }

    validate_configuration(&settings, false)?;

    start_server(Arc::new(settings)).await?;
    info!("Swarmbot server stopped");
    Ok(())
}

/// Run one pressure probe and print what it saw
pub async fn check(config_path: Option<PathBuf>) -> Result<()> {
    let settings = Arc::new(load_settings(config_path)?);
    let backends = Backends::from_settings(&settings)?;

    let report = PressureProbe::new(backends, settings).check().await;
    println!("{}", report);

    if report.errors().next().is_some() {
        anyhow::bail!("One or more backends could not be read");
    }
    Ok(())
}

/// Print the incident list exactly as it would be posted
pub async fn list(config_path: Option<PathBuf>) -> Result<()> {
    let settings = Arc::new(load_settings(config_path)?);
    let backends = Backends::from_settings(&settings)?;

    let outcome = ListHandler::new(backends, settings).render().await?;
    println!("{}", outcome.text);
    Ok(())
}

/// Initialize default configuration
pub async fn init(config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let config_path = target_config_path(config_path);

    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at {:?}. Use --force to overwrite.",
            config_path
        );
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let toml_content = toml::to_string_pretty(&Settings::default())?;
    std::fs::write(&config_path, toml_content)?;

    println!("✓ Configuration initialized at {:?}", config_path);
    println!("  Tokens are read from SLACK_AUTH_TOKEN, PAGERDUTY_TOKEN and JIRA_PAT_TOKEN.");
    Ok(())
}

/// Manage configuration (show, validate)
pub async fn config(
    config_path: Option<PathBuf>,
    show: bool,
    validate: bool,
    strict: bool,
) -> Result<()> {
    if !show && !validate {
        return Ok(());
    }

    let settings = load_settings(config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if show {
        let toml_content = toml::to_string_pretty(&settings)?;
        println!("{}", toml_content);
    }

    if validate {
        if let Err(e) = validate_configuration(&settings, strict) {
            error!("Configuration validation failed: {}", e);
            return Err(e);
        }
        println!("✓ Configuration is valid");
    }

    Ok(())
}

/// Show version information
pub async fn version() -> Result<()> {
    println!("Swarmbot {}", env!("CARGO_PKG_VERSION"));
    println!("Built with Rust {}", rustc_version::version()?);
    Ok(())
}
