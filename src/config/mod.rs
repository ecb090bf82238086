use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod settings;
pub mod validation;

pub use settings::Settings;
pub use validation::{validate_configuration, ConfigurationValidator};

/// Initialize logging system with structured output and environment-based level filtering
pub fn init_logging() -> anyhow::Result<()> {
    init_logging_with_level(None)
}

/// Initialize logging, preferring an explicit level over `RUST_LOG`
pub fn init_logging_with_level(level: Option<&str>) -> anyhow::Result<()> {
    let env_filter = match level {
        Some(level) => EnvFilter::try_new(format!("swarmbot={},tower_http=info,reqwest=warn,hyper=warn", level))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("swarmbot=info,tower_http=info,reqwest=warn,hyper=warn")
        }),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_names(false)
                .with_file(true)
                .with_line_number(true)
                .with_level(true)
                .compact(),
        )
        .try_init()?;

    tracing::info!("Structured logging initialized");
    Ok(())
}

/// Initialize logging for testing with reduced verbosity
pub fn init_test_logging() -> anyhow::Result<()> {
    let env_filter = EnvFilter::new("swarmbot=debug");

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_test_writer().compact())
        .try_init()
        .or_else(|_| Ok(())) // Ignore if already initialized
}
