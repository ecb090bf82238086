//! Swarmbot - on-call swarm bot for PagerDuty and Jira queues.

use anyhow::Result;
use swarmbot::cli::Cli;
use swarmbot::config::init_logging_with_level;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging_with_level(cli.log_level.as_deref())?;

    cli.run().await
}
