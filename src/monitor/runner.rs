//! The pressure monitor control loop.
//!
//! Polls the backends on a fixed interval. When pressure trips it sends an
//! automatic swarm request to the dispatcher and goes quiet for the cooldown
//! window. Every wait races the cancellation token.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::pressure::{PressureProbe, PressureReport};
use crate::config::settings::MonitorSettings;
use crate::models::SwarmEvent;

/// Where the loop is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Polling,
    Cooldown { until: Instant },
}

/// What a single tick did
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// Still cooling down from the last automatic swarm, no backend calls made
    CoolingDown { remaining: Duration },
    /// Polled, no pressure
    Clear(PressureReport),
    /// Polled, pressure tripped and an automatic swarm was requested
    Triggered(PressureReport),
}

impl TickOutcome {
    /// How long the loop should wait before the next tick
    fn next_wait(&self, poll_interval: Duration, cooldown: Duration) -> Duration {
        match self {
            TickOutcome::CoolingDown { remaining } => *remaining,
            TickOutcome::Clear(_) => poll_interval,
            TickOutcome::Triggered(_) => cooldown,
        }
    }
}

pub struct PressureMonitor {
    probe: PressureProbe,
    channel: String,
    poll_interval: Duration,
    cooldown: Duration,
    triggers: mpsc::Sender<SwarmEvent>,
    cancel: CancellationToken,
    // Owned by this task only. Nothing else can reset it.
    cooldown_until: Option<Instant>,
}

impl PressureMonitor {
    pub fn new(
        probe: PressureProbe,
        settings: &MonitorSettings,
        channel: impl Into<String>,
        triggers: mpsc::Sender<SwarmEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            probe,
            channel: channel.into(),
            poll_interval: settings.poll_interval(),
            cooldown: settings.cooldown(),
            triggers,
            cancel,
            cooldown_until: None,
        }
    }

    pub fn state(&self) -> MonitorState {
        match self.cooldown_until {
            Some(until) if Instant::now() < until => MonitorState::Cooldown { until },
            _ => MonitorState::Polling,
        }
    }

    /// Run until cancelled
    #[instrument(skip(self), fields(channel = %self.channel))]
    pub async fn run(mut self) {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            cooldown_secs = self.cooldown.as_secs(),
            "Pressure monitor started"
        );

        let cancel = self.cancel.clone();
        loop {
            if cancel.is_cancelled() {
                break;
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.tick() => outcome,
            };

            let wait = outcome.next_wait(self.poll_interval, self.cooldown);
            debug!(wait_secs = wait.as_secs(), "Waiting for next pressure check");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!("Pressure monitor stopped");
    }

    /// One pass of the state machine
    pub async fn tick(&mut self) -> TickOutcome {
        if let MonitorState::Cooldown { until } = self.state() {
            return TickOutcome::CoolingDown {
                remaining: until - Instant::now(),
            };
        }
        if self.cooldown_until.take().is_some() {
            info!("Cooldown elapsed, resuming pressure checks");
        }

        debug!("Checking incident count for pressure");
        let report = self.probe.check().await;

        if !report.hit {
            return TickOutcome::Clear(report);
        }

        self.cooldown_until = Some(Instant::now() + self.cooldown);
        warn!(
            cooldown_secs = self.cooldown.as_secs(),
            "Pressure threshold exceeded, requesting automatic swarm"
        );

        let event = SwarmEvent::Automatic {
            channel: self.channel.clone(),
        };
        if let Err(e) = self.triggers.send(event).await {
            error!("Failed to request automatic swarm, dispatcher is gone: {}", e);
        }

        TickOutcome::Triggered(report)
    }
}
