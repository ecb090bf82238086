//! Swarmbot service: the monitor, the dispatcher and the command endpoint,
//! supervised under one cancellation token.

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::dispatcher::Dispatcher;
use super::transport::{self, AppState};
use crate::clients::Backends;
use crate::config::Settings;
use crate::handlers::CommandRouter;
use crate::monitor::{PressureMonitor, PressureProbe};

/// Queue depth for automatic swarm requests
const TRIGGER_QUEUE_CAPACITY: usize = 8;

/// Owns the long-lived tasks and the token that stops them
pub struct Supervisor {
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(task = name, "Spawning task");
        self.tasks.push((name, tokio::spawn(task)));
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|(name, _)| *name).collect()
    }

    /// Cancel everything and wait for each task to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.join().await;
    }

    /// Wait for the tasks without cancelling them
    pub async fn join(self) {
        for (name, handle) in self.tasks {
            match handle.await {
                Ok(()) => info!(task = name, "Task finished"),
                Err(e) if e.is_panic() => error!(task = name, "Task panicked: {}", e),
                Err(e) => warn!(task = name, "Task did not finish: {}", e),
            }
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire the monitor, dispatcher and endpoint onto a supervisor
pub fn spawn_service(
    supervisor: &mut Supervisor,
    settings: Arc<Settings>,
    backends: Backends,
    listener: TcpListener,
) {
    let cancel = supervisor.cancel_token();
    let (command_tx, command_rx) = mpsc::channel(settings.server.queue_capacity);
    let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_QUEUE_CAPACITY);

    let router = CommandRouter::new(backends.clone(), settings.clone());
    let dispatcher = Dispatcher::new(
        router,
        backends.chat.clone(),
        command_rx,
        trigger_rx,
        cancel.clone(),
    );
    supervisor.spawn("dispatcher", dispatcher.run());

    if !settings.monitor.enabled {
        info!("Pressure monitor disabled");
    } else if settings.slack.channel_id.is_empty() {
        warn!("No swarm channel configured, pressure monitor not started");
    } else {
        let probe = PressureProbe::new(backends, settings.clone());
        let monitor = PressureMonitor::new(
            probe,
            &settings.monitor,
            settings.slack.channel_id.clone(),
            trigger_tx,
            cancel.clone(),
        );
        supervisor.spawn("monitor", monitor.run());
    }

    let state = AppState::new(settings, command_tx);
    let endpoint_cancel = cancel.clone();
    supervisor.spawn("endpoint", async move {
        let shutdown = endpoint_cancel.clone().cancelled_owned();
        if let Err(e) = transport::serve(listener, state, shutdown).await {
            error!("Slash command endpoint failed: {}", e);
            endpoint_cancel.cancel();
        }
    });
}

/// Run the service until Ctrl-C or SIGTERM
pub async fn start_server(settings: Arc<Settings>) -> Result<()> {
    info!("Starting swarmbot");

    let backends = Backends::from_settings(&settings)?;
    let listener = TcpListener::bind(&settings.server.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.server.listen_addr))?;

    let mut supervisor = Supervisor::new();
    spawn_service(&mut supervisor, settings, backends, listener);

    let cancel = supervisor.cancel_token();
    tokio::select! {
        _ = shutdown_signal() => info!("Shutdown signal received"),
        _ = cancel.cancelled() => warn!("Service cancelled internally"),
    }

    supervisor.shutdown().await;
    info!("Swarmbot stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{MockChatClient, MockPagingClient, MockTrackerClient};

    fn idle_backends() -> Backends {
        Backends::new(
            Arc::new(MockPagingClient::new()),
            Arc::new(MockTrackerClient::new()),
            Arc::new(MockChatClient::new()),
        )
    }

    #[tokio::test]
    async fn test_monitor_skipped_without_channel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut supervisor = Supervisor::new();
        spawn_service(&mut supervisor, Arc::new(Settings::default()), idle_backends(), listener);

        assert_eq!(supervisor.task_names(), vec!["dispatcher", "endpoint"]);
        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_monitor_skipped_when_disabled() {
        let mut settings = Settings::default();
        settings.slack.channel_id = "C1".to_string();
        settings.monitor.enabled = false;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut supervisor = Supervisor::new();
        spawn_service(&mut supervisor, Arc::new(settings), idle_backends(), listener);

        assert!(!supervisor.task_names().contains(&"monitor"));
        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_joins_every_task() {
        let mut supervisor = Supervisor::new();
        let cancel = supervisor.cancel_token();
        supervisor.spawn("waiter", async move { cancel.cancelled().await });
        supervisor.shutdown().await;
    }
}
