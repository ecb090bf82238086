//! Inbound slash-command endpoint.
//!
//! Slack posts commands as `application/x-www-form-urlencoded`. Each accepted
//! command is queued for the dispatcher together with a one-shot
//! acknowledgment channel. The endpoint answers once the dispatcher acks or
//! the ack timeout passes, whichever comes first.

use axum::{
    body::Body,
    extract::{Form, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::models::SlashCommand;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Requests older than this are rejected as replays
pub const MAX_REQUEST_AGE_SECS: i64 = 60 * 5;

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Dispatcher's answer for one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub id: Uuid,
    pub handled: bool,
}

/// A queued command waiting for the dispatcher
#[derive(Debug)]
pub struct InboundCommand {
    pub id: Uuid,
    pub command: SlashCommand,
    ack: oneshot::Sender<Ack>,
}

impl InboundCommand {
    pub fn new(command: SlashCommand) -> (Self, oneshot::Receiver<Ack>) {
        let (ack, rx) = oneshot::channel();
        let inbound = Self {
            id: Uuid::new_v4(),
            command,
            ack,
        };
        (inbound, rx)
    }

    /// Consume the command and tell the endpoint it was handled.
    /// The endpoint may already have answered, which is fine.
    pub fn acknowledge(self, handled: bool) {
        let ack = Ack {
            id: self.id,
            handled,
        };
        if self.ack.send(ack).is_err() {
            debug!(id = %self.id, "Endpoint stopped waiting before the ack");
        }
    }
}

/// Shared endpoint state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub commands: mpsc::Sender<InboundCommand>,
}

impl AppState {
    pub fn new(settings: Arc<Settings>, commands: mpsc::Sender<InboundCommand>) -> Self {
        Self { settings, commands }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/slack/commands",
            post(slash_command_handler).route_layer(middleware::from_fn_with_state(
                state.clone(),
                verify_signature,
            )),
        )
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Queue the command and wait briefly for the dispatcher
async fn slash_command_handler(
    State(state): State<AppState>,
    Form(command): Form<SlashCommand>,
) -> StatusCode {
    info!(
        command = %command.command,
        channel = %command.channel_id,
        user = %command.user_id,
        "Received slash command"
    );

    let (inbound, ack) = InboundCommand::new(command);
    let id = inbound.id;

    match state.commands.try_send(inbound) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!(%id, "Command queue is full, rejecting");
            return StatusCode::SERVICE_UNAVAILABLE;
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            error!(%id, "Dispatcher is gone, rejecting command");
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    }

    match tokio::time::timeout(state.settings.server.ack_timeout(), ack).await {
        Ok(Ok(ack)) => debug!(%id, handled = ack.handled, "Command acknowledged"),
        Ok(Err(_)) => warn!(%id, "Command dropped without acknowledgment"),
        Err(_) => debug!(%id, "Still handling command, answering now"),
    }

    StatusCode::OK
}

/// Reject unsigned or stale requests when a signing secret is configured
async fn verify_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(secret) = state.settings.slack.signing_secret.as_deref() else {
        return Ok(next.run(request).await);
    };

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;

    let (Some(timestamp), Some(signature)) = (
        header_str(&parts.headers, TIMESTAMP_HEADER),
        header_str(&parts.headers, SIGNATURE_HEADER),
    ) else {
        warn!("Missing Slack signature headers");
        return Err(StatusCode::UNAUTHORIZED);
    };

    if !verify_slack_signature(secret, timestamp, &bytes, signature, chrono::Utc::now().timestamp()) {
        warn!("Invalid or stale Slack signature");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Check a Slack request signature: `v0=` + hex HMAC-SHA256 of `v0:{timestamp}:{body}`
#[must_use]
pub fn verify_slack_signature(
    secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now: i64,
) -> bool {
    let Ok(sent_at) = timestamp.parse::<i64>() else {
        return false;
    };
    let Some(age) = now.checked_sub(sent_at).map(i64::unsigned_abs) else {
        return false;
    };
    if age > MAX_REQUEST_AGE_SECS.unsigned_abs() {
        return false;
    }

    let Some(signature) = signature.strip_prefix("v0=") else {
        return false;
    };
    let Ok(signature_bytes) = hex::decode(signature) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("v0:{}:", timestamp).as_bytes());
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    computed.as_slice().ct_eq(&signature_bytes).into()
}

/// Produce the `X-Slack-Signature` value for a body
pub fn sign_slack_request(secret: &str, timestamp: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(format!("v0:{}:", timestamp).as_bytes());
    mac.update(body);
    Some(format!("v0={}", hex::encode(mac.finalize().into_bytes())))
}

/// Serve on a bound listener until `shutdown` resolves
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: F,
) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Slash command endpoint listening");
    }
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
