use anyhow::Result;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::net::TcpListener;

use swarmbot::config::{init_test_logging, Settings};
use swarmbot::server::transport::{sign_slack_request, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use swarmbot::server::{spawn_service, Supervisor};

mod common;
use common::FakeBackends;

const SECRET: &str = "test-signing-secret";

struct Service {
    base_url: String,
    supervisor: Supervisor,
    http: reqwest::Client,
}

async fn start(fakes: &FakeBackends, signing_secret: Option<&str>) -> Result<Service> {
    let _ = init_test_logging();

    let mut settings = Settings::default();
    settings.slack.signing_secret = signing_secret.map(str::to_string);
    settings.monitor.enabled = false;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);

    let mut supervisor = Supervisor::new();
    spawn_service(&mut supervisor, Arc::new(settings), fakes.backends(), listener);

    Ok(Service {
        base_url,
        supervisor,
        http: reqwest::Client::new(),
    })
}

fn form_body(command: &str, text: &str) -> String {
    format!(
        "command={}&channel_id=C1&user_id=U123&user_name=steve&text={}",
        command.replace('/', "%2F"),
        text
    )
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let fakes = FakeBackends::new();
    let service = start(&fakes, None).await?;

    let body: serde_json::Value = service
        .http
        .get(format!("{}/health", service.base_url))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body, serde_json::json!({ "status": "healthy" }));

    service.supervisor.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_slash_command_is_handled_before_answer() -> Result<()> {
    let fakes = FakeBackends::new();
    fakes.chat.add_email("U123", "steve@example.com");
    fakes.tracker.add_user("steve", "steve@example.com");
    let service = start(&fakes, None).await?;

    let response = service
        .http
        .post(format!("{}/slack/commands", service.base_url))
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(form_body("/assign", "OHSS-102"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // The dispatcher acked after handling, so the work is visible now
    assert_eq!(
        fakes.tracker.assigned(),
        vec![("OHSS-102".to_string(), "steve".to_string())]
    );
    assert_eq!(
        fakes.chat.transcript(),
        vec!["Incident OHSS-102 Assigned, thank you <@steve>!".to_string()]
    );

    service.supervisor.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_signed_requests() -> Result<()> {
    let fakes = FakeBackends::new();
    let service = start(&fakes, Some(SECRET)).await?;
    let url = format!("{}/slack/commands", service.base_url);
    let body = form_body("/list-incs", "");
    let timestamp = chrono::Utc::now().timestamp().to_string();

    let unsigned = service
        .http
        .post(&url)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.clone())
        .send()
        .await?;
    assert_eq!(unsigned.status(), StatusCode::UNAUTHORIZED);

    let stale_ts = (chrono::Utc::now().timestamp() - 600).to_string();
    let stale_signature = sign_slack_request(SECRET, &stale_ts, body.as_bytes()).unwrap_or_default();
    let stale = service
        .http
        .post(&url)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(TIMESTAMP_HEADER, stale_ts)
        .header(SIGNATURE_HEADER, stale_signature)
        .body(body.clone())
        .send()
        .await?;
    assert_eq!(stale.status(), StatusCode::UNAUTHORIZED);
    assert!(fakes.chat.posted().is_empty());

    let signature = sign_slack_request(SECRET, &timestamp, body.as_bytes()).unwrap_or_default();
    let signed = service
        .http
        .post(&url)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(TIMESTAMP_HEADER, timestamp)
        .header(SIGNATURE_HEADER, signature)
        .body(body)
        .send()
        .await?;
    assert_eq!(signed.status(), StatusCode::OK);
    assert_eq!(fakes.chat.transcript(), vec!["No incidents to address".to_string()]);

    service.supervisor.shutdown().await;
    Ok(())
}
