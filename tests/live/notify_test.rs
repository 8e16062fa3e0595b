use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use reqwest::Client;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use livescore_shared::services::notify::{Alert, MailServiceNotifier, Notifier, NotifyError};

// =============================================================================
// INTEGRATION TESTS - MAIL SERVICE NOTIFIER
// =============================================================================

type Inbox = Arc<Mutex<Vec<Value>>>;

async fn accept(State(inbox): State<Inbox>, Json(body): Json<Value>) -> StatusCode {
    inbox.lock().unwrap().push(body);
    StatusCode::ACCEPTED
}

async fn reject() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn spawn_mail_service() -> (String, Inbox) {
    let inbox = Inbox::default();
    let app = Router::new()
        .route("/send", post(accept))
        .route("/broken", post(reject))
        .with_state(inbox.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), inbox)
}

#[tokio::test]
async fn test_alert_is_posted_as_json() {
    let (base, inbox) = spawn_mail_service().await;
    let notifier = MailServiceNotifier::new(Client::new(), format!("{}/send", base));
    let alert = Alert::upstream_down("feed@example.com", "ops@example.com", 10, "timed out");

    notifier.notify(&alert).await.unwrap();

    let inbox = inbox.lock().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["from"], "feed@example.com");
    assert_eq!(inbox[0]["to"], "ops@example.com");
    assert!(inbox[0]["body"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_rejected_alert_is_an_error() {
    let (base, _) = spawn_mail_service().await;
    let notifier = MailServiceNotifier::new(Client::new(), format!("{}/broken", base));
    let alert = Alert::upstream_down("a@x", "b@x", 10, "boom");

    let err = notifier.notify(&alert).await.unwrap_err();
    assert!(matches!(err, NotifyError::Rejected(StatusCode::INTERNAL_SERVER_ERROR)));
}
