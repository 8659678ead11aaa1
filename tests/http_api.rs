//! Integration tests for the HTTP message route.
//!
//! Each test spins up an Axum server on a random port and talks to it with
//! reqwest, exercising the real JSON contract.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use gloves_bot::bot::{ConversationController, ROOT_DIALOG_ID, order_dialogs};
use gloves_bot::channels::message_routes;
use gloves_bot::config::BotConfig;
use gloves_bot::store::{MemoryStore, StateStore};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Start an Axum server on a random port, return (base url, store).
async fn start_server() -> (String, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let controller = ConversationController::new(
        Arc::new(order_dialogs().unwrap()),
        ROOT_DIALOG_ID,
        store.clone(),
        BotConfig::default(),
    )
    .unwrap();
    let app = message_routes(Arc::new(controller));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}"), store)
}

fn message(conversation_id: &str, text: &str) -> Value {
    json!({
        "type": "message",
        "conversation": {"id": conversation_id},
        "from": {"id": "user-1", "name": "Иван"},
        "recipient": {"id": "bot"},
        "text": text
    })
}

/// POST an activity and return the reply texts.
async fn post(client: &reqwest::Client, base: &str, activity: Value) -> Vec<String> {
    let resp = client
        .post(format!("{base}/api/messages"))
        .json(&activity)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    body["activities"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["text"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn health_reports_ok() {
    timeout(TEST_TIMEOUT, async {
        let (base, _store) = start_server().await;
        let body: Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn join_then_order_over_http() {
    timeout(TEST_TIMEOUT, async {
        let (base, store) = start_server().await;
        let client = reqwest::Client::new();

        let welcome = post(
            &client,
            &base,
            json!({
                "type": "conversationUpdate",
                "conversation": {"id": "http-1"},
                "from": {"id": "user-1", "name": "Иван"},
                "recipient": {"id": "bot"},
                "membersAdded": [{"id": "bot", "name": "Gloves"}, {"id": "user-1", "name": "Иван"}]
            }),
        )
        .await;
        assert_eq!(welcome.len(), 1);
        assert!(welcome[0].starts_with("Привет Иван."));

        let color = post(&client, &base, message("http-1", "привет")).await;
        assert!(color[0].starts_with("Пожалуйста выберите цвет."));

        post(&client, &base, message("http-1", "Синий")).await;
        post(&client, &base, message("http-1", "Иван Петров")).await;
        post(&client, &base, message("http-1", "Одесса")).await;
        let done = post(&client, &base, message("http-1", "42")).await;

        assert_eq!(done.len(), 1);
        assert!(done[0].contains("(цвет Синий)"));
        assert!(done[0].contains("№42 города Одесса, получатель Иван Петров"));
        assert!(store.load("http-1").await.unwrap().dialog_stack.is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn reply_activities_carry_ids_and_actions() {
    timeout(TEST_TIMEOUT, async {
        let (base, _store) = start_server().await;
        let body: Value = reqwest::Client::new()
            .post(format!("{base}/api/messages"))
            .json(&message("http-2", "hi"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let activity = &body["activities"][0];
        assert_eq!(activity["type"], "message");
        assert_eq!(activity["conversation"]["id"], "http-2");
        assert!(!activity["id"].as_str().unwrap().is_empty());
        assert!(activity["timestamp"].is_string());
        let titles: Vec<&str> = activity["suggestedActions"]["actions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, ["Желтый", "Зеленый", "Синий"]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn missing_conversation_is_rejected() {
    timeout(TEST_TIMEOUT, async {
        let (base, store) = start_server().await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/api/messages"))
            .json(&json!({"type": "message", "text": "hi"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        assert!(store.is_empty().await);
    })
    .await
    .expect("test timed out");
}
