mod common;

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use ipd_console::broadcast::composer::NumberingStrategy;
use ipd_console::db::models::Notification;
use ipd_console::db::notification_repository::NotificationRepository;

async fn publish(server: &axum_test::TestServer, content: &str) -> serde_json::Value {
    let response = server
        .post("/api/broadcasts")
        .json(&serde_json::json!({ "content": content, "confirmed": true }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

#[tokio::test]
async fn broadcasts_are_numbered_sequentially() {
    let env = common::TestEnv::start().await;
    let server = env.server();
    env.login(&server, common::OPERATOR_A).await;

    let first = publish(&server, "  Camp on Sunday  ").await;
    assert_eq!(first["_id"].as_str(), Some("Message1"));
    assert_eq!(first["messageNumber"].as_i64(), Some(1));
    assert_eq!(first["content"].as_str(), Some("Camp on Sunday"));

    let second = publish(&server, "Second").await;
    assert_eq!(second["_id"].as_str(), Some("Message2"));
}

#[tokio::test]
async fn numbering_continues_from_existing_maximum() {
    for numbering in [NumberingStrategy::Counter, NumberingStrategy::ReadMax] {
        let settings = ipd_console::config::ConsoleSettings {
            numbering,
            ..common::test_settings()
        };
        let env = common::TestEnv::with_settings(settings).await;
        env.store
            .put(Notification {
                id: "Message41".to_string(),
                content: "legacy".to_string(),
                timestamp: Utc::now(),
                message_number: 41,
            })
            .await
            .unwrap();

        let server = env.server();
        env.login(&server, common::OPERATOR_A).await;
        let next = publish(&server, "hello").await;
        assert_eq!(next["messageNumber"].as_i64(), Some(42));
    }
}

#[tokio::test]
async fn publish_requires_confirmation_and_content() {
    let env = common::TestEnv::start().await;
    let server = env.server_permissive();
    env.login(&server, common::OPERATOR_A).await;

    server
        .post("/api/broadcasts")
        .json(&serde_json::json!({ "content": "hello", "confirmed": false }))
        .await
        .assert_status_bad_request();

    let blank = server
        .post("/api/broadcasts")
        .json(&serde_json::json!({ "content": "   ", "confirmed": true }))
        .await;
    blank.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    assert!(env.store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn preview_returns_trimmed_content() {
    let env = common::TestEnv::start().await;
    let server = env.server();
    env.login(&server, common::OPERATOR_A).await;

    let body: serde_json::Value = server
        .post("/api/broadcasts/preview")
        .json(&serde_json::json!({ "content": "  Beds free at KEM  " }))
        .await
        .json();
    assert_eq!(body["kind"].as_str(), Some("preview"));
    assert_eq!(body["content"].as_str(), Some("Beds free at KEM"));
}

#[tokio::test]
async fn unlock_phrase_opens_passcode_prompt_without_publishing() {
    let env = common::TestEnv::start().await;
    let server = env.server_permissive();
    env.login(&server, common::OPERATOR_A).await;

    // Without the phrase first, the passcode is not accepted.
    server
        .post("/api/chat/unlock")
        .json(&serde_json::json!({ "passcode": common::PASSCODE }))
        .await
        .assert_status_bad_request();

    let body: serde_json::Value = server
        .post("/api/broadcasts/preview")
        .json(&serde_json::json!({ "content": "  OPEN THE WARD " }))
        .await
        .json();
    assert_eq!(body["kind"].as_str(), Some("passcodePrompt"));

    server
        .post("/api/broadcasts")
        .json(&serde_json::json!({ "content": common::UNLOCK_PHRASE, "confirmed": true }))
        .await
        .assert_status_bad_request();
    assert!(env.store.list_all().await.unwrap().is_empty());

    server
        .post("/api/chat/unlock")
        .json(&serde_json::json!({ "passcode": "wrong" }))
        .await
        .assert_status_unauthorized();

    let unlocked: serde_json::Value = server
        .post("/api/chat/unlock")
        .json(&serde_json::json!({ "passcode": common::PASSCODE }))
        .await
        .json();
    assert_eq!(unlocked["chatUnlocked"].as_bool(), Some(true));

    let me: serde_json::Value = server.get("/api/auth/me").await.json();
    assert_eq!(me["chatUnlocked"].as_bool(), Some(true));
}

#[tokio::test]
async fn list_filters_by_text_and_day() {
    let env = common::TestEnv::start().await;
    for (n, content, day, hour) in [
        (1, "Blood camp", 1, 9),
        (2, "ICU beds free", 1, 18),
        (3, "App update", 2, 8),
    ] {
        env.store
            .put(Notification {
                id: format!("Message{n}"),
                content: content.to_string(),
                timestamp: Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap(),
                message_number: n,
            })
            .await
            .unwrap();
    }

    let server = env.server_permissive();
    env.login(&server, common::OPERATOR_A).await;

    let all: serde_json::Value = server.get("/api/broadcasts").await.json();
    let ids: Vec<&str> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["Message3", "Message2", "Message1"]);

    let day: serde_json::Value = server
        .get("/api/broadcasts")
        .add_query_param("date", "2024-05-01")
        .add_query_param("q", "icu")
        .await
        .json();
    assert_eq!(day.as_array().unwrap().len(), 1);
    assert_eq!(day[0]["_id"].as_str(), Some("Message2"));

    server
        .get("/api/broadcasts")
        .add_query_param("date", "May 1st")
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn user_name_token_is_inserted_at_cursor() {
    let env = common::TestEnv::start().await;
    let server = env.server();
    env.login(&server, common::OPERATOR_A).await;

    let body: serde_json::Value = server
        .post("/api/broadcasts/user-name")
        .json(&serde_json::json!({ "content": "Hello , stay safe", "start": 6, "end": 6 }))
        .await
        .json();
    assert_eq!(body["content"].as_str(), Some("Hello {UserName}, stay safe"));
    assert_eq!(body["cursor"].as_u64(), Some(16));
}
