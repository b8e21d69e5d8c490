mod common;

use axum::http::StatusCode;
use ipd_console::db::mention_repository::MentionRepository;

async fn displayed(server: &axum_test::TestServer) -> Vec<serde_json::Value> {
    let body: serde_json::Value = server.get("/api/mentions").await.json();
    body.as_array().cloned().unwrap_or_default()
}

#[tokio::test]
async fn mention_surfaces_once_and_is_acknowledged() {
    let env = common::TestEnv::start().await;
    let author = env.server();
    let viewer = env.server();
    env.login(&author, common::OPERATOR_A).await;
    env.login(&viewer, common::OPERATOR_B).await;
    env.unlock_chat(&author).await;

    let posted = author
        .post("/api/chat")
        .json(&serde_json::json!({ "text": "Please call Ruby Hall" }))
        .await;
    posted.assert_status(StatusCode::CREATED);
    let posted: serde_json::Value = posted.json();
    let id = posted["_id"].as_str().unwrap().to_string();

    assert!(common::eventually(|| async { displayed(&viewer).await.len() == 1 }).await);

    let store = env.store.clone();
    let acknowledged = common::eventually(|| {
        let store = store.clone();
        async move {
            let snapshot = store.snapshot().await.unwrap();
            snapshot[0].seen_by == vec![common::OPERATOR_B.to_string()]
        }
    })
    .await;
    assert!(acknowledged);

    // Further snapshots (a second message) do not surface the first again.
    author
        .post("/api/chat")
        .json(&serde_json::json!({ "text": "Thanks" }))
        .await;
    assert!(common::eventually(|| async { displayed(&viewer).await.len() == 2 }).await);
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let shown = displayed(&viewer).await;
    assert_eq!(shown.len(), 2);
    assert_eq!(shown[0]["_id"].as_str(), Some(id.as_str()));

    // The author never sees their own messages.
    assert!(displayed(&author).await.is_empty());
}

#[tokio::test]
async fn chat_is_locked_until_passcode() {
    let env = common::TestEnv::start().await;
    let server = env.server_permissive();
    env.login(&server, common::OPERATOR_A).await;

    server.get("/api/chat").await.assert_status_unauthorized();
    server
        .post("/api/chat")
        .json(&serde_json::json!({ "text": "hello" }))
        .await
        .assert_status_unauthorized();

    env.unlock_chat(&server).await;

    let empty = server
        .post("/api/chat")
        .json(&serde_json::json!({ "text": "   " }))
        .await;
    empty.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    server
        .post("/api/chat")
        .json(&serde_json::json!({ "text": "hello" }))
        .await
        .assert_status(StatusCode::CREATED);

    let history: serde_json::Value = server.get("/api/chat").await.json();
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["sender"].as_str(), Some(common::OPERATOR_A));
    assert_eq!(history[0]["seenBy"], serde_json::json!([]));
}

#[tokio::test]
async fn logout_stops_the_feed() {
    let env = common::TestEnv::start().await;
    let author = env.server();
    let viewer = env.server();
    env.login(&author, common::OPERATOR_A).await;
    env.login(&viewer, common::OPERATOR_B).await;
    env.unlock_chat(&author).await;

    viewer.post("/api/auth/logout").await;

    author
        .post("/api/chat")
        .json(&serde_json::json!({ "text": "anyone?" }))
        .await;
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let snapshot = env.store.snapshot().await.unwrap();
    assert!(snapshot[0].seen_by.is_empty());
}

#[tokio::test]
async fn abandoned_session_does_not_swallow_mentions() {
    let env = common::TestEnv::start().await;
    let author = env.server();
    env.login(&author, common::OPERATOR_A).await;
    env.unlock_chat(&author).await;

    // The viewer's browser closes without signing out.
    {
        let closed_browser = env.server();
        env.login(&closed_browser, common::OPERATOR_B).await;
    }
    assert_eq!(env.state.sessions.len(), 2);

    author
        .post("/api/chat")
        .json(&serde_json::json!({ "text": "Bed 4 is free" }))
        .await;
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    // Nothing was delivered, so nothing is marked seen.
    let snapshot = env.store.snapshot().await.unwrap();
    assert!(snapshot[0].seen_by.is_empty());

    let viewer = env.server();
    env.login(&viewer, common::OPERATOR_B).await;
    assert_eq!(env.state.sessions.len(), 2);

    assert!(common::eventually(|| async { displayed(&viewer).await.len() == 1 }).await);
    let store = env.store.clone();
    assert!(
        common::eventually(|| {
            let store = store.clone();
            async move {
                store.snapshot().await.unwrap()[0].seen_by
                    == vec![common::OPERATOR_B.to_string()]
            }
        })
        .await
    );
}

#[tokio::test]
async fn idle_sessions_expire() {
    let env = common::TestEnv::start().await;
    let server = env.server_permissive();
    env.login(&server, common::OPERATOR_A).await;

    tokio::time::sleep(std::time::Duration::from_millis(60)).await;
    assert_eq!(
        env.state
            .sessions
            .expire_idle(std::time::Duration::from_millis(30)),
        1
    );
    assert!(env.state.sessions.is_empty());

    server.get("/api/auth/me").await.assert_status_unauthorized();
}
