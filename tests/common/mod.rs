#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::{TimeZone, Utc};

use ipd_console::app::{build_router, AppState};
use ipd_console::auth::gate::digest_hex;
use ipd_console::config::ConsoleSettings;
use ipd_console::db::memory::MemoryStore;
use ipd_console::db::models::Facility;

pub const PASSWORD: &str = "open sesame";
pub const PASSCODE: &str = "ward key";
pub const UNLOCK_PHRASE: &str = "open the ward";
pub const DEFAULT_SECRET: &str = "ipd-default";

pub const OPERATOR_A: &str = "Raghav Sachdev";
pub const OPERATOR_B: &str = "Dhruvi Mittal";

/// In-memory console wired through the real router.
pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub router: Router,
}

impl TestEnv {
    pub async fn start() -> Self {
        Self::with_settings(test_settings()).await
    }

    pub async fn with_settings(settings: ConsoleSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), store.clone(), store.clone(), settings);
        let router = build_router(state.clone());
        Self {
            store,
            state,
            router,
        }
    }

    /// Build an `axum_test::TestServer` from this environment's router.
    /// Each server keeps its own cookie jar, so two servers act as two
    /// browsers.
    pub fn server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .save_cookies()
            .expect_success_by_default()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }

    /// Build a `TestServer` that does NOT expect success by default (for error tests).
    pub fn server_permissive(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .save_cookies()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }

    /// Helper: sign in as `operator`.
    pub async fn login(&self, server: &axum_test::TestServer, operator: &str) {
        server
            .post("/api/auth/login")
            .json(&serde_json::json!({
                "operator": operator,
                "password": PASSWORD
            }))
            .await
            .assert_status_ok();
    }

    /// Helper: store a completed facility directly.
    pub fn seed_facility(&self, id: &str, name: &str, updated_day: Option<u32>) -> Facility {
        let mut facility = Facility::placeholder(id, Utc::now());
        facility.name = name.to_string();
        facility.full_address = format!("{} Road, Pune", name);
        facility.phone_number = "+91 20 1234 5678".to_string();
        facility.updated_at =
            updated_day.map(|d| Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap());
        self.store
            .seed_facility(facility.clone())
            .expect("Failed to seed facility");
        facility
    }

    /// Helper: open the protected chat for the signed-in operator.
    pub async fn unlock_chat(&self, server: &axum_test::TestServer) {
        server
            .post("/api/broadcasts/preview")
            .json(&serde_json::json!({ "content": UNLOCK_PHRASE }))
            .await;
        server
            .post("/api/chat/unlock")
            .json(&serde_json::json!({ "passcode": PASSCODE }))
            .await;
    }
}

pub fn test_settings() -> ConsoleSettings {
    ConsoleSettings {
        operators: vec![OPERATOR_A.to_string(), OPERATOR_B.to_string()],
        shared_password_sha256: digest_hex(PASSWORD),
        default_master_password: DEFAULT_SECRET.to_string(),
        unlock_phrase: UNLOCK_PHRASE.to_string(),
        chat_passcode_sha256: digest_hex(PASSCODE),
        ..ConsoleSettings::default()
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(check: F) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..40 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
