use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use ipd_console::app::{build_router, AppState};
use ipd_console::auth::session::spawn_session_sweeper;
use ipd_console::config::AppConfig;
use ipd_console::db::facility_repository::{FacilityRepository, MongoFacilityRepository};
use ipd_console::db::memory::MemoryStore;
use ipd_console::db::mention_repository::{MentionRepository, MongoMentionRepository};
use ipd_console::db::notification_repository::{
    MongoNotificationRepository, NotificationRepository,
};
use ipd_console::demo_seeder::seed_demo_data;

#[derive(Parser)]
#[command(name = "ipd-console", about = "Hospital directory admin console")]
struct Cli {
    /// Path to a configuration file (TOML, YAML or JSON).
    #[arg(long, short)]
    config: Option<String>,

    /// Run against an in-memory store seeded with demo data.
    #[arg(long)]
    demo: bool,

    /// Override the listen address, e.g. `127.0.0.1:8080`.
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ipd_console=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config =
        AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }

    tracing::info!("Starting IPD console...");
    if config.console.uses_default_credentials() {
        tracing::warn!(
            "Default console credentials are in use. Set IPD__CONSOLE__SHARED_PASSWORD_SHA256 \
             and IPD__CONSOLE__CHAT_PASSCODE_SHA256."
        );
    }

    let (facility_repo, notification_repo, mention_repo) = if cli.demo {
        let store = Arc::new(MemoryStore::new());
        seed_demo_data(
            store.as_ref(),
            store.as_ref(),
            store.as_ref(),
            &config.console.operators,
        )
        .await;
        tracing::info!("Demo mode: using in-memory store");

        let facilities: Arc<dyn FacilityRepository> = store.clone();
        let notifications: Arc<dyn NotificationRepository> = store.clone();
        let mentions: Arc<dyn MentionRepository> = store;
        (facilities, notifications, mentions)
    } else {
        let mongo_client = mongodb::Client::with_uri_str(&config.mongodb_uri)
            .await
            .context("Failed to connect to MongoDB")?;
        let console_db = mongo_client.database(&config.database);
        let chat_db = mongo_client.database(&config.chat_database);
        tracing::info!("Connected to MongoDB at {}", config.mongodb_uri);

        let facilities: Arc<dyn FacilityRepository> =
            Arc::new(MongoFacilityRepository::new(&console_db));
        let notifications: Arc<dyn NotificationRepository> =
            Arc::new(MongoNotificationRepository::new(&console_db));
        let mentions: Arc<dyn MentionRepository> = Arc::new(MongoMentionRepository::new(
            &chat_db,
            config.feed_poll_interval(),
        ));
        (facilities, notifications, mentions)
    };

    let state = AppState::new(
        facility_repo,
        notification_repo,
        mention_repo,
        config.console.clone(),
    );
    let idle_timeout = config.session_idle_timeout();
    spawn_session_sweeper(state.sessions.clone(), idle_timeout, idle_timeout / 4);
    tracing::info!("Idle sessions close after {:?}", idle_timeout);
    let app = build_router(state);

    tracing::info!("Listening on http://{}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
