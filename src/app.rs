use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::auth::gate;
use crate::auth::session::SessionRegistry;
use crate::config::ConsoleSettings;
use crate::db::facility_repository::FacilityRepository;
use crate::db::mention_repository::MentionRepository;
use crate::db::notification_repository::NotificationRepository;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub facility_repo: Arc<dyn FacilityRepository>,
    pub notification_repo: Arc<dyn NotificationRepository>,
    pub mention_repo: Arc<dyn MentionRepository>,
    pub sessions: Arc<SessionRegistry>,
    pub settings: Arc<ConsoleSettings>,
}

impl AppState {
    pub fn new(
        facility_repo: Arc<dyn FacilityRepository>,
        notification_repo: Arc<dyn NotificationRepository>,
        mention_repo: Arc<dyn MentionRepository>,
        settings: ConsoleSettings,
    ) -> Self {
        Self {
            facility_repo,
            notification_repo,
            mention_repo,
            sessions: Arc::new(SessionRegistry::new()),
            settings: Arc::new(settings),
        }
    }
}

/// Build the console router with every API route.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Session gate
        .route("/auth/login", post(gate::login_handler))
        .route("/auth/me", get(gate::me_handler))
        .route("/auth/logout", post(gate::logout_handler))
        .route("/preferences/theme", post(gate::theme_handler))
        // Facilities
        .route("/facilities", get(api::facilities::list_handler))
        .route(
            "/facilities/reservations",
            post(api::facilities::reserve_handler),
        )
        .route(
            "/facilities/reservations/{id}",
            delete(api::facilities::abandon_handler),
        )
        .route(
            "/facilities/reservations/{id}/complete",
            post(api::facilities::complete_handler),
        )
        .route(
            "/facilities/{id}",
            put(api::facilities::update_handler).delete(api::facilities::delete_handler),
        )
        .route(
            "/facilities/{id}/credential",
            put(api::facilities::change_credential_handler),
        )
        .route(
            "/facilities/{id}/credential/reveal",
            post(api::facilities::reveal_handler),
        )
        .route("/facilities/{id}/call", get(api::facilities::call_handler))
        // Broadcasts
        .route(
            "/broadcasts",
            get(api::broadcasts::list_handler).post(api::broadcasts::publish_handler),
        )
        .route(
            "/broadcasts/preview",
            post(api::broadcasts::preview_handler),
        )
        .route(
            "/broadcasts/user-name",
            post(api::broadcasts::insert_user_name_handler),
        )
        // Mentions and protected chat
        .route("/mentions", get(api::mentions::mentions_handler))
        .route("/chat/unlock", post(api::mentions::unlock_handler))
        .route(
            "/chat",
            get(api::mentions::history_handler).post(api::mentions::post_handler),
        );

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
