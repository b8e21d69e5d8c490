use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::session::CurrentSession;
use crate::broadcast::composer::{compose, publish, BroadcastPreview, ComposeOutcome};
use crate::broadcast::listing::filter_notifications;
use crate::broadcast::template::insert_user_name;
use crate::db::models::Notification;
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct BroadcastParams {
    #[serde(default)]
    pub q: String,
    /// Calendar day as `YYYY-MM-DD`.
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ComposeRequest {
    #[serde(default)]
    pub content: String,
}

/// What the composer dialog should show next.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PreviewResponse {
    /// Show the passcode prompt. Nothing was published.
    PasscodePrompt,
    /// Show the message for confirmation.
    Preview { content: String },
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub confirmed: bool,
}

/// Selection in the composer text, as char offsets.
#[derive(Debug, Deserialize)]
pub struct InsertTokenRequest {
    #[serde(default)]
    pub content: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Serialize)]
pub struct InsertTokenResponse {
    pub content: String,
    pub cursor: usize,
}

fn parse_day(raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                AppError::BadRequest(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
            }),
    }
}

/// `GET /api/broadcasts?q=&date=YYYY-MM-DD`
pub async fn list_handler(
    State(state): State<AppState>,
    CurrentSession(_session): CurrentSession,
    Query(params): Query<BroadcastParams>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let day = parse_day(params.date.as_deref())?;
    let all = state
        .notification_repo
        .list_all()
        .await
        .inspect_err(|e| tracing::error!("Error fetching notifications: {}", e))?;
    Ok(Json(filter_notifications(&all, &params.q, day)))
}

/// `POST /api/broadcasts/preview`
///
/// The unlock phrase opens the session's passcode prompt instead of
/// producing a preview.
pub async fn preview_handler(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(req): Json<ComposeRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    match compose(&req.content, &state.settings.unlock_phrase)? {
        ComposeOutcome::Unlock => {
            session.request_chat_prompt();
            Ok(Json(PreviewResponse::PasscodePrompt))
        }
        ComposeOutcome::Preview(preview) => Ok(Json(PreviewResponse::Preview {
            content: preview.content,
        })),
    }
}

/// `POST /api/broadcasts`
pub async fn publish_handler(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(req): Json<PublishRequest>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let preview: BroadcastPreview = match compose(&req.content, &state.settings.unlock_phrase)? {
        ComposeOutcome::Unlock => {
            return Err(AppError::BadRequest(
                "This message cannot be published".into(),
            ))
        }
        ComposeOutcome::Preview(preview) => preview,
    };
    if !req.confirmed {
        return Err(AppError::BadRequest("Broadcast must be confirmed".into()));
    }

    let notification = publish(
        state.notification_repo.as_ref(),
        state.settings.numbering,
        preview,
    )
    .await?;
    tracing::info!(
        "Broadcast {} published by {}",
        notification.id,
        session.operator()
    );
    Ok((StatusCode::CREATED, Json(notification)))
}

/// `POST /api/broadcasts/user-name`
///
/// Insert the recipient-name token over the current selection.
pub async fn insert_user_name_handler(
    CurrentSession(_session): CurrentSession,
    Json(req): Json<InsertTokenRequest>,
) -> Json<InsertTokenResponse> {
    let (content, cursor) = insert_user_name(&req.content, req.start, req.end);
    Json(InsertTokenResponse { content, cursor })
}
