use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::gate::verify_chat_passcode;
use crate::auth::session::CurrentSession;
use crate::db::models::Mention;
use crate::error::AppError;
use crate::feed::chat::post_message;

#[derive(Debug, Deserialize)]
pub struct UnlockRequest {
    #[serde(default)]
    pub passcode: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockResponse {
    pub chat_unlocked: bool,
}

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    #[serde(default)]
    pub text: String,
}

/// `GET /api/mentions`
///
/// Mentions surfaced to this operator since sign-in, in surfacing order.
/// Messages are marked seen once they have been returned here.
pub async fn mentions_handler(CurrentSession(session): CurrentSession) -> Json<Vec<Mention>> {
    Json(session.feed().deliver())
}

/// `POST /api/chat/unlock`
pub async fn unlock_handler(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(req): Json<UnlockRequest>,
) -> Result<Json<UnlockResponse>, AppError> {
    if !session.chat_prompt_pending() {
        return Err(AppError::BadRequest("Chat passcode was not requested".into()));
    }
    verify_chat_passcode(&state.settings, &req.passcode)?;
    session.unlock_chat()?;
    Ok(Json(UnlockResponse {
        chat_unlocked: true,
    }))
}

/// `GET /api/chat`
pub async fn history_handler(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Vec<Mention>>, AppError> {
    session.require_chat()?;
    Ok(Json(state.mention_repo.snapshot().await?))
}

/// `POST /api/chat`
pub async fn post_handler(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(req): Json<PostRequest>,
) -> Result<(StatusCode, Json<Mention>), AppError> {
    session.require_chat()?;
    let mention = post_message(state.mention_repo.as_ref(), session.operator(), &req.text).await?;
    Ok((StatusCode::CREATED, Json(mention)))
}
