use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::session::{ConsoleSession, CurrentSession};
use crate::db::facility_repository::FacilityRepository;
use crate::db::models::{Facility, FacilityFields, FacilitySummary};
use crate::error::AppError;
use crate::records::confirm::{change_master_password, PendingDeletion, PendingReveal};
use crate::records::list::{fetch_all, EditDraft};
use crate::records::query::{tel_uri, SortKey};
use crate::records::wizard::{abandon_reservation, CreateWizard, WizardDraft, WizardStep};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub refresh: bool,
}

/// Body of the two-gate confirmation dialogs.
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub confirmation: String,
    #[serde(default)]
    pub acknowledged: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub deleted: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealResponse {
    pub id: String,
    pub master_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeCredentialRequest {
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveRequest {
    #[serde(default)]
    pub place_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveResponse {
    pub place_id: String,
    pub step: WizardStep,
}

/// Reload the session's local copy from the store.
async fn refresh_records(
    repo: &dyn FacilityRepository,
    session: &ConsoleSession,
) -> Result<(), AppError> {
    let items = fetch_all(repo).await?;
    session.records()?.replace(items);
    Ok(())
}

/// Resolve a record from the local copy, falling back to the store.
async fn load_facility(
    repo: &dyn FacilityRepository,
    session: &ConsoleSession,
    id: &str,
) -> Result<Facility, AppError> {
    let cached = session.records()?.get(id).cloned();
    match cached {
        Some(facility) => Ok(facility),
        None => repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Hospital '{}' not found", id))),
    }
}

fn require_acknowledged(acknowledged: bool) -> Result<(), AppError> {
    if acknowledged {
        Ok(())
    } else {
        Err(AppError::BadRequest("Final acknowledgement required".into()))
    }
}

/// `GET /api/facilities?q=&sort=name|date&refresh=bool`
///
/// The first call of a session (or `refresh=true`) fetches the collection;
/// later calls filter and sort the local copy.
pub async fn list_handler(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<FacilitySummary>>, AppError> {
    let needs_fetch = params.refresh || !session.records()?.is_loaded();
    if needs_fetch {
        refresh_records(state.facility_repo.as_ref(), &session).await?;
    }

    let view = session.records()?.view(&params.q, params.sort);
    Ok(Json(view.iter().map(FacilitySummary::from).collect()))
}

/// `PUT /api/facilities/{id}`
pub async fn update_handler(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
    Json(fields): Json<FacilityFields>,
) -> Result<Json<FacilitySummary>, AppError> {
    let repo = state.facility_repo.as_ref();
    let current = load_facility(repo, &session, &id).await?;

    let mut draft = EditDraft::open(&current);
    draft.fields = fields;
    let saved = draft.save(repo).await?;

    let summary = FacilitySummary::from(&saved);
    session.records()?.upsert(saved);
    Ok(Json(summary))
}

/// `DELETE /api/facilities/{id}`
pub async fn delete_handler(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<DeleteResponse>, AppError> {
    let repo = state.facility_repo.as_ref();
    let current = load_facility(repo, &session, &id).await?;

    let confirmed = PendingDeletion::new(&current)
        .confirm(&req.confirmation)
        .map_err(|(_, e)| e)?;
    require_acknowledged(req.acknowledged)?;

    let deleted = confirmed.execute(repo).await?;
    session.records()?.remove(&deleted);
    Ok(Json(DeleteResponse { deleted }))
}

/// `POST /api/facilities/{id}/credential/reveal`
pub async fn reveal_handler(
    State(state): State<AppState>,
    CurrentSession(_session): CurrentSession,
    Path(id): Path<String>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<RevealResponse>, AppError> {
    let confirmed = PendingReveal::new(id.clone())
        .confirm(&req.confirmation)
        .map_err(|(_, e)| e)?;
    require_acknowledged(req.acknowledged)?;

    let master_password = confirmed
        .execute(
            state.facility_repo.as_ref(),
            &state.settings.default_master_password,
        )
        .await?;
    Ok(Json(RevealResponse {
        id,
        master_password,
    }))
}

/// `PUT /api/facilities/{id}/credential`
pub async fn change_credential_handler(
    State(state): State<AppState>,
    CurrentSession(_session): CurrentSession,
    Path(id): Path<String>,
    Json(req): Json<ChangeCredentialRequest>,
) -> Result<StatusCode, AppError> {
    change_master_password(
        state.facility_repo.as_ref(),
        &id,
        &req.new_password,
        &req.confirm_password,
    )
    .await?;
    tracing::info!("Master password changed for {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/facilities/{id}/call`
///
/// Redirects to the facility's `tel:` URI.
pub async fn call_handler(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let facility = load_facility(state.facility_repo.as_ref(), &session, &id).await?;
    let uri = tel_uri(&facility.phone_number)
        .ok_or_else(|| AppError::BadRequest(format!("Hospital '{}' has no phone number", id)))?;
    Ok(Redirect::to(&uri))
}

/// `POST /api/facilities/reservations`
pub async fn reserve_handler(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(req): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<ReserveResponse>), AppError> {
    let wizard = CreateWizard::reserve(state.facility_repo.as_ref(), &req.place_id).await?;
    session.claim_reservation(wizard.place_id());
    Ok((
        StatusCode::CREATED,
        Json(ReserveResponse {
            place_id: wizard.place_id().to_string(),
            step: wizard.step(),
        }),
    ))
}

/// `POST /api/facilities/reservations/{id}/complete`
///
/// Runs the collected draft through every wizard step, writes the record
/// and reloads the session list.
pub async fn complete_handler(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
    Json(draft): Json<WizardDraft>,
) -> Result<(StatusCode, Json<FacilitySummary>), AppError> {
    let repo = state.facility_repo.as_ref();
    session.require_reservation(&id)?;

    let mut wizard = CreateWizard::resume(repo, &id).await?;
    *wizard.draft_mut() = draft;
    wizard.advance_to_end()?;
    let created = wizard.complete(repo).await?;
    session.release_reservation(&id);

    refresh_records(repo, &session).await?;
    let stored = load_facility(repo, &session, &created).await?;
    Ok((StatusCode::CREATED, Json(FacilitySummary::from(&stored))))
}

/// `DELETE /api/facilities/reservations/{id}`
///
/// Only the session that reserved the placeholder may abandon it.
pub async fn abandon_handler(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    session.require_reservation(&id)?;
    abandon_reservation(state.facility_repo.as_ref(), &id).await;
    session.release_reservation(&id);
    Ok(StatusCode::NO_CONTENT)
}
