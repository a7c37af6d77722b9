//! Axum route handlers for preview sessions.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::library::Section;
use crate::preview::channel::ChannelKind;
use crate::preview::session::{InputsPatch, PreviewInputs, PreviewSession, SessionSnapshot};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub included: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
///
/// Opens a live preview session, loads the library and schedules the first
/// rules-engine call. Library failures are reported on the snapshot.
pub async fn handle_create_session(
    State(state): State<AppState>,
    patch: Option<Json<InputsPatch>>,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    let session = PreviewSession::new(
        state.orchestrator.clone(),
        state.library.clone(),
        state.engine.clone(),
        PreviewInputs::default(),
    );
    if let Some(Json(patch)) = patch {
        session.update_inputs(patch)?;
    }
    session.start().await;
    state.sessions.insert(session.clone());

    Ok((StatusCode::CREATED, Json(session.snapshot())))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.sessions.get(id)?.snapshot()))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/sessions/:id/inputs
///
/// Job tags, template, ATS flag, preview mode and theme. Changing tags,
/// template or theme returns a variant preview to live.
pub async fn handle_update_inputs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<InputsPatch>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = state.sessions.get(id)?;
    session.update_inputs(patch)?;
    Ok(Json(session.snapshot()))
}

/// PUT /api/v1/sessions/:id/overrides/:section/:entity_id
pub async fn handle_toggle_override(
    State(state): State<AppState>,
    Path((id, section, entity_id)): Path<(Uuid, String, String)>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let section: Section = section.parse().map_err(AppError::Validation)?;
    let session = state.sessions.get(id)?;
    session.toggle_override(section, entity_id, request.included)?;
    Ok(Json(session.snapshot()))
}

/// POST /api/v1/sessions/:id/overrides/reset
pub async fn handle_reset_overrides(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = state.sessions.get(id)?;
    session.reset_overrides()?;
    Ok(Json(session.snapshot()))
}

/// POST /api/v1/sessions/:id/library/reload
pub async fn handle_reload_library(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = state.sessions.get(id)?;
    session.reload_library().await;
    Ok(Json(session.snapshot()))
}

/// POST /api/v1/sessions/:id/retry/:channel
///
/// Re-issues the channel's last recomputation without waiting for the
/// debounce window.
pub async fn handle_retry(
    State(state): State<AppState>,
    Path((id, channel)): Path<(Uuid, String)>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let kind: ChannelKind = channel.parse().map_err(AppError::Validation)?;
    let session = state.sessions.get(id)?;
    session.retry(kind).await;
    Ok(Json(session.snapshot()))
}

/// GET /api/v1/sessions/:id/document
///
/// Latest rendered document of the session's document channel.
pub async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let document = state
        .sessions
        .get(id)?
        .document()
        .ok_or_else(|| AppError::NotFound("No document has been rendered yet".to_string()))?;
    Ok(pdf_response(document, "preview.pdf"))
}

pub(crate) fn pdf_response(document: bytes::Bytes, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{filename}\""),
            ),
        ],
        document,
    )
        .into_response()
}
