use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::variant::CvVariant;
use crate::preview::handlers::pdf_response;
use crate::preview::session::{clean_tags, SessionSnapshot};
use crate::state::AppState;
use crate::variants::store::{NewVariant, VariantUpdate};

#[derive(Debug, Deserialize)]
pub struct SaveVariantRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVariantRequest {
    pub name: Option<String>,
    pub job_tags: Option<Vec<String>>,
    pub template: Option<String>,
}

fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Variant name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

async fn load_variant(state: &AppState, id: Uuid) -> Result<CvVariant, AppError> {
    state
        .variants
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Variant {id} not found")))
}

/// POST /api/v1/sessions/:id/variants
///
/// Saves the session's current job tags, template and override map under
/// a name.
pub async fn handle_save_variant(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SaveVariantRequest>,
) -> Result<(StatusCode, Json<CvVariant>), AppError> {
    let name = validate_name(&request.name)?;
    let session = state.sessions.get(session_id)?;
    let (job_tags, template, manual_overrides) = session.variant_draft();

    let variant = state
        .variants
        .create(NewVariant {
            name,
            job_tags,
            template,
            manual_overrides,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(variant)))
}

/// GET /api/v1/variants
pub async fn handle_list_variants(
    State(state): State<AppState>,
) -> Result<Json<Vec<CvVariant>>, AppError> {
    Ok(Json(state.variants.list().await?))
}

/// GET /api/v1/variants/:id
pub async fn handle_get_variant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CvVariant>, AppError> {
    Ok(Json(load_variant(&state, id).await?))
}

/// PUT /api/v1/variants/:id
pub async fn handle_update_variant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVariantRequest>,
) -> Result<Json<CvVariant>, AppError> {
    let name = request.name.as_deref().map(validate_name).transpose()?;
    let template = request
        .template
        .map(|template| {
            let template = template.trim().to_string();
            if template.is_empty() {
                Err(AppError::Validation("template cannot be empty".to_string()))
            } else {
                Ok(template)
            }
        })
        .transpose()?;
    let update = VariantUpdate {
        name,
        job_tags: request.job_tags.map(clean_tags),
        template,
    };

    let variant = state
        .variants
        .update(id, update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Variant {id} not found")))?;
    Ok(Json(variant))
}

/// DELETE /api/v1/variants/:id
pub async fn handle_delete_variant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.variants.delete(id).await? {
        return Err(AppError::NotFound(format!("Variant {id} not found")));
    }
    info!("Deleted CV variant {id}");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/variants/:variant_id/inspect
///
/// Switches the session into VARIANT mode and previews the stored variant
/// against the current library.
pub async fn handle_inspect_variant(
    State(state): State<AppState>,
    Path((session_id, variant_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = state.sessions.get(session_id)?;
    let variant = load_variant(&state, variant_id).await?;
    session.inspect_variant(variant).await;
    Ok(Json(session.snapshot()))
}

/// POST /api/v1/sessions/:id/variants/:variant_id/export
///
/// Renders a stored variant. The session contributes its theme when the
/// variant uses the same themable template.
pub async fn handle_export_variant(
    State(state): State<AppState>,
    Path((session_id, variant_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, AppError> {
    let session = state.sessions.get(session_id)?;
    let variant = load_variant(&state, variant_id).await?;
    let theme = session.export_theme(&variant);
    let overrides = if session.manual_overrides_enabled() {
        variant.manual_overrides.as_ref()
    } else {
        None
    };

    let document = state
        .engine
        .export_variant(&variant, theme.as_ref(), overrides)
        .await?;

    info!(variant = %variant.id, "Exported variant '{}'", variant.name);
    let filename = format!("{}.pdf", variant.name.replace('"', ""));
    Ok(pdf_response(document, &filename))
}
